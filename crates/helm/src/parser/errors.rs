// Standard Library Imports
use std::ops::Range;

// External Crate Imports
use helm_chem::PolymerType;
use miette::{Diagnostic, LabeledSpan, SourceSpan};
use thiserror::Error;

// Local Crate Imports
use crate::notation::{EntityId, GroupId, PolymerId};

/// Reported when HELM text can't be read. Parsing stops at the first problem, so there's only ever one
#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("{kind}")]
pub struct ParseError {
    input: String,
    span: Range<usize>,
    character: Option<char>,
    state: &'static str,
    kind: ParseErrorKind,
}

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum ParseErrorKind {
    #[error("unexpected character {0:?}")]
    #[diagnostic(help(
        "the five sections of a HELM document (polymers, connections, groupings, extension, and version) are \
        separated by `$`, and the entries in each section by `|`"
    ))]
    UnexpectedCharacter(char),

    #[error("unexpected end of input")]
    #[diagnostic(help("HELM2 documents must finish with a version marker, like `$V2.0`"))]
    UnexpectedEnd,

    #[error("{0:?} is not a valid {1}")]
    InvalidToken(String, &'static str),

    #[error("unbalanced brackets")]
    #[diagnostic(help("every `(` or `[` needs a matching `)` or `]`"))]
    UnbalancedBracket,

    #[error("unterminated annotation")]
    #[diagnostic(help("annotations are written between double quotes, like `\"note\"`"))]
    UnterminatedAnnotation,

    #[error("{0} does not exist in this document")]
    #[diagnostic(help("connections and groupings can only refer to polymers and groups defined in this document"))]
    UnknownEntity(EntityId),

    #[error("{0} has no monomer at position {1}")]
    #[diagnostic(help("positions count the monomers of a polymer from 1, including those inside of groups"))]
    PositionOutOfRange(PolymerId, usize),

    #[error("{0} is defined more than once")]
    #[diagnostic(help("give each polymer a unique index within its type"))]
    DuplicatePolymer(PolymerId),

    #[error("{0} is defined more than once")]
    #[diagnostic(help("give each group a unique number"))]
    DuplicateGroup(GroupId),

    #[error("the repeat range {0}-{1} counts downwards")]
    #[diagnostic(help("repeat ranges are written from the lowest count to the highest, like '2-5'"))]
    InvalidRepeatRange(u32, u32),

    #[error("the extension section is not a valid JSON object: {0}")]
    InvalidProperties(String),

    #[error("missing version marker")]
    #[diagnostic(help(
        "HELM2 documents end with a version marker, like `$V2.0`; older HELM1 documents can be upgraded first"
    ))]
    MissingVersion,

    #[error("a group cannot mix separators")]
    #[diagnostic(help(
        "groups list a sequence with `.`, alternatives with `,`, or a mixture with `+`; ratios are only allowed in \
        alternatives and mixtures"
    ))]
    MixedSeparators,

    #[error("{0} polymers cannot have branch monomers")]
    #[diagnostic(help("only RNA polymers have branches, like the base in `R(A)P`"))]
    BranchOutsideRna(PolymerType),

    #[error("{0} monomers must be separated by `.`")]
    #[diagnostic(help("only RNA monomers can be written back-to-back, like `R(A)P`; multi-letter symbols need brackets"))]
    AdjacentOutsideRna(PolymerType),
}

// Public API ==========================================================================================================

impl ParseError {
    #[must_use]
    pub fn offset(&self) -> usize {
        self.span.start
    }

    #[must_use]
    pub const fn character(&self) -> Option<char> {
        self.character
    }

    /// The parser state that rejected the input, like `InPolymerBody`
    #[must_use]
    pub const fn state(&self) -> &'static str {
        self.state
    }

    #[must_use]
    pub const fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl ParseErrorKind {
    const fn label(&self) -> &'static str {
        match self {
            Self::UnexpectedCharacter(_) => "unexpected here",
            Self::UnexpectedEnd | Self::MissingVersion => "input ended here",
            Self::InvalidToken(..) => "could not be read",
            Self::UnbalancedBracket => "this bracket is never closed",
            Self::UnterminatedAnnotation => "this annotation is never closed",
            Self::UnknownEntity(_) => "unknown reference",
            Self::PositionOutOfRange(..) => "out of range",
            Self::DuplicatePolymer(_) | Self::DuplicateGroup(_) => "defined again here",
            Self::InvalidRepeatRange(..) => "invalid range",
            Self::InvalidProperties(_) => "invalid JSON",
            Self::MixedSeparators => "conflicting separator",
            Self::BranchOutsideRna(_) => "branch opened here",
            Self::AdjacentOutsideRna(_) => "missing `.` before this monomer",
        }
    }
}

// NOTE: Implemented by hand so that the label can mention the parser state alongside the kind-specific wording
impl Diagnostic for ParseError {
    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.kind.help()
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.input)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = format!("{} ({})", self.kind.label(), self.state);
        let span = SourceSpan::from(self.span.clone());
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(label),
            span,
        ))))
    }
}

// Error Construction ==================================================================================================

impl ParseError {
    pub(crate) fn new(
        input: &str,
        span: Range<usize>,
        character: Option<char>,
        state: &'static str,
        kind: ParseErrorKind,
    ) -> Self {
        let input = input.to_owned();
        Self {
            input,
            span,
            character,
            state,
            kind,
        }
    }
}
