// Standard Library Imports
use std::collections::hash_map::Entry;

// External Crate Imports
use ahash::{HashMap, HashMapExt};
use knus::{
    Decode,
    span::{Span, Spanned},
};
use miette::{Diagnostic, LabeledSpan, NamedSource, Result};
use static_assertions::assert_impl_all;
use thiserror::Error;
use tracing::debug;

// Local Crate Imports
use crate::{
    Formula, FormulaError, MonomerKind, MonomerStructure, PolymerType, PolymerTypeError, RGroup,
    RGroupError,
};

// Public API ==========================================================================================================

pub const DEFAULT_KDL: &str = include_str!("../data/monomer_database.kdl");

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MonomerDatabase {
    libraries: HashMap<PolymerType, Library>,
}

assert_impl_all!(MonomerDatabase: Send, Sync);

impl MonomerDatabase {
    pub fn from_kdl(file_name: impl AsRef<str>, kdl_text: impl AsRef<str>) -> Result<Self> {
        let parsed_db: MonomerDatabaseKdl = knus::parse(file_name.as_ref(), kdl_text.as_ref())?;
        let db = parsed_db
            .validate(())
            .map_err(|e| e.finalize(file_name, kdl_text))?;
        debug!(monomers = db.len(), "loaded monomer database");
        Ok(db)
    }

    #[must_use]
    pub fn get(&self, polymer_type: PolymerType, symbol: &str) -> Option<&MonomerStructure> {
        self.libraries.get(&polymer_type)?.get(symbol)
    }

    /// Every monomer of `polymer_type`, in no particular order
    pub fn monomers(&self, polymer_type: PolymerType) -> impl Iterator<Item = &MonomerStructure> {
        self.libraries
            .get(&polymer_type)
            .into_iter()
            .flat_map(HashMap::values)
    }

    /// Registers a monomer, returning the one it replaced (if any)
    pub fn insert(&mut self, monomer: MonomerStructure) -> Option<MonomerStructure> {
        self.libraries
            .entry(monomer.polymer_type())
            .or_default()
            .insert(monomer.symbol().to_owned(), monomer)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.libraries.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MonomerDatabase {
    fn default() -> Self {
        // SAFETY: The bundled database is checked by `bundled_database_is_valid` below
        Self::from_kdl("monomer_database.kdl", DEFAULT_KDL).unwrap()
    }
}

// Private Types =======================================================================================================

type Library = HashMap<String, MonomerStructure>;

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
#[knus(span_type=Span)]
struct MonomerDatabaseKdl {
    #[knus(children)]
    libraries: Vec<LibraryKdl>,
}

#[derive(Debug, Decode)]
#[knus(span_type=Span)]
struct LibraryKdl {
    #[knus(span)]
    span: Span,
    #[knus(node_name)]
    polymer_type: String,
    #[knus(children(name = "monomer"))]
    monomers: Vec<MonomerKdl>,
}

#[derive(Debug, Decode)]
#[knus(span_type=Span)]
struct MonomerKdl {
    #[knus(span)]
    span: Span,
    #[knus(argument)]
    symbol: String,
    #[knus(argument)]
    name: String,
    #[knus(property(name = "type"))]
    kind: Option<Spanned<String, Span>>,
    #[knus(property(name = "natural-analog"))]
    natural_analog: Option<String>,
    #[knus(property)]
    formula: FormulaKdl,
    #[knus(children(name = "attachment"))]
    attachments: Vec<AttachmentKdl>,
    #[knus(child, unwrap(argument))]
    smiles: Option<String>,
}

#[derive(Debug, Decode)]
#[knus(span_type=Span)]
struct AttachmentKdl {
    #[knus(span)]
    span: Span,
    #[knus(argument)]
    label: Spanned<String, Span>,
    #[knus(property)]
    cap: FormulaKdl,
}

type FormulaKdl = Spanned<String, Span>;

// Contextual Validation Trait  ========================================================================================

type DatabaseResult<T> = Result<T, MonomerDatabaseErrorKind>;

trait ValidateInto<'c, T> {
    type Context: 'c;

    fn validate(self, ctx: Self::Context) -> DatabaseResult<T>;
}

// Monomer Database Validation =========================================================================================

impl ValidateInto<'_, MonomerDatabase> for MonomerDatabaseKdl {
    type Context = ();

    fn validate(self, _ctx: Self::Context) -> DatabaseResult<MonomerDatabase> {
        let mut libraries: HashMap<PolymerType, HashMap<String, (Span, MonomerStructure)>> =
            HashMap::new();

        for library in self.libraries {
            let polymer_type = library.polymer_type.parse::<PolymerType>().map_err(|e| {
                MonomerDatabaseErrorKind::UnknownPolymerType(library.span, e)
            })?;
            let known = libraries.entry(polymer_type).or_default();

            for monomer_kdl in library.monomers {
                let span = monomer_kdl.span;
                let monomer = monomer_kdl.validate(polymer_type)?;
                match known.entry(monomer.symbol().to_owned()) {
                    Entry::Occupied(e) => {
                        let (symbol, (first_defined_at, _)) = e.remove_entry();
                        return Err(MonomerDatabaseErrorKind::DuplicateMonomer(
                            first_defined_at,
                            span,
                            symbol,
                            polymer_type,
                        ));
                    }
                    Entry::Vacant(e) => e.insert((span, monomer)),
                };
            }
        }

        let libraries = libraries
            .into_iter()
            .map(|(t, monomers)| (t, monomers.into_iter().map(|(k, (_, m))| (k, m)).collect()))
            .collect();
        Ok(MonomerDatabase { libraries })
    }
}

// Validate Monomers ===================================================================================================

impl ValidateInto<'_, MonomerStructure> for MonomerKdl {
    type Context = PolymerType;

    fn validate(self, ctx: Self::Context) -> DatabaseResult<MonomerStructure> {
        let kind = self.kind.map_or(Ok(MonomerKind::default()), |k| k.validate(()))?;
        let formula: Formula = self.formula.validate(())?;
        let mut monomer = MonomerStructure::new(ctx, self.symbol, self.name, formula).with_kind(kind);

        let mut seen_labels: HashMap<RGroup, Span> = HashMap::new();
        for attachment in self.attachments {
            let (label, cap) = attachment.validate(())?;
            match seen_labels.entry(label) {
                Entry::Occupied(e) => {
                    let (label, first_defined_at) = e.remove_entry();
                    return Err(MonomerDatabaseErrorKind::DuplicateAttachment(
                        first_defined_at,
                        attachment.span,
                        label,
                    ));
                }
                Entry::Vacant(e) => e.insert(attachment.span),
            };
            monomer = monomer.with_attachment(label, cap);
        }

        if let Some(analog) = self.natural_analog {
            monomer = monomer.with_natural_analog(analog);
        }
        if let Some(smiles) = self.smiles {
            monomer = monomer.with_smiles(smiles);
        }

        Ok(monomer)
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl ValidateInto<'_, MonomerKind> for Spanned<String, Span> {
    type Context = ();

    fn validate(self, _ctx: Self::Context) -> DatabaseResult<MonomerKind> {
        match self.as_str() {
            "Backbone" => Ok(MonomerKind::Backbone),
            "Branch" => Ok(MonomerKind::Branch),
            "Terminal" => Ok(MonomerKind::Terminal),
            "Undefined" => Ok(MonomerKind::Undefined),
            other => Err(MonomerDatabaseErrorKind::UnknownMonomerKind(
                *self.span(),
                other.to_owned(),
            )),
        }
    }
}

// NOTE: `AttachmentKdl` is borrowed here so that its span is still around to report duplicate labels
impl ValidateInto<'_, (RGroup, Formula)> for &AttachmentKdl {
    type Context = ();

    fn validate(self, _ctx: Self::Context) -> DatabaseResult<(RGroup, Formula)> {
        let label = self
            .label
            .parse::<RGroup>()
            .map_err(|e| MonomerDatabaseErrorKind::RGroup(*self.label.span(), e))?;
        let cap = Formula::new(&*self.cap)
            .map_err(|e| MonomerDatabaseErrorKind::Formula(*self.cap.span(), e))?;

        Ok((label, cap))
    }
}

impl ValidateInto<'_, Formula> for FormulaKdl {
    type Context = ();

    fn validate(self, _ctx: Self::Context) -> DatabaseResult<Formula> {
        Formula::new(&*self).map_err(|e| MonomerDatabaseErrorKind::Formula(*self.span(), e))
    }
}

// Validation Error Types and Trait Implementations  ===================================================================

#[derive(Debug, Error)]
#[error("failed to validate monomer database file")]
struct MonomerDatabaseError {
    kdl: NamedSource<String>,
    #[source]
    kind: MonomerDatabaseErrorKind,
}

// NOTE: This is manually implemented because the list of labels is dynamic and needs to be extracted from `self.kind`
impl Diagnostic for MonomerDatabaseError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.kdl)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(self.kind.labels().into_iter().map(|(s, l)| {
            LabeledSpan::new_with_span(Some(l.to_owned()), *s)
        })))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        Some(&self.kind)
    }
}

#[derive(Clone, Debug, Diagnostic, Error)]
enum MonomerDatabaseErrorKind {
    #[error("monomer libraries must be named after a polymer type")]
    UnknownPolymerType(
        Span,
        #[source]
        #[diagnostic_source]
        PolymerTypeError,
    ),

    #[error("the {3} monomer {2:?} has already been defined")]
    #[diagnostic(help("remove the duplicate, or give one of the monomers a new symbol"))]
    DuplicateMonomer(Span, Span, String, PolymerType),

    #[error("the attachment point {2} has already been defined for this monomer")]
    #[diagnostic(help("each R-group should be listed once, with a single capping group"))]
    DuplicateAttachment(Span, Span, RGroup),

    #[error("{1:?} is not a kind of monomer")]
    #[diagnostic(help("monomers can be of type \"Backbone\", \"Branch\", \"Terminal\", or \"Undefined\""))]
    UnknownMonomerKind(Span, String),

    #[error("monomer database file contained an invalid attachment point label")]
    RGroup(
        Span,
        #[source]
        #[diagnostic_source]
        RGroupError,
    ),

    #[error("monomer database file contained an invalid chemical formula")]
    Formula(
        Span,
        #[source]
        #[diagnostic_source]
        FormulaError,
    ),
}

impl MonomerDatabaseErrorKind {
    fn labels(&self) -> Vec<(&Span, &'static str)> {
        match self {
            Self::DuplicateMonomer(s1, s2, _, _) | Self::DuplicateAttachment(s1, s2, _) => {
                vec![(s1, "first defined here"), (s2, "then again here")]
            }
            Self::UnknownPolymerType(s, _) => vec![(s, "unknown polymer type")],
            Self::UnknownMonomerKind(s, _) => vec![(s, "unknown monomer type")],
            Self::RGroup(s, _) => vec![(s, "invalid R-group")],
            Self::Formula(s, _) => vec![(s, "invalid chemical formula")],
        }
    }

    fn finalize(self, file_name: impl AsRef<str>, kdl: impl AsRef<str>) -> MonomerDatabaseError {
        let kdl = NamedSource::new(file_name, kdl.as_ref().to_owned());
        MonomerDatabaseError { kdl, kind: self }
    }
}

// Module Tests ========================================================================================================
