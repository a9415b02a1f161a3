//! A single-pass, character-driven state machine that turns HELM2 text into a [`Helm2Notation`]. Completed tokens are
//! handed to the small `nom` parsers in [`primitives`], and every structural invariant of the document is checked as
//! soon as the information needed to check it has been read

mod errors;
pub mod legacy;
mod primitives;

// Standard Library Imports
use std::{mem, ops::Range};

// External Crate Imports
use helm_chem::PolymerType;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, trace};

// Local Crate Imports
use crate::notation::{
    Alternative, AttachmentPoint, ConnectionNotation, Endpoint, EntityId, GroupKind, GroupMember, GroupNotation,
    Helm2Notation, Link, MonomerGroup, MonomerList, MonomerNotation, MonomerRef, MonomerUnit,
    PolymerId, PolymerNotation, RepeatCount, SitePosition,
};
pub use errors::{ParseError, ParseErrorKind};
use primitives::{attachment_point, entity_id, group_id, polymer_id, ratio, repeat_count, site_position, version, whole};

// Public API ==========================================================================================================

pub fn parse(text: impl AsRef<str>) -> Result<Helm2Notation, ParseError> {
    let text = text.as_ref();
    let mut parser = Parser::new(text);
    for (offset, c) in text.char_indices() {
        parser.feed(offset, c)?;
    }
    parser.finish()
}

/// Parses `text` after passing it through [`legacy::upgrade`], so HELM1 documents are accepted too. Errors point into
/// the upgraded text
pub fn parse_upgrading(text: impl AsRef<str>) -> Result<Helm2Notation, ParseError> {
    parse(legacy::upgrade(text.as_ref()))
}

// Parser State ========================================================================================================

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum State {
    ExpectPolymerId,
    InPolymerId,
    /// Waiting for a monomer or group to start
    InPolymerBody,
    InMonomerUnit,
    InBracketedMonomer { depth: usize },
    AfterMonomer,
    InBranch { read: bool },
    InRatio { target: RatioTarget },
    InRepeatCount,
    InAnnotation { target: AnnotationTarget },
    AfterPolymer,
    ExpectConnectionSource,
    ExpectConnectionTarget,
    ExpectSourcePosition,
    ExpectAttachmentPoint { side: Side },
    ExpectTargetPosition,
    AfterConnection,
    InGroupingId,
    InGroupingBody,
    AfterGrouping,
    InExtension { in_string: bool, escaped: bool },
    InVersion,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum RatioTarget {
    Alternative,
    GroupMember,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum AnnotationTarget {
    Element,
    Polymer,
    Connection,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Side {
    Source,
    Target,
}

impl State {
    const fn name(self) -> &'static str {
        match self {
            Self::ExpectPolymerId => "ExpectPolymerId",
            Self::InPolymerId => "InPolymerId",
            Self::InPolymerBody => "InPolymerBody",
            Self::InMonomerUnit => "InMonomerUnit",
            Self::InBracketedMonomer { .. } => "InBracketedMonomer",
            Self::AfterMonomer => "AfterMonomer",
            Self::InBranch { .. } => "InBranch",
            Self::InRatio { .. } => "InRatio",
            Self::InRepeatCount => "InRepeatCount",
            Self::InAnnotation { .. } => "InAnnotation",
            Self::AfterPolymer => "AfterPolymer",
            Self::ExpectConnectionSource => "ExpectConnectionSource",
            Self::ExpectConnectionTarget => "ExpectConnectionTarget",
            Self::ExpectSourcePosition => "ExpectSourcePosition",
            Self::ExpectAttachmentPoint { .. } => "ExpectAttachmentPoint",
            Self::ExpectTargetPosition => "ExpectTargetPosition",
            Self::AfterConnection => "AfterConnection",
            Self::InGroupingId => "InGroupingId",
            Self::InGroupingBody => "InGroupingBody",
            Self::AfterGrouping => "AfterGrouping",
            Self::InExtension { .. } => "InExtension",
            Self::InVersion => "InVersion",
        }
    }
}

// NOTE: Characters that end one token often start the next, so handlers can ask for the same character to be
// dispatched again once they've changed state
enum Flow {
    Consumed,
    Reprocess,
}

#[derive(Default)]
struct Token {
    start: usize,
    text: String,
}

impl Token {
    fn push(&mut self, offset: usize, c: char) {
        if self.text.is_empty() {
            self.start = offset;
        }
        self.text.push(c);
    }

    fn begin(&mut self, offset: usize) {
        self.start = offset;
        self.text.clear();
    }

    fn span(&self) -> Range<usize> {
        self.start..self.start + self.text.len()
    }

    fn take(&mut self) -> (String, Range<usize>) {
        let span = self.span();
        (mem::take(&mut self.text), span)
    }
}

/// An open `(` inside of a polymer body
struct Frame {
    open: usize,
    items: Vec<MonomerNotation>,
    ratios: Vec<Option<Decimal>>,
    separator: Option<char>,
}

#[derive(Default)]
struct ConnectionDraft {
    source: Option<EntityId>,
    target: Option<EntityId>,
    source_position: Option<SitePosition>,
    target_position: Option<SitePosition>,
    source_point: Option<AttachmentPoint>,
}

struct GroupDraft {
    group: GroupNotation,
    separator: Option<char>,
    member_done: bool,
}

struct Parser<'a> {
    input: &'a str,
    state: State,
    doc: Helm2Notation,
    token: Token,
    polymer: Option<PolymerId>,
    elements: Vec<MonomerNotation>,
    frames: Vec<Frame>,
    link: Link,
    connection: ConnectionDraft,
    group: Option<GroupDraft>,
    // NOTE: References to groups (and polymers inside of groups) can only be checked once the grouping section is over
    deferred: Vec<(EntityId, Range<usize>)>,
}

// State Machine =======================================================================================================

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            state: State::ExpectPolymerId,
            doc: Helm2Notation::default(),
            token: Token::default(),
            polymer: None,
            elements: Vec::new(),
            frames: Vec::new(),
            link: Link::Backbone,
            connection: ConnectionDraft::default(),
            group: None,
            deferred: Vec::new(),
        }
    }

    fn feed(&mut self, offset: usize, c: char) -> Result<(), ParseError> {
        while let Flow::Reprocess = self.step(offset, c)? {}
        Ok(())
    }

    fn step(&mut self, offset: usize, c: char) -> Result<Flow, ParseError> {
        match self.state {
            // Polymers --------------------------------------------------------------------------------------------
            State::ExpectPolymerId => match c {
                'A'..='Z' => {
                    self.token.begin(offset);
                    self.token.push(offset, c);
                    self.state = State::InPolymerId;
                }
                '$' if self.doc.polymers.is_empty() => self.end_polymer_section(),
                _ => return Err(self.unexpected(offset, c)),
            },
            State::InPolymerId => match c {
                '{' => self.open_polymer()?,
                c if c.is_ascii_alphanumeric() => self.token.push(offset, c),
                _ => return Err(self.unexpected(offset, c)),
            },
            State::InPolymerBody => match c {
                '(' => self.frames.push(Frame {
                    open: offset,
                    items: Vec::new(),
                    ratios: Vec::new(),
                    separator: None,
                }),
                '}' if self.frames.is_empty() && self.elements.is_empty() => self.close_polymer(),
                _ => self.begin_monomer(offset, c)?,
            },
            State::InMonomerUnit => {
                if !c.is_ascii_alphanumeric() {
                    self.complete_unit();
                    return Ok(Flow::Reprocess);
                }
                match self.kind() {
                    Some(PolymerType::Chem | PolymerType::Blob) => self.token.push(offset, c),
                    Some(PolymerType::Rna) if !self.link.is_branch() => {
                        self.complete_unit();
                        return Ok(Flow::Reprocess);
                    }
                    Some(PolymerType::Rna) => return Err(self.unexpected(offset, c)),
                    Some(kind) => {
                        return Err(self.error_at(offset, c, ParseErrorKind::AdjacentOutsideRna(kind)));
                    }
                    None => return Err(self.unexpected(offset, c)),
                }
            }
            State::InBracketedMonomer { depth } => match c {
                '[' => {
                    self.token.push(offset, c);
                    self.state = State::InBracketedMonomer { depth: depth + 1 };
                }
                ']' if depth == 1 => {
                    if self.token.text.is_empty() {
                        let span = offset - 1..offset + 1;
                        return Err(self.error(span, ParseErrorKind::InvalidToken("[]".to_owned(), "monomer")));
                    }
                    self.complete_unit();
                }
                ']' => {
                    self.token.push(offset, c);
                    self.state = State::InBracketedMonomer { depth: depth - 1 };
                }
                _ => self.token.push(offset, c),
            },
            State::AfterMonomer => return self.after_monomer(offset, c),
            State::InBranch { read: false } => self.begin_monomer(offset, c)?,
            State::InBranch { read: true } => match c {
                ')' => {
                    self.link = Link::Backbone;
                    self.state = State::AfterMonomer;
                }
                _ => return Err(self.unexpected(offset, c)),
            },
            State::InRatio { target } => match c {
                '0'..='9' | '.' => self.token.push(offset, c),
                _ => {
                    self.complete_ratio(target)?;
                    return Ok(Flow::Reprocess);
                }
            },
            State::InRepeatCount => match c {
                '\'' => self.complete_repeat()?,
                '0'..='9' | '-' => self.token.push(offset, c),
                _ => return Err(self.unexpected(offset, c)),
            },
            State::InAnnotation { target } => match c {
                '"' => self.complete_annotation(target),
                _ => self.token.push(offset, c),
            },
            State::AfterPolymer => match c {
                '|' => self.state = State::ExpectPolymerId,
                '$' => self.end_polymer_section(),
                '"' if self.doc.polymers.last().is_some_and(|p| p.annotation.is_none()) => {
                    self.begin_annotation(offset, AnnotationTarget::Polymer);
                }
                _ => return Err(self.unexpected(offset, c)),
            },

            // Connections -----------------------------------------------------------------------------------------
            State::ExpectConnectionSource => match c {
                '$' if self.token.text.is_empty() && self.doc.connections.is_empty() => {
                    self.end_connection_section();
                }
                ',' if !self.token.text.is_empty() => {
                    self.connection.source = Some(self.complete_entity()?);
                    self.state = State::ExpectConnectionTarget;
                }
                c if c.is_ascii_alphanumeric() => self.token.push(offset, c),
                _ => return Err(self.unexpected(offset, c)),
            },
            State::ExpectConnectionTarget => match c {
                ',' if !self.token.text.is_empty() => {
                    self.connection.target = Some(self.complete_entity()?);
                    self.state = State::ExpectSourcePosition;
                }
                c if c.is_ascii_alphanumeric() => self.token.push(offset, c),
                _ => return Err(self.unexpected(offset, c)),
            },
            State::ExpectSourcePosition | State::ExpectTargetPosition => match c {
                ':' if !self.token.text.is_empty() => {
                    let side = if self.state == State::ExpectSourcePosition {
                        Side::Source
                    } else {
                        Side::Target
                    };
                    let position = self.complete_position(side)?;
                    match side {
                        Side::Source => self.connection.source_position = Some(position),
                        Side::Target => self.connection.target_position = Some(position),
                    }
                    self.state = State::ExpectAttachmentPoint { side };
                }
                '0'..='9' | '(' | ')' | ',' | '?' => self.token.push(offset, c),
                _ => return Err(self.unexpected(offset, c)),
            },
            State::ExpectAttachmentPoint { side } => match c {
                '-' if side == Side::Source && !self.token.text.is_empty() => {
                    self.connection.source_point = Some(self.complete_attachment()?);
                    self.state = State::ExpectTargetPosition;
                }
                '|' | '$' | '"' if side == Side::Target && !self.token.text.is_empty() => {
                    self.complete_connection(offset, c)?;
                    return Ok(Flow::Reprocess);
                }
                c if c.is_ascii_alphanumeric() || c == '?' => self.token.push(offset, c),
                _ => return Err(self.unexpected(offset, c)),
            },
            State::AfterConnection => match c {
                '|' => self.state = State::ExpectConnectionSource,
                '$' => self.end_connection_section(),
                '"' if self.doc.connections.last().is_some_and(|c| c.annotation.is_none()) => {
                    self.begin_annotation(offset, AnnotationTarget::Connection);
                }
                _ => return Err(self.unexpected(offset, c)),
            },

            // Groupings -------------------------------------------------------------------------------------------
            State::InGroupingId => match c {
                '$' if self.token.text.is_empty() && self.doc.groups.is_empty() => {
                    self.end_grouping_section()?;
                }
                '(' if !self.token.text.is_empty() => self.open_grouping()?,
                c if c.is_ascii_alphanumeric() => self.token.push(offset, c),
                _ => return Err(self.unexpected(offset, c)),
            },
            State::InGroupingBody => return self.in_grouping_body(offset, c),
            State::AfterGrouping => match c {
                '|' => self.state = State::InGroupingId,
                '$' => self.end_grouping_section()?,
                _ => return Err(self.unexpected(offset, c)),
            },

            // Extension and Version -------------------------------------------------------------------------------
            State::InExtension { in_string, escaped } => {
                self.state = match (in_string, escaped, c) {
                    (false, _, '$') => {
                        self.complete_extension()?;
                        return Ok(Flow::Consumed);
                    }
                    (false, _, '"') => State::InExtension {
                        in_string: true,
                        escaped: false,
                    },
                    (true, false, '\\') => State::InExtension {
                        in_string: true,
                        escaped: true,
                    },
                    (true, false, '"') => State::InExtension {
                        in_string: false,
                        escaped: false,
                    },
                    _ => State::InExtension {
                        in_string,
                        escaped: false,
                    },
                };
                self.token.push(offset, c);
            }
            State::InVersion => self.token.push(offset, c),
        }

        Ok(Flow::Consumed)
    }

    fn finish(mut self) -> Result<Helm2Notation, ParseError> {
        let end = self.input.len();
        let end_error = |kind| (end..end, kind);
        let (span, kind) = match self.state {
            State::InVersion => {
                let (text, span) = self.token.take();
                if text.is_empty() {
                    end_error(ParseErrorKind::MissingVersion)
                } else if let Some(marker) = whole(version, &text) {
                    self.doc.version = marker.to_owned();
                    debug!(polymers = self.doc.polymers.len(), "parsed HELM document");
                    return Ok(self.doc);
                } else {
                    (span, ParseErrorKind::InvalidToken(text, "version marker"))
                }
            }
            State::InBracketedMonomer { .. } => {
                let start = self.token.start.saturating_sub(1);
                (start..start + 1, ParseErrorKind::UnbalancedBracket)
            }
            State::InAnnotation { .. } => {
                let start = self.token.start.saturating_sub(1);
                (start..start + 1, ParseErrorKind::UnterminatedAnnotation)
            }
            State::InPolymerBody | State::AfterMonomer if !self.frames.is_empty() => {
                let open = self.frames.last().map_or(end, |f| f.open);
                (open..open + 1, ParseErrorKind::UnbalancedBracket)
            }
            State::AfterPolymer
            | State::AfterConnection
            | State::AfterGrouping
            | State::InExtension { .. } => end_error(ParseErrorKind::MissingVersion),
            State::ExpectConnectionSource | State::InGroupingId if self.token.text.is_empty() => {
                end_error(ParseErrorKind::MissingVersion)
            }
            _ => end_error(ParseErrorKind::UnexpectedEnd),
        };

        Err(self.error(span, kind))
    }
}

// Polymer Handlers ====================================================================================================

impl Parser<'_> {
    fn kind(&self) -> Option<PolymerType> {
        self.polymer.map(|id| id.kind)
    }

    fn open_polymer(&mut self) -> Result<(), ParseError> {
        let (text, span) = self.token.take();
        let id = whole(polymer_id, &text)
            .ok_or_else(|| self.error(span.clone(), ParseErrorKind::InvalidToken(text, "polymer ID")))?;
        if self.doc.polymer(id).is_some() {
            return Err(self.error(span, ParseErrorKind::DuplicatePolymer(id)));
        }

        self.polymer = Some(id);
        self.link = Link::Backbone;
        self.state = State::InPolymerBody;
        Ok(())
    }

    fn close_polymer(&mut self) {
        if let Some(id) = self.polymer.take() {
            let polymer = PolymerNotation::new(id, mem::take(&mut self.elements));
            trace!(%id, positions = polymer.position_count(), "read polymer");
            self.doc.polymers.push(polymer);
        }
        self.state = State::AfterPolymer;
    }

    fn end_polymer_section(&mut self) {
        debug!(polymers = self.doc.polymers.len(), "finished polymer section");
        self.token.begin(0);
        self.state = State::ExpectConnectionSource;
    }

    fn begin_monomer(&mut self, offset: usize, c: char) -> Result<(), ParseError> {
        match c {
            '[' => {
                self.token.begin(offset + 1);
                self.state = State::InBracketedMonomer { depth: 1 };
            }
            '?' | '_' => {
                self.token.begin(offset);
                self.token.push(offset, c);
                self.complete_unit();
            }
            c if c.is_ascii_alphanumeric() => {
                self.token.begin(offset);
                self.token.push(offset, c);
                self.state = State::InMonomerUnit;
            }
            _ => return Err(self.unexpected(offset, c)),
        }
        Ok(())
    }

    fn complete_unit(&mut self) {
        let (text, _) = self.token.take();
        let unit = MonomerUnit::new(MonomerRef::from_token(&text)).with_link(self.link);
        self.push_element(MonomerNotation::Unit(unit));
        self.state = if self.link.is_branch() {
            State::InBranch { read: true }
        } else {
            State::AfterMonomer
        };
    }

    fn after_monomer(&mut self, offset: usize, c: char) -> Result<Flow, ParseError> {
        match c {
            '.' => {
                if let Some(frame) = self.frames.last_mut() {
                    let has_ratios = frame.ratios.iter().any(Option::is_some);
                    if has_ratios || matches!(frame.separator, Some(',' | '+')) {
                        return Err(self.error_at(offset, c, ParseErrorKind::MixedSeparators));
                    }
                    frame.separator = Some('.');
                }
                self.link = Link::Backbone;
                self.state = State::InPolymerBody;
            }
            ',' | '+' => {
                let Some(frame) = self.frames.last_mut() else {
                    return Err(self.unexpected(offset, c));
                };
                if frame.separator.is_some_and(|s| s != c) {
                    return Err(self.error_at(offset, c, ParseErrorKind::MixedSeparators));
                }
                frame.separator = Some(c);
                self.link = Link::Backbone;
                self.state = State::InPolymerBody;
            }
            ':' => {
                let Some(frame) = self.frames.last() else {
                    return Err(self.unexpected(offset, c));
                };
                if frame.separator == Some('.') {
                    return Err(self.error_at(offset, c, ParseErrorKind::MixedSeparators));
                }
                if frame.ratios.last().is_some_and(Option::is_some) {
                    return Err(self.unexpected(offset, c));
                }
                self.token.begin(offset + 1);
                self.state = State::InRatio {
                    target: RatioTarget::Alternative,
                };
            }
            '\'' if self.last_element().is_some_and(|e| e.repeat().is_none()) => {
                self.token.begin(offset + 1);
                self.state = State::InRepeatCount;
            }
            '"' if self.last_element().is_some_and(|e| e.annotation().is_none()) => {
                self.begin_annotation(offset, AnnotationTarget::Element);
            }
            '(' => {
                let kind = self.kind().unwrap_or(PolymerType::Blob);
                if kind != PolymerType::Rna {
                    return Err(self.error_at(offset, c, ParseErrorKind::BranchOutsideRna(kind)));
                }
                let branchable =
                    matches!(self.last_element(), Some(MonomerNotation::Unit(u)) if !u.link.is_branch());
                if !branchable {
                    return Err(self.unexpected(offset, c));
                }
                self.link = Link::Branch;
                self.state = State::InBranch { read: false };
            }
            ')' => self.close_frame(offset)?,
            '}' => {
                if let Some(frame) = self.frames.last() {
                    let open = frame.open;
                    return Err(self.error(open..open + 1, ParseErrorKind::UnbalancedBracket));
                }
                self.close_polymer();
            }
            '[' | '?' | '_' => return self.adjacent_monomer(offset, c),
            c if c.is_ascii_alphanumeric() => return self.adjacent_monomer(offset, c),
            _ => return Err(self.unexpected(offset, c)),
        }
        Ok(Flow::Consumed)
    }

    fn adjacent_monomer(&mut self, offset: usize, c: char) -> Result<Flow, ParseError> {
        match self.kind() {
            Some(PolymerType::Rna) => {
                self.link = Link::Adjacent;
                self.begin_monomer(offset, c)?;
                Ok(Flow::Consumed)
            }
            Some(kind) => Err(self.error_at(offset, c, ParseErrorKind::AdjacentOutsideRna(kind))),
            None => Err(self.unexpected(offset, c)),
        }
    }

    fn close_frame(&mut self, offset: usize) -> Result<(), ParseError> {
        let Some(frame) = self.frames.pop() else {
            return Err(self.error(offset..offset + 1, ParseErrorKind::UnbalancedBracket));
        };

        let has_ratios = frame.ratios.iter().any(Option::is_some);
        let element = match frame.separator {
            Some(separator @ (',' | '+')) => self.alternatives(frame, offset, separator)?,
            None if has_ratios => self.alternatives(frame, offset, ',')?,
            _ => MonomerNotation::Group(MonomerGroup::new(frame.items)),
        };

        self.push_element(element);
        self.link = Link::Backbone;
        self.state = State::AfterMonomer;
        Ok(())
    }

    fn alternatives(&self, frame: Frame, close: usize, separator: char) -> Result<MonomerNotation, ParseError> {
        let span = frame.open..close + 1;
        let alternatives: Option<Vec<_>> = frame
            .items
            .into_iter()
            .zip(frame.ratios)
            .map(|(item, ratio)| match item {
                MonomerNotation::Unit(MonomerUnit {
                    monomer,
                    link: Link::Backbone,
                    repeat: None,
                    annotation: None,
                    ..
                }) => Some(Alternative { monomer, ratio }),
                _ => None,
            })
            .collect();

        let Some(alternatives) = alternatives else {
            let text = self.input[span.clone()].to_owned();
            return Err(self.error(span, ParseErrorKind::InvalidToken(text, "list of alternative monomers")));
        };

        let list = MonomerList::new(alternatives);
        Ok(if separator == '+' {
            MonomerNotation::Mixture(list)
        } else {
            MonomerNotation::List(list)
        })
    }

    fn complete_ratio(&mut self, target: RatioTarget) -> Result<(), ParseError> {
        let (text, span) = self.token.take();
        let ratio = whole(ratio, &text)
            .ok_or_else(|| self.error(span, ParseErrorKind::InvalidToken(text, "ratio")))?;

        match target {
            RatioTarget::Alternative => {
                if let Some(slot) = self.frames.last_mut().and_then(|f| f.ratios.last_mut()) {
                    *slot = Some(ratio);
                }
                self.state = State::AfterMonomer;
            }
            RatioTarget::GroupMember => {
                if let Some(member) = self.group.as_mut().and_then(|g| g.group.members.last_mut()) {
                    member.ratio = Some(ratio);
                }
                self.state = State::InGroupingBody;
            }
        }
        Ok(())
    }

    fn complete_repeat(&mut self) -> Result<(), ParseError> {
        let (text, span) = self.token.take();
        let Some((low, high)) = whole(repeat_count, &text) else {
            return Err(self.error(span, ParseErrorKind::InvalidToken(text, "repeat count")));
        };
        let repeat = match high {
            None => RepeatCount::Exact(low),
            Some(high) => RepeatCount::range(low, high).ok_or_else(|| {
                self.error(span, ParseErrorKind::InvalidRepeatRange(low.get(), high.get()))
            })?,
        };

        if let Some(element) = self.last_element_mut() {
            *element.repeat_mut() = Some(repeat);
        }
        self.state = State::AfterMonomer;
        Ok(())
    }

    fn begin_annotation(&mut self, offset: usize, target: AnnotationTarget) {
        self.token.begin(offset + 1);
        self.state = State::InAnnotation { target };
    }

    fn complete_annotation(&mut self, target: AnnotationTarget) {
        let (text, _) = self.token.take();
        self.state = match target {
            AnnotationTarget::Element => {
                if let Some(element) = self.last_element_mut() {
                    *element.annotation_mut() = Some(text);
                }
                State::AfterMonomer
            }
            AnnotationTarget::Polymer => {
                if let Some(polymer) = self.doc.polymers.last_mut() {
                    polymer.annotation = Some(text);
                }
                State::AfterPolymer
            }
            AnnotationTarget::Connection => {
                if let Some(connection) = self.doc.connections.last_mut() {
                    connection.annotation = Some(text);
                }
                State::AfterConnection
            }
        };
    }

    fn push_element(&mut self, element: MonomerNotation) {
        if let Some(frame) = self.frames.last_mut() {
            frame.items.push(element);
            frame.ratios.push(None);
        } else {
            self.elements.push(element);
        }
    }

    fn last_element(&self) -> Option<&MonomerNotation> {
        self.frames
            .last()
            .map_or(&self.elements, |f| &f.items)
            .last()
    }

    fn last_element_mut(&mut self) -> Option<&mut MonomerNotation> {
        match self.frames.last_mut() {
            Some(frame) => frame.items.last_mut(),
            None => self.elements.last_mut(),
        }
    }
}

// Connection Handlers =================================================================================================

impl Parser<'_> {
    fn complete_entity(&mut self) -> Result<EntityId, ParseError> {
        let (text, span) = self.token.take();
        let entity = whole(entity_id, &text).ok_or_else(|| {
            self.error(span.clone(), ParseErrorKind::InvalidToken(text, "polymer or group ID"))
        })?;

        match entity {
            EntityId::Polymer(_) if !self.doc.contains(entity) => {
                Err(self.error(span, ParseErrorKind::UnknownEntity(entity)))
            }
            EntityId::Polymer(_) => Ok(entity),
            EntityId::Group(_) => {
                self.deferred.push((entity, span));
                Ok(entity)
            }
        }
    }

    fn complete_position(&mut self, side: Side) -> Result<SitePosition, ParseError> {
        let (text, span) = self.token.take();
        let position = whole(site_position, &text).ok_or_else(|| {
            self.error(span.clone(), ParseErrorKind::InvalidToken(text, "monomer position"))
        })?;

        let entity = match side {
            Side::Source => self.connection.source,
            Side::Target => self.connection.target,
        };
        if let Some(polymer) = entity.and_then(|e| e.polymer()).and_then(|id| self.doc.polymer(id)) {
            let indices = match &position {
                SitePosition::Index(index) => std::slice::from_ref(index),
                SitePosition::Alternatives(indices) => indices.as_slice(),
                SitePosition::Unknown => &[],
            };
            if let Some(&missing) = indices.iter().find(|&&i| polymer.site(i).is_none()) {
                let kind = ParseErrorKind::PositionOutOfRange(polymer.id(), missing);
                return Err(self.error(span, kind));
            }
        }

        Ok(position)
    }

    fn complete_attachment(&mut self) -> Result<AttachmentPoint, ParseError> {
        let (text, span) = self.token.take();
        whole(attachment_point, &text)
            .ok_or_else(|| self.error(span, ParseErrorKind::InvalidToken(text, "attachment point")))
    }

    fn complete_connection(&mut self, offset: usize, c: char) -> Result<(), ParseError> {
        let target_point = self.complete_attachment()?;
        let draft = mem::take(&mut self.connection);
        let (Some(source), Some(target), Some(source_position), Some(target_position), Some(source_point)) = (
            draft.source,
            draft.target,
            draft.source_position,
            draft.target_position,
            draft.source_point,
        ) else {
            return Err(self.unexpected(offset, c));
        };

        let connection = ConnectionNotation::new(
            Endpoint::new(source, source_position, source_point),
            Endpoint::new(target, target_position, target_point),
        );
        trace!(%connection, "read connection");
        self.doc.connections.push(connection);
        self.state = State::AfterConnection;
        Ok(())
    }

    fn end_connection_section(&mut self) {
        debug!(connections = self.doc.connections.len(), "finished connection section");
        self.state = State::InGroupingId;
    }
}

// Grouping Handlers ===================================================================================================

impl Parser<'_> {
    fn open_grouping(&mut self) -> Result<(), ParseError> {
        let (text, span) = self.token.take();
        let id = whole(group_id, &text)
            .ok_or_else(|| self.error(span.clone(), ParseErrorKind::InvalidToken(text, "group ID")))?;
        if self.doc.group(id).is_some() {
            return Err(self.error(span, ParseErrorKind::DuplicateGroup(id)));
        }

        self.group = Some(GroupDraft {
            group: GroupNotation {
                id,
                kind: GroupKind::Or,
                members: Vec::new(),
            },
            separator: None,
            member_done: false,
        });
        self.state = State::InGroupingBody;
        Ok(())
    }

    fn in_grouping_body(&mut self, offset: usize, c: char) -> Result<Flow, ParseError> {
        let member_done = self.group.as_ref().is_some_and(|g| g.member_done);
        let pending = !self.token.text.is_empty();
        match c {
            c if c.is_ascii_alphanumeric() && !member_done => self.token.push(offset, c),
            ':' if pending => {
                self.complete_member()?;
                self.token.begin(offset + 1);
                self.state = State::InRatio {
                    target: RatioTarget::GroupMember,
                };
            }
            ',' | '+' | ')' if pending || member_done => {
                if pending {
                    self.complete_member()?;
                }
                let Some(draft) = self.group.as_mut() else {
                    return Err(self.unexpected(offset, c));
                };
                if c == ')' {
                    draft.group.kind = match draft.separator {
                        Some('+') => GroupKind::Mixture,
                        _ => GroupKind::Or,
                    };
                    if let Some(draft) = self.group.take() {
                        self.doc.groups.push(draft.group);
                    }
                    self.state = State::AfterGrouping;
                } else if draft.separator.is_some_and(|s| s != c) {
                    return Err(self.error_at(offset, c, ParseErrorKind::MixedSeparators));
                } else {
                    draft.separator = Some(c);
                    draft.member_done = false;
                }
            }
            _ => return Err(self.unexpected(offset, c)),
        }
        Ok(Flow::Consumed)
    }

    fn complete_member(&mut self) -> Result<(), ParseError> {
        let (text, span) = self.token.take();
        let entity = whole(entity_id, &text).ok_or_else(|| {
            self.error(span.clone(), ParseErrorKind::InvalidToken(text, "polymer or group ID"))
        })?;
        self.deferred.push((entity, span));

        if let Some(draft) = self.group.as_mut() {
            draft.group.members.push(GroupMember {
                entity,
                ratio: None,
            });
            draft.member_done = true;
        }
        Ok(())
    }

    fn end_grouping_section(&mut self) -> Result<(), ParseError> {
        if let Some((entity, span)) = self
            .deferred
            .iter()
            .find(|(entity, _)| !self.doc.contains(*entity))
            .cloned()
        {
            return Err(self.error(span, ParseErrorKind::UnknownEntity(entity)));
        }

        debug!(groups = self.doc.groups.len(), "finished grouping section");
        self.token.begin(0);
        self.state = State::InExtension {
            in_string: false,
            escaped: false,
        };
        Ok(())
    }
}

// Extension Handlers ==================================================================================================

impl Parser<'_> {
    fn complete_extension(&mut self) -> Result<(), ParseError> {
        let (text, span) = self.token.take();
        if !text.trim().is_empty() {
            self.doc.properties = match serde_json::from_str(&text) {
                Ok(Value::Object(properties)) => properties,
                Ok(_) => {
                    let message = "expected an object".to_owned();
                    return Err(self.error(span, ParseErrorKind::InvalidProperties(message)));
                }
                Err(e) => return Err(self.error(span, ParseErrorKind::InvalidProperties(e.to_string()))),
            };
        }

        self.token.begin(0);
        self.state = State::InVersion;
        Ok(())
    }
}

// Error Construction ==================================================================================================

impl Parser<'_> {
    fn error(&self, span: Range<usize>, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.input, span, None, self.state.name(), kind)
    }

    fn error_at(&self, offset: usize, c: char, kind: ParseErrorKind) -> ParseError {
        let span = offset..offset + c.len_utf8();
        ParseError::new(self.input, span, Some(c), self.state.name(), kind)
    }

    fn unexpected(&self, offset: usize, c: char) -> ParseError {
        self.error_at(offset, c, ParseErrorKind::UnexpectedCharacter(c))
    }
}

// Module Tests ========================================================================================================
