//! The in-memory model of a HELM document: polymers made of monomer notations, the connections between them, polymer
//! groupings, and the free-form extension properties

mod display;
pub mod edit;

// Standard Library Imports
use std::{num::NonZeroU32, str::FromStr};

// External Crate Imports
use derive_more::{From, IsVariant};
use helm_chem::PolymerType;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

// Local Crate Imports
use crate::parser::{self, ParseError};

pub const DEFAULT_VERSION: &str = "V2.0";

// Identifiers =========================================================================================================

/// A polymer type plus an index, like `PEPTIDE1`, unique within a document
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PolymerId {
    pub kind: PolymerType,
    pub index: NonZeroU32,
}

impl PolymerId {
    #[must_use]
    pub const fn new(kind: PolymerType, index: NonZeroU32) -> Self {
        Self { kind, index }
    }
}

/// The name of a polymer grouping, like `G1`
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From)]
pub struct GroupId(pub NonZeroU32);

/// Anything a connection or grouping can refer to
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From, IsVariant)]
pub enum EntityId {
    Polymer(PolymerId),
    Group(GroupId),
}

impl EntityId {
    #[must_use]
    pub const fn polymer(&self) -> Option<PolymerId> {
        match self {
            Self::Polymer(id) => Some(*id),
            Self::Group(_) => None,
        }
    }
}

// Monomers ============================================================================================================

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, IsVariant)]
pub enum MonomerRef {
    Symbol(String),
    /// An inline structure written between square brackets, kept exactly as written
    Inline(String),
    /// `?`, any monomer
    Wildcard,
    /// `_`, a monomer that hasn't been defined
    Undefined,
}

impl MonomerRef {
    #[must_use]
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self::Symbol(symbol.into())
    }

    /// Classifies the text of a monomer token (with any surrounding square brackets already removed)
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "?" => Self::Wildcard,
            "_" => Self::Undefined,
            inline if inline.contains(['*', '[']) => Self::Inline(inline.to_owned()),
            symbol => Self::Symbol(symbol.to_owned()),
        }
    }

    #[must_use]
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }
}

/// A repeat count like `'3'`, or an inclusive range like `'3-5'`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, IsVariant)]
pub enum RepeatCount {
    Exact(NonZeroU32),
    Range(NonZeroU32, NonZeroU32),
}

impl RepeatCount {
    /// Returns `None` if `low > high`
    #[must_use]
    pub fn range(low: NonZeroU32, high: NonZeroU32) -> Option<Self> {
        (low <= high).then_some(Self::Range(low, high))
    }

    /// The single number of copies this count describes, if there is one. A range whose ends agree is concrete
    #[must_use]
    pub const fn concrete(self) -> Option<u32> {
        match self {
            Self::Exact(n) => Some(n.get()),
            Self::Range(low, high) if low.get() == high.get() => Some(low.get()),
            Self::Range(..) => None,
        }
    }
}

/// How a unit joins the unit before it
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, IsVariant)]
pub enum Link {
    /// Separated by `.`, or the first unit of its sequence
    #[default]
    Backbone,
    /// Written directly after the previous unit, like the `P` in the RNA `R(A)P`
    Adjacent,
    /// Hung off of the previous unit in parentheses, like the `A` in the RNA `R(A)P`
    Branch,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MonomerUnit {
    position: usize,
    pub monomer: MonomerRef,
    pub link: Link,
    pub repeat: Option<RepeatCount>,
    pub annotation: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Alternative {
    pub monomer: MonomerRef,
    pub ratio: Option<Decimal>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MonomerList {
    position: usize,
    pub alternatives: Vec<Alternative>,
    pub repeat: Option<RepeatCount>,
    pub annotation: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MonomerGroup {
    pub elements: Vec<MonomerNotation>,
    pub repeat: Option<RepeatCount>,
    pub annotation: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, IsVariant)]
pub enum MonomerNotation {
    Unit(MonomerUnit),
    /// Alternatives separated by `,`
    List(MonomerList),
    /// Alternatives separated by `+`
    Mixture(MonomerList),
    Group(MonomerGroup),
}

// Polymers, Connections, and Groupings ================================================================================

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PolymerNotation {
    id: PolymerId,
    elements: Vec<MonomerNotation>,
    pub annotation: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, IsVariant)]
pub enum SitePosition {
    Index(usize),
    /// One of several positions, written like `(1,3)`
    Alternatives(Vec<usize>),
    /// `?`
    Unknown,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, IsVariant)]
pub enum AttachmentPoint {
    RGroup(helm_chem::RGroup),
    /// `?`
    Wildcard,
    /// `pair`, a hydrogen bond between bases
    Pair,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Endpoint {
    pub entity: EntityId,
    pub position: SitePosition,
    pub attachment: AttachmentPoint,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ConnectionNotation {
    pub source: Endpoint,
    pub target: Endpoint,
    pub annotation: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, IsVariant)]
pub enum GroupKind {
    /// Members separated by `,`
    Or,
    /// Members separated by `+`
    Mixture,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct GroupMember {
    pub entity: EntityId,
    pub ratio: Option<Decimal>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct GroupNotation {
    pub id: GroupId,
    pub kind: GroupKind,
    pub members: Vec<GroupMember>,
}

// Documents ===========================================================================================================

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Helm2Notation {
    pub(crate) polymers: Vec<PolymerNotation>,
    pub(crate) connections: Vec<ConnectionNotation>,
    pub(crate) groups: Vec<GroupNotation>,
    pub(crate) properties: Map<String, Value>,
    pub(crate) version: String,
}

impl Default for Helm2Notation {
    fn default() -> Self {
        Self {
            polymers: Vec::new(),
            connections: Vec::new(),
            groups: Vec::new(),
            properties: Map::new(),
            version: DEFAULT_VERSION.to_owned(),
        }
    }
}

impl FromStr for Helm2Notation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse(s)
    }
}

impl Helm2Notation {
    #[must_use]
    pub fn polymers(&self) -> &[PolymerNotation] {
        &self.polymers
    }

    #[must_use]
    pub fn connections(&self) -> &[ConnectionNotation] {
        &self.connections
    }

    #[must_use]
    pub fn groups(&self) -> &[GroupNotation] {
        &self.groups
    }

    #[must_use]
    pub const fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn polymer(&self, id: PolymerId) -> Option<&PolymerNotation> {
        self.polymers.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&GroupNotation> {
        self.groups.iter().find(|g| g.id == id)
    }

    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        match entity {
            EntityId::Polymer(id) => self.polymer(id).is_some(),
            EntityId::Group(id) => self.group(id).is_some(),
        }
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    pub(crate) fn polymer_mut(&mut self, id: PolymerId) -> Option<&mut PolymerNotation> {
        self.polymers.iter_mut().find(|p| p.id == id)
    }
}

impl PolymerNotation {
    /// Positions are (re)assigned to `elements` in textual order
    #[must_use]
    pub fn new(id: PolymerId, elements: Vec<MonomerNotation>) -> Self {
        let mut polymer = Self {
            id,
            elements,
            annotation: None,
        };
        polymer.renumber();
        polymer
    }

    #[must_use]
    pub const fn id(&self) -> PolymerId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> PolymerType {
        self.id.kind
    }

    #[must_use]
    pub fn elements(&self) -> &[MonomerNotation] {
        &self.elements
    }

    /// Every addressable Unit, List, and Mixture in textual order, looking inside of Groups
    #[must_use]
    pub fn sites(&self) -> Vec<&MonomerNotation> {
        let mut sites = Vec::new();
        collect_sites(&self.elements, &mut sites);
        sites
    }

    /// Finds the Unit, List, or Mixture at a 1-based `position`
    #[must_use]
    pub fn site(&self, position: usize) -> Option<&MonomerNotation> {
        self.sites()
            .into_iter()
            .find(|site| site.position() == Some(position))
    }

    #[must_use]
    pub fn position_count(&self) -> usize {
        self.sites().len()
    }

    /// Every Unit in textual order, looking inside of Groups
    #[must_use]
    pub fn units(&self) -> Vec<&MonomerUnit> {
        self.sites()
            .into_iter()
            .filter_map(|site| match site {
                MonomerNotation::Unit(unit) => Some(unit),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn elements_mut(&mut self) -> &mut Vec<MonomerNotation> {
        &mut self.elements
    }

    pub(crate) fn renumber(&mut self) {
        let mut next = 1;
        number_positions(&mut self.elements, &mut next);
    }
}

impl MonomerNotation {
    #[must_use]
    pub fn unit(monomer: MonomerRef) -> Self {
        Self::Unit(MonomerUnit::new(monomer))
    }

    /// The position of a Unit, List, or Mixture, or of the first member of a Group
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Unit(unit) => Some(unit.position),
            Self::List(list) | Self::Mixture(list) => Some(list.position),
            Self::Group(group) => group.elements.first().and_then(Self::position),
        }
    }

    #[must_use]
    pub const fn repeat(&self) -> Option<RepeatCount> {
        match self {
            Self::Unit(MonomerUnit { repeat, .. })
            | Self::List(MonomerList { repeat, .. })
            | Self::Mixture(MonomerList { repeat, .. })
            | Self::Group(MonomerGroup { repeat, .. }) => *repeat,
        }
    }

    pub(crate) const fn repeat_mut(&mut self) -> &mut Option<RepeatCount> {
        match self {
            Self::Unit(MonomerUnit { repeat, .. })
            | Self::List(MonomerList { repeat, .. })
            | Self::Mixture(MonomerList { repeat, .. })
            | Self::Group(MonomerGroup { repeat, .. }) => repeat,
        }
    }

    #[must_use]
    pub fn annotation(&self) -> Option<&str> {
        match self {
            Self::Unit(MonomerUnit { annotation, .. })
            | Self::List(MonomerList { annotation, .. })
            | Self::Mixture(MonomerList { annotation, .. })
            | Self::Group(MonomerGroup { annotation, .. }) => annotation.as_deref(),
        }
    }

    pub(crate) const fn annotation_mut(&mut self) -> &mut Option<String> {
        match self {
            Self::Unit(MonomerUnit { annotation, .. })
            | Self::List(MonomerList { annotation, .. })
            | Self::Mixture(MonomerList { annotation, .. })
            | Self::Group(MonomerGroup { annotation, .. }) => annotation,
        }
    }

    /// How this element joins the one before it. Anything other than a Unit sits on the backbone
    #[must_use]
    pub const fn link(&self) -> Link {
        match self {
            Self::Unit(unit) => unit.link,
            Self::List(_) | Self::Mixture(_) | Self::Group(_) => Link::Backbone,
        }
    }
}

impl MonomerUnit {
    #[must_use]
    pub const fn new(monomer: MonomerRef) -> Self {
        Self {
            position: 0,
            monomer,
            link: Link::Backbone,
            repeat: None,
            annotation: None,
        }
    }

    #[must_use]
    pub const fn with_link(mut self, link: Link) -> Self {
        self.link = link;
        self
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

impl MonomerList {
    #[must_use]
    pub const fn new(alternatives: Vec<Alternative>) -> Self {
        Self {
            position: 0,
            alternatives,
            repeat: None,
            annotation: None,
        }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

impl MonomerGroup {
    #[must_use]
    pub const fn new(elements: Vec<MonomerNotation>) -> Self {
        Self {
            elements,
            repeat: None,
            annotation: None,
        }
    }
}

impl Endpoint {
    #[must_use]
    pub const fn new(entity: EntityId, position: SitePosition, attachment: AttachmentPoint) -> Self {
        Self {
            entity,
            position,
            attachment,
        }
    }
}

impl ConnectionNotation {
    #[must_use]
    pub const fn new(source: Endpoint, target: Endpoint) -> Self {
        Self {
            source,
            target,
            annotation: None,
        }
    }

    #[must_use]
    pub fn touches(&self, entity: EntityId) -> bool {
        self.source.entity == entity || self.target.entity == entity
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        [&self.source, &self.target].into_iter()
    }

    pub(crate) fn endpoints_mut(&mut self) -> [&mut Endpoint; 2] {
        [&mut self.source, &mut self.target]
    }
}

// Private Helper Functions ============================================================================================

fn collect_sites<'a>(elements: &'a [MonomerNotation], sites: &mut Vec<&'a MonomerNotation>) {
    for element in elements {
        match element {
            MonomerNotation::Group(group) => collect_sites(&group.elements, sites),
            site => sites.push(site),
        }
    }
}

fn number_positions(elements: &mut [MonomerNotation], next: &mut usize) {
    for element in elements {
        match element {
            MonomerNotation::Unit(MonomerUnit { position, .. })
            | MonomerNotation::List(MonomerList { position, .. })
            | MonomerNotation::Mixture(MonomerList { position, .. }) => {
                *position = *next;
                *next += 1;
            }
            MonomerNotation::Group(group) => number_positions(&mut group.elements, next),
        }
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn monomer_tokens() {
        assert_eq!(MonomerRef::from_token("A"), MonomerRef::symbol("A"));
        assert_eq!(MonomerRef::from_token("5meC"), MonomerRef::symbol("5meC"));
        assert_eq!(MonomerRef::from_token("?"), MonomerRef::Wildcard);
        assert_eq!(MonomerRef::from_token("_"), MonomerRef::Undefined);
        assert_eq!(
            MonomerRef::from_token("[*]OCCO[*]"),
            MonomerRef::Inline("[*]OCCO[*]".to_owned())
        );
        assert_eq!(MonomerRef::from_token("[*:1]C").as_symbol(), None);
        assert_eq!(MonomerRef::symbol("dR").as_symbol(), Some("dR"));
    }

    #[test]
    fn repeat_counts() {
        assert_eq!(RepeatCount::Exact(nz(3)).concrete(), Some(3));
        assert_eq!(RepeatCount::range(nz(2), nz(2)).unwrap().concrete(), Some(2));
        assert_eq!(RepeatCount::range(nz(2), nz(4)).unwrap().concrete(), None);
        assert_eq!(RepeatCount::range(nz(4), nz(2)), None);
    }

    #[test]
    fn positions_descend_into_groups() {
        let unit = |s| MonomerNotation::unit(MonomerRef::symbol(s));
        let list = MonomerNotation::List(MonomerList::new(vec![
            Alternative {
                monomer: MonomerRef::symbol("A"),
                ratio: None,
            },
            Alternative {
                monomer: MonomerRef::symbol("C"),
                ratio: None,
            },
        ]));
        let group = MonomerNotation::Group(MonomerGroup::new(vec![unit("D"), list, unit("E")]));
        let id = PolymerId::new(PolymerType::Peptide, nz(1));
        let polymer = PolymerNotation::new(id, vec![unit("G"), group, unit("K")]);

        assert_eq!(polymer.position_count(), 5);
        assert_eq!(polymer.elements()[1].position(), Some(2));
        assert!(polymer.site(3).unwrap().is_list());
        assert_eq!(polymer.site(5).unwrap().position(), Some(5));
        assert!(polymer.site(6).is_none());
        assert!(polymer.site(0).is_none());

        let symbols: Vec<_> = polymer
            .units()
            .into_iter()
            .filter_map(|u| u.monomer.as_symbol())
            .collect();
        assert_eq!(symbols, ["G", "D", "E", "K"]);
    }

    #[test]
    fn document_lookups() {
        let id = PolymerId::new(PolymerType::Rna, nz(1));
        let mut doc = Helm2Notation::default();
        assert_eq!(doc.version(), DEFAULT_VERSION);
        doc.polymers.push(PolymerNotation::new(id, Vec::new()));

        assert!(doc.polymer(id).is_some());
        assert!(doc.contains(EntityId::Polymer(id)));
        assert!(!doc.contains(EntityId::Group(GroupId(nz(1)))));
        assert!(doc.polymer(PolymerId::new(PolymerType::Rna, nz(2))).is_none());
        assert_eq!(EntityId::from(id).polymer(), Some(id));
        assert_eq!(EntityId::from(GroupId(nz(1))).polymer(), None);
    }
}
