// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// External Crate Imports
use itertools::Itertools;
use serde_json::Value;

// Local Crate Imports
use super::{
    Alternative, AttachmentPoint, ConnectionNotation, Endpoint, EntityId, GroupId, GroupKind,
    GroupMember, GroupNotation, Helm2Notation, Link, MonomerGroup, MonomerList, MonomerNotation,
    MonomerRef, MonomerUnit, PolymerId, PolymerNotation, RepeatCount, SitePosition,
};

// Identifiers =========================================================================================================

impl Display for PolymerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.index)
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polymer(id) => id.fmt(f),
            Self::Group(id) => id.fmt(f),
        }
    }
}

// Monomers ============================================================================================================

impl Display for MonomerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(symbol) if symbol.len() == 1 && symbol.chars().all(|c| c.is_ascii_alphanumeric()) => {
                f.write_str(symbol)
            }
            Self::Symbol(text) | Self::Inline(text) => write!(f, "[{text}]"),
            Self::Wildcard => f.write_str("?"),
            Self::Undefined => f.write_str("_"),
        }
    }
}

impl Display for RepeatCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{n}"),
            Self::Range(low, high) => write!(f, "{low}-{high}"),
        }
    }
}

// NOTE: Repeat counts and annotations are written the same way after every kind of monomer notation
struct Suffix<'a>(&'a Option<RepeatCount>, &'a Option<String>);

impl Display for Suffix<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(repeat) = self.0 {
            write!(f, "'{repeat}'")?;
        }
        if let Some(annotation) = self.1 {
            write!(f, "\"{annotation}\"")?;
        }
        Ok(())
    }
}

impl Display for MonomerUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let suffix = Suffix(&self.repeat, &self.annotation);
        match self.link {
            Link::Branch => write!(f, "({}){suffix}", self.monomer),
            Link::Backbone | Link::Adjacent => write!(f, "{}{suffix}", self.monomer),
        }
    }
}

impl Display for Alternative {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.monomer)?;
        if let Some(ratio) = self.ratio {
            write!(f, ":{ratio}")?;
        }
        Ok(())
    }
}

impl MonomerList {
    fn fmt_with(&self, f: &mut Formatter<'_>, separator: &str) -> fmt::Result {
        let alternatives = self.alternatives.iter().join(separator);
        let suffix = Suffix(&self.repeat, &self.annotation);
        write!(f, "({alternatives}){suffix}")
    }
}

impl Display for MonomerGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        fmt_sequence(f, &self.elements)?;
        write!(f, "){}", Suffix(&self.repeat, &self.annotation))
    }
}

impl Display for MonomerNotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(unit) => unit.fmt(f),
            Self::List(list) => list.fmt_with(f, ","),
            Self::Mixture(list) => list.fmt_with(f, "+"),
            Self::Group(group) => group.fmt(f),
        }
    }
}

fn fmt_sequence(f: &mut Formatter<'_>, elements: &[MonomerNotation]) -> fmt::Result {
    for (i, element) in elements.iter().enumerate() {
        if i > 0 && element.link().is_backbone() {
            f.write_str(".")?;
        }
        element.fmt(f)?;
    }
    Ok(())
}

// Polymers, Connections, and Groupings ================================================================================

impl PolymerNotation {
    /// Just the monomers between the braces, like `A.C.(D.E)'2'`
    #[must_use]
    pub fn body_text(&self) -> String {
        struct Body<'a>(&'a [MonomerNotation]);

        impl Display for Body<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                fmt_sequence(f, self.0)
            }
        }

        Body(&self.elements).to_string()
    }
}

impl Display for PolymerNotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.id)?;
        fmt_sequence(f, &self.elements)?;
        f.write_str("}")?;
        if let Some(annotation) = &self.annotation {
            write!(f, "\"{annotation}\"")?;
        }
        Ok(())
    }
}

impl Display for SitePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(position) => write!(f, "{position}"),
            Self::Alternatives(positions) => write!(f, "({})", positions.iter().join(",")),
            Self::Unknown => f.write_str("?"),
        }
    }
}

impl Display for AttachmentPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::RGroup(r_group) => r_group.fmt(f),
            Self::Wildcard => f.write_str("?"),
            Self::Pair => f.write_str("pair"),
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.position, self.attachment)
    }
}

impl Display for ConnectionNotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            source, target, ..
        } = self;
        write!(f, "{},{},{source}-{target}", source.entity, target.entity)?;
        if let Some(annotation) = &self.annotation {
            write!(f, "\"{annotation}\"")?;
        }
        Ok(())
    }
}

impl Display for GroupMember {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity)?;
        if let Some(ratio) = self.ratio {
            write!(f, ":{ratio}")?;
        }
        Ok(())
    }
}

impl Display for GroupNotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let separator = match self.kind {
            GroupKind::Or => ",",
            GroupKind::Mixture => "+",
        };
        write!(f, "{}({})", self.id, self.members.iter().join(separator))
    }
}

// Documents ===========================================================================================================

impl Display for Helm2Notation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}${}${}$",
            self.polymers.iter().join("|"),
            self.connections.iter().join("|"),
            self.groups.iter().join("|")
        )?;
        if !self.properties.is_empty() {
            write!(f, "{}", Value::Object(self.properties.clone()))?;
        }
        write!(f, "${}", self.version)
    }
}

// Module Tests ========================================================================================================
