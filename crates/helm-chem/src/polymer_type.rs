// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

// Local Crate Imports
use crate::{PolymerType, RGroup, errors::PolymerTypeError};

// Public API ==========================================================================================================

impl PolymerType {
    pub const ALL: [Self; 4] = [Self::Blob, Self::Chem, Self::Peptide, Self::Rna];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Blob => "BLOB",
            Self::Chem => "CHEM",
            Self::Peptide => "PEPTIDE",
            Self::Rna => "RNA",
        }
    }

    /// The attachment points used to link consecutive backbone monomers: the outgoing point of the left monomer and
    /// the incoming point of the right one. BLOBs have no backbone chemistry to speak of
    #[must_use]
    pub const fn backbone_points(self) -> Option<(RGroup, RGroup)> {
        match self {
            Self::Blob => None,
            Self::Chem | Self::Peptide | Self::Rna => Some((RGroup::R2, RGroup::R1)),
        }
    }

    /// The attachment points used to hang a branch monomer (an RNA base) off of the backbone monomer before it
    #[must_use]
    pub const fn branch_points(self) -> Option<(RGroup, RGroup)> {
        match self {
            Self::Rna => Some((RGroup::R3, RGroup::R1)),
            Self::Blob | Self::Chem | Self::Peptide => None,
        }
    }
}

impl Display for PolymerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolymerType {
    type Err = PolymerTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| PolymerTypeError::new(s))
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use crate::testing_tools::assert_miette_contains;

    use super::*;

    #[test]
    fn names_round_trip() {
        for polymer_type in PolymerType::ALL {
            assert_eq!(polymer_type.to_string().parse(), Ok(polymer_type));
        }
        assert_miette_contains!("DNA".parse::<PolymerType>(), "\"DNA\" is not a known polymer type");
        assert!("peptide".parse::<PolymerType>().is_err());
    }

    #[test]
    fn ordering_matches_rendered_names() {
        let mut by_name = PolymerType::ALL;
        by_name.sort_by_key(|t| t.name());
        assert_eq!(by_name, PolymerType::ALL);
    }

    #[test]
    fn attachment_conventions() {
        let points = |points: Option<(RGroup, RGroup)>| {
            points.map_or_else(|| "none".to_owned(), |(from, to)| format!("{from} -> {to}"))
        };
        let conventions: Vec<_> = PolymerType::ALL
            .into_iter()
            .map(|t| {
                let (backbone, branch) = (points(t.backbone_points()), points(t.branch_points()));
                format!("{t}: backbone {backbone}, branch {branch}")
            })
            .collect();
        assert_snapshot!(conventions.join("\n"), @r"
        BLOB: backbone none, branch none
        CHEM: backbone R2 -> R1, branch none
        PEPTIDE: backbone R2 -> R1, branch none
        RNA: backbone R2 -> R1, branch R3 -> R1
        ");
    }
}
