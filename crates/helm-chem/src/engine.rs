//! The seam between notation and chemistry: anything that can instantiate monomers, bond them at attachment points,
//! and cap whatever is left open can be driven by the HELM assembler

// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// External Crate Imports
use derive_more::{Display, From, IsVariant};
use miette::Diagnostic;
use thiserror::Error;

// Local Crate Imports
use crate::{Formula, MonomerStructure, RGroup};

// Public API ==========================================================================================================

/// Identifies one concrete copy of a monomer within an assembly (repeats produce several instances per position)
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From)]
#[display("#{_0}")]
pub struct InstanceId(pub usize);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct AttachmentSite {
    pub instance: InstanceId,
    pub label: RGroup,
}

impl AttachmentSite {
    #[must_use]
    pub const fn new(instance: InstanceId, label: RGroup) -> Self {
        Self { instance, label }
    }
}

impl Display for AttachmentSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} of monomer {}", self.label, self.instance)
    }
}

/// Formula-only engines can report compositions and masses; structural engines also produce connection tables
#[derive(Copy, Clone, Eq, PartialEq, Debug, IsVariant)]
pub enum EngineKind {
    /// Implemented in this crate by [`FormulaEngine`](crate::FormulaEngine)
    Formula,
    /// Reserved for engines built outside of this crate (on top of a cheminformatics toolkit, for example) that track
    /// individual atoms and bonds
    Structural,
}

pub trait ChemistryEngine {
    type Structure: Clone;

    fn kind(&self) -> EngineKind;

    fn instantiate(
        &self,
        monomer: &MonomerStructure,
        instance: InstanceId,
    ) -> Result<Self::Structure, BondError>;

    /// Joins two separate structures with a single bond between `left_site` and `right_site`
    fn bond(
        &self,
        left: Self::Structure,
        left_site: AttachmentSite,
        right: Self::Structure,
        right_site: AttachmentSite,
    ) -> Result<Self::Structure, BondError>;

    /// Bonds two attachment points that already belong to the same structure, closing a ring
    fn cyclize(
        &self,
        structure: Self::Structure,
        a: AttachmentSite,
        b: AttachmentSite,
    ) -> Result<Self::Structure, BondError>;

    /// Places two structures side-by-side without bonding them
    fn combine(&self, a: Self::Structure, b: Self::Structure) -> Self::Structure;

    /// Fills every attachment point that is still open with its capping group
    fn cap(&self, structure: Self::Structure) -> Result<Self::Structure, BondError>;

    fn formula(&self, structure: &Self::Structure) -> Formula;
}

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum BondError {
    #[error("the attachment point {0} is not available for bonding")]
    #[diagnostic(help(
        "the monomer may not define that R-group, or it might already be bonded to something else"
    ))]
    MissingAttachment(AttachmentSite),

    #[error("the attachment point {0} cannot be bonded to itself")]
    SelfBond(AttachmentSite),

    #[error("the chemistry engine rejected a bond: {0}")]
    Rejected(String),
}
