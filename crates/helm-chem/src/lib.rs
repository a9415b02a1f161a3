//! The chemistry-side vocabulary shared by HELM notation tools: polymer types, attachment points, molecular formulae,
//! monomer structures, and the collaborators (monomer stores and chemistry engines) that turn notation into molecules

pub mod engine;
pub mod errors;
mod formula;
pub mod formula_engine;
mod mass;
mod monomer;
pub mod monomer_database;
mod parsers;
mod polymer_type;
mod r_group;
pub mod store;
#[cfg(test)]
mod testing_tools;

use std::{collections::BTreeMap, num::NonZeroU32};

// External Crate Imports
use derive_more::{Add, Display, From, IsVariant, Sub, Sum};
use rust_decimal::Decimal;

// FIXME: Work on what's publicly exported / part of the API! Maybe create a prelude?
pub use engine::{AttachmentSite, BondError, ChemistryEngine, EngineKind, InstanceId};
pub use errors::{FormulaError, PolymerTypeError, RGroupError};
pub use formula_engine::{FormulaEngine, FormulaStructure};
pub use monomer_database::MonomerDatabase;
pub use store::MonomerStore;

// ---------------------------------------------------------------------------------------------------------------------

// NOTE: Variants are kept in the alphabetical order of their HELM names, so the derived `Ord` matches the ordering of
// the rendered notation
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, IsVariant)]
pub enum PolymerType {
    Blob,
    Chem,
    Peptide,
    Rna,
}

// MISSING: `RGroup` intentionally doesn't implement `Default`, since there is no sensible "first" attachment point for
// every monomer
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RGroup(NonZeroU32);

// NOTE: Counts are signed, since fragments (monomers with their capping groups removed) are allowed to temporarily
// "owe" atoms to their caps
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Formula {
    atoms: BTreeMap<&'static str, i64>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MonomerStructure {
    polymer_type: PolymerType,
    symbol: String,
    name: String,
    kind: MonomerKind,
    natural_analog: Option<String>,
    formula: Formula,
    attachments: Vec<Attachment>,
    smiles: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Display, IsVariant)]
pub enum MonomerKind {
    Backbone,
    Branch,
    Terminal,
    #[default]
    Undefined,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Attachment {
    label: RGroup,
    cap: Formula,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, From, Add, Sub, Sum)]
pub struct MonoisotopicMass(pub Decimal);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, From, Add, Sub, Sum)]
pub struct AverageMass(pub Decimal);

pub trait Massive {
    fn monoisotopic_mass(&self) -> MonoisotopicMass;
    fn average_mass(&self) -> AverageMass;
}

// Blanket impls

macro_rules! massive_ref_impls {
    ($($ref_type:ty),+ $(,)?) => {
        $(
            impl<T: Massive> Massive for $ref_type {
                fn monoisotopic_mass(&self) -> MonoisotopicMass {
                    (**self).monoisotopic_mass()
                }

                fn average_mass(&self) -> AverageMass {
                    (**self).average_mass()
                }
            }
        )+
    };
}

massive_ref_impls!(&T, &mut T, Box<T>);
