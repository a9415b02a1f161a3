// External Crate Imports
use helm_chem::{BondError, RGroup};
use miette::Diagnostic;
use thiserror::Error;

// Local Crate Imports
use crate::notation::PolymerId;

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum BuildError {
    #[error("the monomer {symbol:?} at position {position} of {polymer} could not be found")]
    #[diagnostic(help("check that the monomer library has an entry with this symbol for this polymer type"))]
    UnknownMonomer {
        polymer: PolymerId,
        position: usize,
        symbol: String,
    },

    #[error("position {position} of {polymer} is {reason}, so it can't be built into a single structure")]
    #[diagnostic(help("only concrete monomers with exact repeat counts can be assembled"))]
    AmbiguousMonomer {
        polymer: PolymerId,
        position: usize,
        reason: &'static str,
    },

    #[error("the connection {connection} can't be made, since {reason}")]
    AmbiguousConnection {
        connection: String,
        reason: &'static str,
    },

    #[error("{label} of the monomer at position {position} of {polymer} is already bonded")]
    #[diagnostic(help("each attachment point can only be used by one bond"))]
    ConflictingAttachment {
        polymer: PolymerId,
        position: usize,
        label: RGroup,
    },

    #[error("the monomer {symbol:?} at position {position} of {polymer} has no {label} attachment point")]
    MissingAttachment {
        polymer: PolymerId,
        position: usize,
        label: RGroup,
        symbol: String,
    },

    #[error("{0} has no monomers")]
    EmptyPolymer(PolymerId),

    #[error("{0} is a BLOB, which has no structure that could be assembled")]
    OpaquePolymer(PolymerId),

    #[error("{0} is not part of this document")]
    UnknownPolymer(PolymerId),

    #[error("the document has no polymers to assemble")]
    EmptyDocument,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Bond(#[from] BondError),
}
