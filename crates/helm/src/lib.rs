//! Reading, editing, and building HELM (Hierarchical Editing Language for Macromolecules) documents: a HELM2 parser
//! and serializer, in-place document edits, assembly into a single molecular structure, a canonical text form, and
//! extinction coefficient estimates

pub mod assembler;
pub mod canonical;
pub mod extinction;
pub mod notation;
pub mod parser;
#[cfg(test)]
mod testing_tools;

pub use assembler::{Assembler, BuildError};
pub use canonical::{CanonicalizeError, canonicalize};
pub use extinction::{
    CalculationError, ExtinctionCalculator, ExtinctionCoefficients, ExtinctionUnit,
};
pub use notation::{Helm2Notation, edit::EditError};
pub use parser::{ParseError, ParseErrorKind, parse, parse_upgrading};
