use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum FormulaError {
    #[diagnostic(help(
        "formulae are written as element symbols (like C or Cl), each optionally followed by a non-zero count, \
        like C3H7NO2"
    ))]
    #[error("could not interpret {formula:?} as a chemical formula")]
    Malformed {
        #[source_code]
        formula: String,
        #[label("the formula was valid up until this point")]
        span: SourceSpan,
    },

    #[diagnostic(help("double-check the capitalisation, since Co (cobalt) and CO (carbon monoxide) differ"))]
    #[error("the element {symbol:?} is not known")]
    UnknownElement {
        #[source_code]
        formula: String,
        symbol: String,
        #[label("unknown element")]
        span: SourceSpan,
    },
}

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
#[diagnostic(help("R-group labels are an 'R' followed by a positive number, like R1 or R3"))]
#[error("{label:?} is not a valid R-group label")]
pub struct RGroupError {
    label: String,
}

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
#[diagnostic(help("the supported polymer types are BLOB, CHEM, PEPTIDE, and RNA"))]
#[error("{name:?} is not a known polymer type")]
pub struct PolymerTypeError {
    name: String,
}

impl FormulaError {
    pub(crate) fn malformed(formula: &str, offset: usize) -> Self {
        let formula = formula.to_owned();
        // NOTE: Point at the remaining input, or at the end of the formula if nothing was left
        let length = usize::from(offset < formula.len());
        let span = SourceSpan::from((offset, length));

        Self::Malformed { formula, span }
    }

    pub(crate) fn unknown_element(formula: &str, symbol: &str, offset: usize) -> Self {
        let span = SourceSpan::from((offset, symbol.len()));
        let formula = formula.to_owned();
        let symbol = symbol.to_owned();

        Self::UnknownElement {
            formula,
            symbol,
            span,
        }
    }
}

impl RGroupError {
    pub(crate) fn new(label: &str) -> Self {
        let label = label.to_owned();

        Self { label }
    }
}

impl PolymerTypeError {
    pub(crate) fn new(name: &str) -> Self {
        let name = name.to_owned();

        Self { name }
    }
}
