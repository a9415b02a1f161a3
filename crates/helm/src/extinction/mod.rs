//! Estimates the molar extinction coefficient (at 260nm for nucleic acids, and 280nm for peptides) of a document using
//! the nearest-neighbour method for RNA and DNA, and a sum of residue coefficients for peptides

mod tables;

// Standard Library Imports
use std::borrow::Cow;

// External Crate Imports
use helm_chem::{MonomerStore, PolymerType};
use itertools::Itertools;
use miette::Diagnostic;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::{debug, trace};

// Local Crate Imports
use crate::notation::{
    Helm2Notation, MonomerNotation, MonomerRef, MonomerUnit, PolymerId, PolymerNotation,
};
pub use tables::ExtinctionCoefficients;

// Public API ==========================================================================================================

/// Which units the document total is reported in. Nucleic acid coefficients are tabulated in mM⁻¹cm⁻¹ and peptide
/// coefficients in M⁻¹cm⁻¹, so the polymers not already in the requested unit are scaled by a factor of 1000
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum ExtinctionUnit {
    #[default]
    MilliMolar,
    Molar,
}

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum CalculationError {
    #[error("{0} has no monomers to calculate an extinction coefficient from")]
    EmptySequence(PolymerId),

    #[error("the monomer {symbol:?} at position {position} of {polymer} could not be found")]
    UnknownMonomer {
        polymer: PolymerId,
        position: usize,
        symbol: String,
    },

    #[error("position {position} of {polymer} is {reason}")]
    #[diagnostic(help(
        "this is valid HELM, but extinction coefficients are only calculated for fully-resolved linear sequences"
    ))]
    HandledElsewhere {
        polymer: PolymerId,
        position: usize,
        reason: &'static str,
    },
}

type Result<T, E = CalculationError> = std::result::Result<T, E>;

#[derive(Copy, Clone, Debug)]
pub struct ExtinctionCalculator<'c, 's, S> {
    coefficients: &'c ExtinctionCoefficients,
    store: &'s S,
    unit: ExtinctionUnit,
}

impl<'c, 's, S: MonomerStore> ExtinctionCalculator<'c, 's, S> {
    #[must_use]
    pub const fn new(coefficients: &'c ExtinctionCoefficients, store: &'s S) -> Self {
        Self {
            coefficients,
            store,
            unit: ExtinctionUnit::MilliMolar,
        }
    }

    #[must_use]
    pub const fn with_unit(mut self, unit: ExtinctionUnit) -> Self {
        self.unit = unit;
        self
    }

    /// CHEM and BLOB polymers contribute nothing. Any RNA or peptide that isn't a fully-resolved, linear sequence fails
    /// the whole calculation
    pub fn calculate(&self, doc: &Helm2Notation) -> Result<f32> {
        let mut nucleic_acids = Decimal::ZERO;
        let mut peptides = Decimal::ZERO;
        for polymer in doc.polymers() {
            match polymer.kind() {
                PolymerType::Rna => nucleic_acids += self.nucleic_acid(polymer)?,
                PolymerType::Peptide => peptides += self.peptide(polymer)?,
                PolymerType::Chem | PolymerType::Blob => trace!(polymer = %polymer.id(), "no contribution"),
            }
        }

        let total = match self.unit {
            ExtinctionUnit::MilliMolar => nucleic_acids + peptides / dec!(1000),
            ExtinctionUnit::Molar => nucleic_acids * dec!(1000) + peptides,
        };
        debug!(%nucleic_acids, %peptides, unit = ?self.unit, %total, "calculated extinction coefficient");

        // SAFETY: Converting a `Decimal` to an `f32` only ever loses precision
        Ok(total.to_f32().unwrap())
    }
}

// Per-Polymer Calculations ============================================================================================

impl<'s, S: MonomerStore> ExtinctionCalculator<'_, 's, S> {
    fn nucleic_acid(&self, polymer: &PolymerNotation) -> Result<Decimal> {
        let mut bases = Vec::new();
        for (unit, copies) in linear_units(polymer)? {
            if !unit.link.is_branch() {
                continue;
            }
            let base = self.natural_analog(polymer.id(), unit.position(), &unit.monomer)?;
            bases.extend(std::iter::repeat_n(base, copies));
        }

        let coefficients = self.coefficients;
        let extinction = match &bases[..] {
            [] => return Err(CalculationError::EmptySequence(polymer.id())),
            [base] => coefficients.mono_nucleotide(base).unwrap_or_default(),
            [_, interior @ .., _] => {
                let pairs: Decimal = bases
                    .iter()
                    .tuple_windows()
                    .filter_map(|(first, second)| coefficients.di_nucleotide(first, second))
                    .sum();
                let singles: Decimal = interior
                    .iter()
                    .filter_map(|base| coefficients.mono_nucleotide(base))
                    .sum();
                dec!(2) * pairs - singles
            }
        };

        trace!(polymer = %polymer.id(), bases = %bases.iter().join(""), %extinction);
        Ok(extinction)
    }

    fn peptide(&self, polymer: &PolymerNotation) -> Result<Decimal> {
        let mut extinction = Decimal::ZERO;
        for (unit, copies) in linear_units(polymer)? {
            let residue = self.natural_analog(polymer.id(), unit.position(), &unit.monomer);
            // NOTE: Residues missing from the store may still be listed under an alternate name, like `Trp`
            let coefficient = match (residue, &unit.monomer) {
                (Ok(residue), _) => self.coefficients.amino_acid(&residue).unwrap_or_default(),
                (Err(error @ CalculationError::UnknownMonomer { .. }), MonomerRef::Symbol(symbol)) => {
                    self.coefficients.amino_acid(symbol).ok_or(error)?
                }
                (Err(error), _) => return Err(error),
            };
            extinction += coefficient * Decimal::from(copies);
        }

        trace!(polymer = %polymer.id(), %extinction);
        Ok(extinction)
    }

    fn natural_analog(&self, id: PolymerId, position: usize, monomer: &MonomerRef) -> Result<Cow<'s, str>> {
        let unknown = |symbol: &str| CalculationError::UnknownMonomer {
            polymer: id,
            position,
            symbol: symbol.to_owned(),
        };

        match monomer {
            MonomerRef::Symbol(symbol) => self
                .store
                .lookup(id.kind, symbol)
                .map(|monomer| Cow::Borrowed(monomer.natural_analog()))
                .ok_or_else(|| unknown(symbol)),
            MonomerRef::Inline(structure) => match self.store.resolve_inline(id.kind, structure) {
                Some(Cow::Borrowed(monomer)) => Ok(Cow::Borrowed(monomer.natural_analog())),
                Some(Cow::Owned(monomer)) => Ok(Cow::Owned(monomer.natural_analog().to_owned())),
                None => Err(unknown(structure)),
            },
            MonomerRef::Wildcard | MonomerRef::Undefined => {
                unreachable!("unresolved monomers are rejected by `linear_units()`")
            }
        }
    }
}

// Private Helper Functions ============================================================================================

/// Every top-level unit of `polymer`, paired with the number of times it's repeated
fn linear_units(polymer: &PolymerNotation) -> Result<Vec<(&MonomerUnit, usize)>> {
    if polymer.position_count() == 0 {
        return Err(CalculationError::EmptySequence(polymer.id()));
    }

    polymer
        .elements()
        .iter()
        .map(|element| {
            let handled_elsewhere = |reason| CalculationError::HandledElsewhere {
                polymer: polymer.id(),
                position: element.position().unwrap_or_default(),
                reason,
            };
            match element {
                MonomerNotation::Unit(unit) => {
                    if let Some(reason) = unresolved(&unit.monomer) {
                        return Err(handled_elsewhere(reason));
                    }
                    let copies = match unit.repeat {
                        Some(repeat) => repeat
                            .concrete()
                            .ok_or_else(|| handled_elsewhere("repeated a range of times"))?,
                        None => 1,
                    };
                    Ok((unit, copies as usize))
                }
                MonomerNotation::List(_) => Err(handled_elsewhere("a list of alternative monomers")),
                MonomerNotation::Mixture(_) => Err(handled_elsewhere("a mixture of monomers")),
                MonomerNotation::Group(_) => Err(handled_elsewhere("a group of monomers")),
            }
        })
        .collect()
}

const fn unresolved(monomer: &MonomerRef) -> Option<&'static str> {
    match monomer {
        MonomerRef::Wildcard => Some("the wildcard monomer `?`"),
        MonomerRef::Undefined => Some("the undefined monomer `_`"),
        MonomerRef::Symbol(_) | MonomerRef::Inline(_) => None,
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use helm_chem::MonomerDatabase;
    use once_cell::sync::Lazy;

    use super::*;
    use crate::{parser::parse, testing_tools::assert_miette_contains};

    static DB: Lazy<MonomerDatabase> = Lazy::new(MonomerDatabase::default);
    static COEFFICIENTS: Lazy<ExtinctionCoefficients> = Lazy::new(ExtinctionCoefficients::default);

    fn calculate_in(unit: ExtinctionUnit, text: &str) -> Result<f32> {
        let doc = parse(text).unwrap();
        ExtinctionCalculator::new(&COEFFICIENTS, &*DB)
            .with_unit(unit)
            .calculate(&doc)
    }

    fn calculate(text: &str) -> Result<f32> {
        calculate_in(ExtinctionUnit::MilliMolar, text)
    }

    macro_rules! assert_extinction {
        ($result:expr, $expected:expr) => {
            let result = $result.unwrap();
            assert!(
                (result - $expected).abs() < 1e-3,
                "expected {} but got {result}",
                $expected
            );
        };
    }

    fn id(kind: PolymerType, index: u32) -> PolymerId {
        PolymerId::new(kind, NonZeroU32::new(index).unwrap())
    }

    #[test]
    fn peptides() {
        let text = "PEPTIDE1{C}|PEPTIDE2{Y.V.N.L.I}$PEPTIDE1,PEPTIDE2,1:R3-1:R3$$$V2.0";
        assert_extinction!(calculate(text), 1.5525);
        assert_extinction!(calculate_in(ExtinctionUnit::Molar, text), 1552.5);

        assert_extinction!(calculate("PEPTIDE1{W'2'.Y.A}$$$$V2.0"), 12.49);
        assert_extinction!(calculate("PEPTIDE1{A.G.S}$$$$V2.0"), 0.0);
        assert_extinction!(calculate("PEPTIDE1{[Trp].[Tyr]}$$$$V2.0"), 6.99);
    }

    #[test]
    fn nucleic_acids() {
        assert_extinction!(calculate("RNA1{P.R(A)P.R([5meC])P.R(G)P.[mR](A)}$$$$V2.0"), 46.2);
        assert_extinction!(calculate("RNA1{R(U)}$$$$V2.0"), 10.21);
        assert_extinction!(calculate("RNA1{[dR](T)P.[dR](T)}$$$$V2.0"), 17.22);
        assert_extinction!(calculate_in(ExtinctionUnit::Molar, "RNA1{R(U)}$$$$V2.0"), 10_210.0);
    }

    #[test]
    fn mixed_documents() {
        let text = "RNA1{R(U)}|PEPTIDE1{W}|CHEM1{[MCC]}|BLOB1{Bead}$$$$V2.0";
        assert_extinction!(calculate(text), 15.71);
        assert_extinction!(calculate_in(ExtinctionUnit::Molar, text), 15_710.0);
        assert_extinction!(calculate("CHEM1{[MCC]}|BLOB1{Bead}$$$$V2.0"), 0.0);
        assert_extinction!(calculate("$$$$V2.0"), 0.0);
    }

    #[test]
    fn ambiguous_sequences() {
        let peptide1 = id(PolymerType::Peptide, 1);
        let handled_elsewhere = |position, reason| {
            Err(CalculationError::HandledElsewhere {
                polymer: peptide1,
                position,
                reason,
            })
        };
        assert_eq!(calculate("PEPTIDE1{?}$$$$V2.0"), handled_elsewhere(1, "the wildcard monomer `?`"));
        assert_eq!(calculate("PEPTIDE1{A.C.(_.K)}$$$$V2.0"), handled_elsewhere(3, "a group of monomers"));
        assert_eq!(calculate("PEPTIDE1{(C,W)}$$$$V2.0"), handled_elsewhere(1, "a list of alternative monomers"));
        assert_eq!(calculate("PEPTIDE1{W'1-3'}$$$$V2.0"), handled_elsewhere(1, "repeated a range of times"));
        assert_eq!(
            calculate("RNA1{R(A)P._}$$$$V2.0"),
            Err(CalculationError::HandledElsewhere {
                polymer: id(PolymerType::Rna, 1),
                position: 4,
                reason: "the undefined monomer `_`",
            })
        );
        assert_miette_contains!(
            calculate("RNA1{R(U)}|PEPTIDE1{A.(W+Y)}$$$$V2.0"),
            "only calculated for fully-resolved linear sequences"
        );
    }

    #[test]
    fn unresolvable_sequences() {
        let rna1 = id(PolymerType::Rna, 1);
        assert_eq!(
            calculate("RNA1{R([xX])P}$$$$V2.0"),
            Err(CalculationError::UnknownMonomer {
                polymer: rna1,
                position: 2,
                symbol: "xX".to_owned(),
            })
        );
        assert_eq!(calculate("RNA1{R.P.R}$$$$V2.0"), Err(CalculationError::EmptySequence(rna1)));
        assert_eq!(
            calculate("PEPTIDE1{}$$$$V2.0"),
            Err(CalculationError::EmptySequence(id(PolymerType::Peptide, 1)))
        );
        assert_eq!(
            calculate("PEPTIDE1{W.[Xyz]}$$$$V2.0"),
            Err(CalculationError::UnknownMonomer {
                polymer: id(PolymerType::Peptide, 1),
                position: 2,
                symbol: "Xyz".to_owned(),
            })
        );
        assert_eq!(
            calculate("RNA1{R(A)P}|PEPTIDE1{[Trp].[Xyz]'2'}$$$$V2.0"),
            Err(CalculationError::UnknownMonomer {
                polymer: id(PolymerType::Peptide, 1),
                position: 2,
                symbol: "Xyz".to_owned(),
            })
        );
        assert_eq!(
            calculate("PEPTIDE1{C}|PEPTIDE2{[[*]C[*]]}$$$$V2.0"),
            Err(CalculationError::UnknownMonomer {
                polymer: id(PolymerType::Peptide, 2),
                position: 1,
                symbol: "[*]C[*]".to_owned(),
            })
        );
    }
}
