// External Crate Imports
use ahash::HashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use static_assertions::assert_impl_all;

// Constants ===========================================================================================================

// NOTE: In mM⁻¹cm⁻¹
const MONO_NUCLEOTIDES: [(&str, Decimal); 5] = [
    ("A", dec!(15.34)),
    ("C", dec!(7.60)),
    ("G", dec!(12.16)),
    ("U", dec!(10.21)),
    ("T", dec!(8.70)),
];

// NOTE: In mM⁻¹cm⁻¹, keyed by the 5' base and then the 3' base
const DI_NUCLEOTIDES: [(&str, &str, Decimal); 23] = [
    ("A", "A", dec!(13.65)),
    ("A", "C", dec!(10.67)),
    ("A", "G", dec!(12.79)),
    ("A", "U", dec!(12.14)),
    ("A", "T", dec!(11.42)),
    ("C", "A", dec!(10.67)),
    ("C", "C", dec!(7.52)),
    ("C", "G", dec!(9.39)),
    ("C", "U", dec!(8.37)),
    ("C", "T", dec!(7.66)),
    ("G", "A", dec!(12.92)),
    ("G", "C", dec!(9.19)),
    ("G", "G", dec!(11.43)),
    ("G", "U", dec!(10.96)),
    ("G", "T", dec!(10.22)),
    ("U", "A", dec!(12.52)),
    ("U", "C", dec!(8.90)),
    ("U", "G", dec!(10.40)),
    ("U", "U", dec!(10.11)),
    ("T", "A", dec!(11.78)),
    ("T", "C", dec!(8.15)),
    ("T", "G", dec!(9.70)),
    ("T", "T", dec!(8.61)),
];

// NOTE: In M⁻¹cm⁻¹, under both one-letter and three-letter names
const AMINO_ACIDS: [(&str, Decimal); 6] = [
    ("C", dec!(62.5)),
    ("Cys", dec!(62.5)),
    ("Y", dec!(1490)),
    ("Tyr", dec!(1490)),
    ("W", dec!(5500)),
    ("Trp", dec!(5500)),
];

// Public API ==========================================================================================================

/// Read-only lookup tables of extinction coefficients. Build one with [`Default`] at startup and share it between
/// calculations
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExtinctionCoefficients {
    mono_nucleotides: HashMap<String, Decimal>,
    di_nucleotides: HashMap<(String, String), Decimal>,
    amino_acids: HashMap<String, Decimal>,
}

assert_impl_all!(ExtinctionCoefficients: Send, Sync);

impl Default for ExtinctionCoefficients {
    fn default() -> Self {
        Self {
            mono_nucleotides: MONO_NUCLEOTIDES
                .into_iter()
                .map(|(base, e)| (base.to_owned(), e))
                .collect(),
            di_nucleotides: DI_NUCLEOTIDES
                .into_iter()
                .map(|(first, second, e)| ((first.to_owned(), second.to_owned()), e))
                .collect(),
            amino_acids: AMINO_ACIDS
                .into_iter()
                .map(|(residue, e)| (residue.to_owned(), e))
                .collect(),
        }
    }
}

impl ExtinctionCoefficients {
    #[must_use]
    pub fn mono_nucleotide(&self, base: &str) -> Option<Decimal> {
        self.mono_nucleotides.get(base).copied()
    }

    #[must_use]
    pub fn di_nucleotide(&self, first: &str, second: &str) -> Option<Decimal> {
        self.di_nucleotides
            .get(&(first.to_owned(), second.to_owned()))
            .copied()
    }

    #[must_use]
    pub fn amino_acid(&self, residue: &str) -> Option<Decimal> {
        self.amino_acids.get(residue).copied()
    }

    /// Adds or replaces the coefficient of a single base, in mM⁻¹cm⁻¹
    #[must_use]
    pub fn with_mono_nucleotide(mut self, base: impl Into<String>, coefficient: Decimal) -> Self {
        self.mono_nucleotides.insert(base.into(), coefficient);
        self
    }

    /// Adds or replaces the coefficient of a 5'-`first`-`second`-3' base pair, in mM⁻¹cm⁻¹
    #[must_use]
    pub fn with_di_nucleotide(
        mut self,
        first: impl Into<String>,
        second: impl Into<String>,
        coefficient: Decimal,
    ) -> Self {
        self.di_nucleotides
            .insert((first.into(), second.into()), coefficient);
        self
    }

    /// Adds or replaces the coefficient of an amino acid, in M⁻¹cm⁻¹
    #[must_use]
    pub fn with_amino_acid(mut self, residue: impl Into<String>, coefficient: Decimal) -> Self {
        self.amino_acids.insert(residue.into(), coefficient);
        self
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables() {
        let coefficients = ExtinctionCoefficients::default();
        assert_eq!(coefficients.mono_nucleotide("A"), Some(dec!(15.34)));
        assert_eq!(coefficients.mono_nucleotide("5meC"), None);
        assert_eq!(coefficients.di_nucleotide("G", "A"), Some(dec!(12.92)));
        assert_eq!(coefficients.di_nucleotide("A", "G"), Some(dec!(12.79)));
        assert_eq!(coefficients.di_nucleotide("U", "T"), None);
        assert_eq!(coefficients.amino_acid("Trp"), coefficients.amino_acid("W"));
        assert_eq!(coefficients.amino_acid("A"), None);
    }

    #[test]
    fn custom_tables() {
        let coefficients = ExtinctionCoefficients::default()
            .with_mono_nucleotide("I", dec!(7.1))
            .with_di_nucleotide("I", "A", dec!(11.0))
            .with_amino_acid("C", dec!(125));
        assert_eq!(coefficients.mono_nucleotide("I"), Some(dec!(7.1)));
        assert_eq!(coefficients.di_nucleotide("I", "A"), Some(dec!(11.0)));
        assert_eq!(coefficients.amino_acid("C"), Some(dec!(125)));
        assert_eq!(coefficients.amino_acid("Cys"), Some(dec!(62.5)));
    }
}
