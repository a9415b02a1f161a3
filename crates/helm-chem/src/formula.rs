// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, AddAssign, Sub, SubAssign},
};

// External Crate Imports
use itertools::Itertools;
use nom::{Finish, combinator::all_consuming};

// Local Crate Imports
use crate::{Formula, errors::FormulaError, mass::lookup_element, parsers::formula::formula};

// Public API ==========================================================================================================

impl Formula {
    pub fn new(text: impl AsRef<str>) -> Result<Self, FormulaError> {
        let text = text.as_ref();
        let (_, atoms) = all_consuming(formula)(text)
            .finish()
            .map_err(|e| FormulaError::malformed(text, text.len() - e.input.len()))?;

        let mut formula = Self::default();
        for (symbol, count) in atoms {
            let offset = symbol.as_ptr() as usize - text.as_ptr() as usize;
            let element = lookup_element(symbol)
                .ok_or_else(|| FormulaError::unknown_element(text, symbol, offset))?;
            *formula.atoms.entry(element.symbol).or_default() += i64::from(count);
        }

        Ok(formula)
    }

    #[must_use]
    pub fn count(&self, symbol: &str) -> i64 {
        self.atoms.get(symbol).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.values().all(|&c| c == 0)
    }

    fn prune(&mut self) {
        self.atoms.retain(|_, count| *count != 0);
    }
}

// Arithmetic Trait Implementations ====================================================================================

impl AddAssign<&Formula> for Formula {
    fn add_assign(&mut self, rhs: &Formula) {
        for (&symbol, &count) in &rhs.atoms {
            *self.atoms.entry(symbol).or_default() += count;
        }
        self.prune();
    }
}

impl SubAssign<&Formula> for Formula {
    fn sub_assign(&mut self, rhs: &Formula) {
        for (&symbol, &count) in &rhs.atoms {
            *self.atoms.entry(symbol).or_default() -= count;
        }
        self.prune();
    }
}

impl Add<&Formula> for Formula {
    type Output = Self;

    fn add(mut self, rhs: &Formula) -> Self::Output {
        self += rhs;
        self
    }
}

impl Sub<&Formula> for Formula {
    type Output = Self;

    fn sub(mut self, rhs: &Formula) -> Self::Output {
        self -= rhs;
        self
    }
}

impl<'f> std::iter::Sum<&'f Formula> for Formula {
    fn sum<I: Iterator<Item = &'f Formula>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, f| acc + f)
    }
}

// Display Trait Implementation ========================================================================================

// NOTE: Formulae are written in Hill order: carbon first, hydrogen second, and everything else alphabetically. When
// there is no carbon, every element (hydrogen included) is alphabetical
impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let has_carbon = self.count("C") != 0;
        let hill_rank = |symbol: &str| match symbol {
            "C" if has_carbon => 0,
            "H" if has_carbon => 1,
            _ => 2,
        };

        let atoms = self
            .atoms
            .iter()
            .filter(|&(_, &count)| count != 0)
            .sorted_by_key(|&(&symbol, _)| (hill_rank(symbol), symbol));

        for (symbol, &count) in atoms {
            if count == 1 {
                write!(f, "{symbol}")?;
            } else {
                write!(f, "{symbol}{count}")?;
            }
        }

        Ok(())
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use crate::testing_tools::assert_miette_contains;

    use super::*;

    #[test]
    fn formula_display_is_hill_ordered() {
        let formulae = [
            ("C3H7NO2", "C3H7NO2"),
            ("NO2C3H7", "C3H7NO2"),
            ("OH", "HO"),
            ("H2O", "H2O"),
            ("H3PO4", "H3O4P"),
            ("CH3CH2OH", "C2H6O"),
            ("NaCl", "ClNa"),
        ];
        for (input, output) in formulae {
            assert_eq!(Formula::new(input).unwrap().to_string(), output);
        }
    }

    #[test]
    fn formula_arithmetic() {
        let alanine = Formula::new("C3H7NO2").unwrap();
        let water = Formula::new("H2O").unwrap();
        let residue = alanine.clone() - &water;
        assert_eq!(residue.to_string(), "C3H5NO");
        assert_eq!(residue.clone() + &water, alanine);
        assert_eq!(residue.count("H"), 5);
        assert_eq!(residue.count("S"), 0);

        let nothing = water.clone() - &water;
        assert!(nothing.is_empty());
        assert_eq!(nothing, Formula::default());
        assert_eq!(nothing.to_string(), "");

        let summed: Formula = [&alanine, &water, &water].into_iter().sum();
        assert_eq!(summed.to_string(), "C3H11NO4");
    }

    #[test]
    fn fragments_can_owe_atoms() {
        let hydrogen = Formula::new("H").unwrap();
        let owed = Formula::default() - &hydrogen;
        assert_eq!(owed.count("H"), -1);
        assert_eq!(owed.to_string(), "H-1");
        assert!((owed + &hydrogen).is_empty());
    }

    #[test]
    fn formula_errors() {
        assert_miette_contains!(Formula::new("C3H0"), "could not interpret \"C3H0\"");
        assert_miette_contains!(Formula::new("+H2O"), "could not interpret");
        assert_miette_contains!(Formula::new(""), "could not interpret");
        assert_miette_contains!(Formula::new("C3Xx2"), "the element \"Xx\" is not known");
        assert_miette_contains!(Formula::new("C3Xx2"), "unknown element");
    }
}
