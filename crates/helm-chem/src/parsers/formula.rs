use std::num::NonZeroU32;

use nom::{
    Parser,
    combinator::opt,
    multi::many1,
    sequence::pair,
};

use super::primitives::{ParseResult, count, element_symbol};

/// Formula = { Atomic Count }- ;
pub(crate) fn formula(i: &str) -> ParseResult<Vec<(&str, u32)>> {
    many1(atomic_count)(i)
}

/// Atomic Count = Element Symbol , [ Count ] ;
fn atomic_count(i: &str) -> ParseResult<(&str, u32)> {
    let optional_count = opt(count).map(|c| c.map_or(1, NonZeroU32::get));
    pair(element_symbol, optional_count)(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_count() {
        assert_eq!(atomic_count("C"), Ok(("", ("C", 1))));
        assert_eq!(atomic_count("C12"), Ok(("", ("C", 12))));
        assert_eq!(atomic_count("Cl2O"), Ok(("O", ("Cl", 2))));
        assert!(atomic_count("2C").is_err());
    }

    #[test]
    fn test_formula() {
        assert_eq!(
            formula("C3H7NO2"),
            Ok(("", vec![("C", 3), ("H", 7), ("N", 1), ("O", 2)]))
        );
        assert_eq!(formula("OH"), Ok(("", vec![("O", 1), ("H", 1)])));
        // Stops at the first thing it can't read
        assert_eq!(formula("H2O+"), Ok(("+", vec![("H", 2), ("O", 1)])));
        assert!(formula("").is_err());
        assert!(formula("3H").is_err());
    }
}
