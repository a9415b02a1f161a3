use std::num::NonZeroU32;

use nom::{
    IResult,
    character::complete::{char, satisfy, u32},
    combinator::{map_opt, not, opt, recognize},
    sequence::{pair, preceded},
};

pub(crate) type ParseResult<'a, O> = IResult<&'a str, O>;

/// uppercase = "A" | "B" | ... | "Z" ;
pub(crate) fn uppercase(i: &str) -> ParseResult<char> {
    satisfy(|c| c.is_ascii_uppercase())(i)
}

/// lowercase = "a" | "b" | ... | "z" ;
pub(crate) fn lowercase(i: &str) -> ParseResult<char> {
    satisfy(|c| c.is_ascii_lowercase())(i)
}

/// Count = digit - "0" , { digit } ;
pub(crate) fn count(i: &str) -> ParseResult<NonZeroU32> {
    map_opt(preceded(not(char('0')), u32), NonZeroU32::new)(i)
}

/// Element Symbol = uppercase , [ lowercase ] ;
pub(crate) fn element_symbol(i: &str) -> ParseResult<&str> {
    recognize(pair(uppercase, opt(lowercase)))(i)
}

/// R-Group = "R" , Count ;
pub(crate) fn r_group(i: &str) -> ParseResult<NonZeroU32> {
    preceded(char('R'), count)(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_count() {
        // Valid Counts
        assert_eq!(count("1"), Ok(("", nz(1))));
        assert_eq!(count("10"), Ok(("", nz(10))));
        assert_eq!(count("422"), Ok(("", nz(422))));
        // Invalid Counts
        assert!(count("0").is_err());
        assert!(count("01").is_err());
        assert!(count("H").is_err());
        assert!(count("-3").is_err());
        // Trailing Input
        assert_eq!(count("2OH"), Ok(("OH", nz(2))));
    }

    #[test]
    fn test_element_symbol() {
        // Valid Element Symbols
        assert_eq!(element_symbol("H"), Ok(("", "H")));
        assert_eq!(element_symbol("Cl"), Ok(("", "Cl")));
        // Invalid Element Symbols
        assert!(element_symbol("h").is_err());
        assert!(element_symbol("1H").is_err());
        // Multiple Element Symbols
        assert_eq!(element_symbol("OH"), Ok(("H", "O")));
        assert_eq!(element_symbol("NaCl"), Ok(("Cl", "Na")));
    }

    #[test]
    fn test_r_group() {
        // Valid R-Groups
        assert_eq!(r_group("R1"), Ok(("", nz(1))));
        assert_eq!(r_group("R12"), Ok(("", nz(12))));
        // Invalid R-Groups
        assert!(r_group("R").is_err());
        assert!(r_group("R0").is_err());
        assert!(r_group("r1").is_err());
        assert!(r_group("1").is_err());
    }
}
