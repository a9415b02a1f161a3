//! Small `nom` parsers for the tokens the state machine collects: identifiers, positions, attachment points, repeat
//! counts, ratios, and the version marker

// Standard Library Imports
use std::{num::NonZeroU32, str::FromStr};

// External Crate Imports
use helm_chem::{PolymerType, RGroup};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, char, digit1, u32},
    combinator::{all_consuming, map, map_opt, map_res, not, opt, recognize, value},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, separated_pair, tuple},
};
use rust_decimal::Decimal;

// Local Crate Imports
use crate::notation::{AttachmentPoint, EntityId, GroupId, PolymerId, SitePosition};

pub(crate) type ParseResult<'a, O> = IResult<&'a str, O>;

/// Count = digit - "0" , { digit } ;
pub(crate) fn count(i: &str) -> ParseResult<NonZeroU32> {
    map_opt(preceded(not(char('0')), u32), NonZeroU32::new)(i)
}

/// Polymer Type = "BLOB" | "CHEM" | "PEPTIDE" | "RNA" ;
fn polymer_type(i: &str) -> ParseResult<PolymerType> {
    map_res(alpha1, PolymerType::from_str)(i)
}

/// Polymer ID = Polymer Type , Count ;
pub(crate) fn polymer_id(i: &str) -> ParseResult<PolymerId> {
    map(pair(polymer_type, count), |(kind, index)| PolymerId::new(kind, index))(i)
}

/// Group ID = "G" , Count ;
pub(crate) fn group_id(i: &str) -> ParseResult<GroupId> {
    map(preceded(char('G'), count), GroupId)(i)
}

/// Entity ID = Group ID | Polymer ID ;
pub(crate) fn entity_id(i: &str) -> ParseResult<EntityId> {
    alt((map(group_id, EntityId::Group), map(polymer_id, EntityId::Polymer)))(i)
}

/// Position = digit - "0" , { digit } ;
fn position(i: &str) -> ParseResult<usize> {
    map_res(recognize(count), usize::from_str)(i)
}

/// Site Position = Position | "(" , Position , { "," , Position } , ")" | "?" ;
pub(crate) fn site_position(i: &str) -> ParseResult<SitePosition> {
    let alternatives = delimited(char('('), separated_list1(char(','), position), char(')'));
    alt((
        map(position, SitePosition::Index),
        map(alternatives, SitePosition::Alternatives),
        value(SitePosition::Unknown, char('?')),
    ))(i)
}

/// Attachment Point = "R" , Count | "?" | "pair" ;
pub(crate) fn attachment_point(i: &str) -> ParseResult<AttachmentPoint> {
    alt((
        map(preceded(char('R'), count), |n| {
            AttachmentPoint::RGroup(RGroup::new(n))
        }),
        value(AttachmentPoint::Wildcard, char('?')),
        value(AttachmentPoint::Pair, tag("pair")),
    ))(i)
}

/// Repeat Count = Count , [ "-" , Count ] ;
///
/// Ranges are returned as written: checking that `low <= high` is left to the caller, so that it can report the
/// problem more precisely than "invalid token"
pub(crate) fn repeat_count(i: &str) -> ParseResult<(NonZeroU32, Option<NonZeroU32>)> {
    pair(count, opt(preceded(char('-'), count)))(i)
}

/// Ratio = digit , { digit } , [ "." , digit , { digit } ] ;
pub(crate) fn ratio(i: &str) -> ParseResult<Decimal> {
    let number = recognize(pair(digit1, opt(pair(char('.'), digit1))));
    map_res(number, Decimal::from_str)(i)
}

/// Version = "V" , digit , { digit } , "." , digit , { digit } ;
pub(crate) fn version(i: &str) -> ParseResult<&str> {
    recognize(tuple((char('V'), separated_pair(digit1, char('.'), digit1))))(i)
}

/// Runs `parser` over an entire token, returning `None` if it fails or leaves anything behind
pub(crate) fn whole<'a, O>(
    parser: impl Parser<&'a str, O, nom::error::Error<&'a str>>,
    token: &'a str,
) -> Option<O> {
    all_consuming(parser)(token)
        .ok()
        .map(|(_, output)| output)
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn nz(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_polymer_id() {
        let peptide1 = PolymerId::new(PolymerType::Peptide, nz(1));
        assert_eq!(polymer_id("PEPTIDE1"), Ok(("", peptide1)));
        assert_eq!(
            polymer_id("RNA12,"),
            Ok((",", PolymerId::new(PolymerType::Rna, nz(12))))
        );
        assert!(polymer_id("PEPTIDE0").is_err());
        assert!(polymer_id("PEPTIDE").is_err());
        assert!(polymer_id("DNA1").is_err());
        assert!(polymer_id("peptide1").is_err());
    }

    #[test]
    fn test_entity_id() {
        assert_eq!(entity_id("G3"), Ok(("", EntityId::Group(GroupId(nz(3))))));
        assert_eq!(
            entity_id("CHEM2"),
            Ok(("", EntityId::Polymer(PolymerId::new(PolymerType::Chem, nz(2)))))
        );
        assert!(entity_id("G").is_err());
    }

    #[test]
    fn test_site_position() {
        assert_eq!(site_position("12"), Ok(("", SitePosition::Index(12))));
        assert_eq!(
            site_position("(1,3,5)"),
            Ok(("", SitePosition::Alternatives(vec![1, 3, 5])))
        );
        assert_eq!(site_position("?"), Ok(("", SitePosition::Unknown)));
        assert!(site_position("0").is_err());
        assert!(site_position("()").is_err());
    }

    #[test]
    fn test_attachment_point() {
        assert_eq!(
            attachment_point("R3"),
            Ok(("", AttachmentPoint::RGroup(RGroup::R3)))
        );
        assert_eq!(attachment_point("?"), Ok(("", AttachmentPoint::Wildcard)));
        assert_eq!(attachment_point("pair"), Ok(("", AttachmentPoint::Pair)));
        assert!(attachment_point("R0").is_err());
        assert!(attachment_point("r1").is_err());
    }

    #[test]
    fn test_repeat_count() {
        assert_eq!(repeat_count("3"), Ok(("", (nz(3), None))));
        assert_eq!(repeat_count("3-5"), Ok(("", (nz(3), Some(nz(5))))));
        assert_eq!(repeat_count("5-3"), Ok(("", (nz(5), Some(nz(3))))));
        assert!(repeat_count("0").is_err());
        assert!(repeat_count("-3").is_err());
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("2"), Ok(("", dec!(2))));
        assert_eq!(ratio("1.50"), Ok(("", dec!(1.50))));
        assert_eq!(ratio("1."), Ok((".", dec!(1))));
        assert!(ratio(".5").is_err());
    }

    #[test]
    fn test_version() {
        assert_eq!(version("V2.0"), Ok(("", "V2.0")));
        assert_eq!(version("V10.12"), Ok(("", "V10.12")));
        assert!(version("2.0").is_err());
        assert!(version("V2").is_err());
    }

    #[test]
    fn test_whole() {
        assert_eq!(whole(count, "12"), Some(nz(12)));
        assert_eq!(whole(count, "12a"), None);
        assert_eq!(whole(version, "V2.0"), Some("V2.0"));
    }
}
