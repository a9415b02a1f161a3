//! A deterministic rendering of a document that doesn't depend on the order its polymers were written in, what they
//! were numbered, or which way round each connection was written

// Standard Library Imports
use std::num::NonZeroU32;

// External Crate Imports
use ahash::HashMap;
use helm_chem::PolymerType;
use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

// Local Crate Imports
use crate::notation::{
    ConnectionNotation, Endpoint, EntityId, Helm2Notation, MonomerNotation, PolymerId, PolymerNotation,
};

// Public API ==========================================================================================================

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum CanonicalizeError {
    #[error("the list at position {1} of {0} has a repeat count, so its multiplicity is ambiguous")]
    RepeatedList(PolymerId, usize),

    #[error("the group starting at position {1} of {0} has a repeat count, so its multiplicity is ambiguous")]
    RepeatedGroup(PolymerId, usize),

    #[error("documents with polymer groupings have no canonical form")]
    #[diagnostic(help("groupings are named, and there is no order-independent way to number them"))]
    Groupings,

    #[error("{0} is a BLOB, which has no content to order it by")]
    BlobPolymer(PolymerId),

    #[error("the connection {0} refers to a group instead of a polymer")]
    GroupConnection(String),
}

/// Beyond this many candidate numberings, polymers that are still tied keep the order they were written in
const MAX_NUMBERINGS: usize = 5040;

/// Renders `doc` in canonical form. Polymers are sorted by type, the text of their monomers, their annotation, and
/// then what they're connected to. Polymers are then renumbered within each type, and every connection is written from
/// its lower endpoint and sorted. Any polymers that are still indistinguishable are numbered whichever way renders
/// the smallest text
pub fn canonicalize(doc: &Helm2Notation) -> Result<String, CanonicalizeError> {
    check_supported(doc)?;

    let mut ranked: Vec<_> = doc
        .polymers()
        .iter()
        .map(|polymer| (rank(doc, polymer), polymer))
        .collect();
    ranked.sort_by(|(a, _), (b, _)| a.cmp(b));
    let tied: Vec<Vec<_>> = ranked
        .chunk_by(|(a, _), (b, _)| a == b)
        .map(|block| block.iter().map(|&(_, polymer)| polymer).collect())
        .collect();

    let candidates = numberings(&tied);
    debug!(
        polymers = doc.polymers().len(),
        candidates = candidates.len(),
        "canonicalizing document"
    );
    let canonical = candidates
        .into_iter()
        .map(|order| renumber(doc, &order).to_text())
        .min();

    // SAFETY: `numberings()` always returns at least one ordering
    Ok(canonical.unwrap())
}

// Private Helper Functions ============================================================================================

type Rank = (PolymerType, String, Option<String>, Vec<String>);

fn rank(doc: &Helm2Notation, polymer: &PolymerNotation) -> Rank {
    let describe = |polymer: &PolymerNotation| {
        format!("{}{{{}}}{:?}", polymer.kind(), polymer.body_text(), polymer.annotation)
    };

    let mut neighbours: Vec<_> = doc
        .connections()
        .iter()
        .flat_map(|connection| {
            let (source, target) = (&connection.source, &connection.target);
            [(source, target), (target, source)]
                .into_iter()
                .filter(|(own, _)| own.entity.polymer() == Some(polymer.id()))
                .map(|(own, other)| {
                    let other_polymer = other.entity.polymer().and_then(|id| doc.polymer(id)).map(describe);
                    format!("{own}-{other_polymer:?}:{other}{:?}", connection.annotation)
                })
                .collect_vec()
        })
        .collect();
    neighbours.sort_unstable();

    (
        polymer.kind(),
        polymer.body_text(),
        polymer.annotation.clone(),
        neighbours,
    )
}

fn numberings<'a>(tied: &[Vec<&'a PolymerNotation>]) -> Vec<Vec<&'a PolymerNotation>> {
    let count = tied
        .iter()
        .try_fold(1_usize, |count, block| (1..=block.len()).try_fold(count, usize::checked_mul));
    if count.is_none_or(|count| count > MAX_NUMBERINGS) {
        return vec![tied.concat()];
    }

    tied.iter().fold(vec![Vec::new()], |prefixes, block| {
        prefixes
            .iter()
            .flat_map(|prefix| {
                block
                    .iter()
                    .copied()
                    .permutations(block.len())
                    .map(move |order| [prefix.as_slice(), order.as_slice()].concat())
            })
            .collect()
    })
}

fn renumber(doc: &Helm2Notation, order: &[&PolymerNotation]) -> Helm2Notation {
    let mut counts: HashMap<PolymerType, u32> = HashMap::default();
    let mut renamed = HashMap::default();
    let polymers = order
        .iter()
        .map(|polymer| {
            let count = counts.entry(polymer.kind()).or_default();
            *count += 1;
            // SAFETY: `count` was just incremented from at least zero
            let id = PolymerId::new(polymer.kind(), NonZeroU32::new(*count).unwrap());
            renamed.insert(polymer.id(), id);

            let mut canonical = PolymerNotation::new(id, polymer.elements().to_vec());
            canonical.annotation.clone_from(&polymer.annotation);
            canonical
        })
        .collect();

    let mut connections: Vec<_> = doc
        .connections()
        .iter()
        .map(|connection| {
            let mut connection = connection.clone();
            for endpoint in connection.endpoints_mut() {
                if let Some(&id) = endpoint.entity.polymer().and_then(|id| renamed.get(&id)) {
                    endpoint.entity = EntityId::Polymer(id);
                }
            }
            if connection.target < connection.source {
                std::mem::swap(&mut connection.source, &mut connection.target);
            }
            connection
        })
        .collect();
    connections.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    Helm2Notation {
        polymers,
        connections,
        groups: Vec::new(),
        properties: doc.properties().clone(),
        version: doc.version().to_owned(),
    }
}

fn sort_key(connection: &ConnectionNotation) -> (&Endpoint, &Endpoint) {
    (&connection.source, &connection.target)
}

fn check_supported(doc: &Helm2Notation) -> Result<(), CanonicalizeError> {
    if let Some(connection) = doc
        .connections()
        .iter()
        .find(|c| c.endpoints().any(|e| e.entity.is_group()))
    {
        return Err(CanonicalizeError::GroupConnection(connection.to_string()));
    }

    if !doc.groups().is_empty() {
        return Err(CanonicalizeError::Groupings);
    }

    for polymer in doc.polymers() {
        if polymer.kind() == PolymerType::Blob {
            return Err(CanonicalizeError::BlobPolymer(polymer.id()));
        }
        check_repeats(polymer.id(), polymer.elements())?;
    }

    Ok(())
}

fn check_repeats(id: PolymerId, elements: &[MonomerNotation]) -> Result<(), CanonicalizeError> {
    for element in elements {
        let position = element.position().unwrap_or_default();
        match element {
            MonomerNotation::Unit(_) => (),
            MonomerNotation::List(_) | MonomerNotation::Mixture(_) if element.repeat().is_some() => {
                return Err(CanonicalizeError::RepeatedList(id, position));
            }
            MonomerNotation::List(_) | MonomerNotation::Mixture(_) => (),
            MonomerNotation::Group(_) if element.repeat().is_some() => {
                return Err(CanonicalizeError::RepeatedGroup(id, position));
            }
            MonomerNotation::Group(group) => check_repeats(id, &group.elements)?,
        }
    }
    Ok(())
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse, testing_tools::assert_miette_contains};

    fn canonical(text: &str) -> Result<String, CanonicalizeError> {
        canonicalize(&parse(text).unwrap())
    }

    fn peptide(index: u32) -> PolymerId {
        PolymerId::new(PolymerType::Peptide, NonZeroU32::new(index).unwrap())
    }

    #[test]
    fn polymers_are_sorted_and_renumbered() {
        assert_eq!(
            canonical("RNA3{R(U)P}|PEPTIDE7{C}|CHEM2{[MCC]}|PEPTIDE2{A.G}$$$$V2.0").unwrap(),
            "CHEM1{[MCC]}|PEPTIDE1{A.G}|PEPTIDE2{C}|RNA1{R(U)P}$$$$V2.0"
        );
    }

    #[test]
    fn polymer_order_is_irrelevant() {
        let expected = "PEPTIDE1{A.G}|PEPTIDE2{C}$PEPTIDE1,PEPTIDE2,1:R1-1:R3$$$V2.0";
        assert_eq!(
            canonical("PEPTIDE1{C}|PEPTIDE2{A.G}$PEPTIDE1,PEPTIDE2,1:R3-1:R1$$$V2.0").unwrap(),
            expected
        );
        assert_eq!(
            canonical("PEPTIDE1{A.G}|PEPTIDE2{C}$PEPTIDE2,PEPTIDE1,1:R3-1:R1$$$V2.0").unwrap(),
            expected
        );
    }

    #[test]
    fn identical_polymers_are_told_apart_by_their_connections() {
        let expected = "PEPTIDE1{A.C}|PEPTIDE2{A.C}$PEPTIDE1,PEPTIDE2,1:R3-2:R3$$$V2.0";
        for text in [
            "PEPTIDE1{A.C}|PEPTIDE2{A.C}$PEPTIDE1,PEPTIDE2,1:R3-2:R3$$$V2.0",
            "PEPTIDE2{A.C}|PEPTIDE1{A.C}$PEPTIDE1,PEPTIDE2,1:R3-2:R3$$$V2.0",
            "PEPTIDE1{A.C}|PEPTIDE2{A.C}$PEPTIDE2,PEPTIDE1,1:R3-2:R3$$$V2.0",
            "PEPTIDE2{A.C}|PEPTIDE1{A.C}$PEPTIDE1,PEPTIDE2,2:R3-1:R3$$$V2.0",
        ] {
            assert_eq!(canonical(text).unwrap(), expected);
        }
    }

    #[test]
    fn identical_polymers_are_told_apart_by_their_annotations() {
        let expected = r#"PEPTIDE1{C}"x"|PEPTIDE2{C}"y"$$$$V2.0"#;
        assert_eq!(canonical(r#"PEPTIDE1{C}"x"|PEPTIDE2{C}"y"$$$$V2.0"#).unwrap(), expected);
        assert_eq!(canonical(r#"PEPTIDE1{C}"y"|PEPTIDE2{C}"x"$$$$V2.0"#).unwrap(), expected);
    }

    #[test]
    fn interchangeable_polymers() {
        let expected = "PEPTIDE1{C}|PEPTIDE2{C}|PEPTIDE3{C}$PEPTIDE2,PEPTIDE3,1:R3-1:R3$$$V2.0";
        for text in [
            "PEPTIDE1{C}|PEPTIDE2{C}|PEPTIDE3{C}$PEPTIDE1,PEPTIDE2,1:R3-1:R3$$$V2.0",
            "PEPTIDE1{C}|PEPTIDE2{C}|PEPTIDE3{C}$PEPTIDE3,PEPTIDE1,1:R3-1:R3$$$V2.0",
            "PEPTIDE3{C}|PEPTIDE2{C}|PEPTIDE1{C}$PEPTIDE2,PEPTIDE3,1:R3-1:R3$$$V2.0",
        ] {
            assert_eq!(canonical(text).unwrap(), expected);
        }
    }

    #[test]
    fn connection_direction_is_irrelevant() {
        let forward = "RNA1{R(A)P}|RNA2{R(U)P}$RNA1,RNA2,2:pair-2:pair|RNA1,RNA1,3:R2-1:R1$$$V2.0";
        let backward = "RNA2{R(A)P}|RNA1{R(U)P}$RNA2,RNA2,1:R1-3:R2|RNA1,RNA2,2:pair-2:pair$$$V2.0";
        assert_eq!(canonical(forward).unwrap(), canonical(backward).unwrap());
        assert_eq!(
            canonical(forward).unwrap(),
            "RNA1{R(A)P}|RNA2{R(U)P}$RNA1,RNA1,1:R1-3:R2|RNA1,RNA2,2:pair-2:pair$$$V2.0"
        );
    }

    #[test]
    fn canonical_form_is_idempotent() {
        let documents = [
            "$$$$V2.0",
            r#"PEPTIDE2{C.K}"heavy"|PEPTIDE1{C}|CHEM1{[MCC]}$PEPTIDE2,PEPTIDE1,1:R3-1:R3|CHEM1,PEPTIDE2,1:R1-2:R3$${"a":1}$V2.0"#,
            "PEPTIDE1{(A,G).(A.G).?}|RNA1{R(A)P.R(C)}$$$$V2.1",
        ];
        for text in documents {
            let once = canonical(text).unwrap();
            assert_eq!(canonical(&once).unwrap(), once);
        }
    }

    #[test]
    fn unsupported_documents() {
        assert_eq!(
            canonical("PEPTIDE1{A.(A,G)'2'}$$$$V2.0"),
            Err(CanonicalizeError::RepeatedList(peptide(1), 2))
        );
        assert_eq!(
            canonical("PEPTIDE1{A.(A.C)'2'}$$$$V2.0"),
            Err(CanonicalizeError::RepeatedGroup(peptide(1), 2))
        );
        assert_eq!(
            canonical("PEPTIDE1{A}|PEPTIDE2{C}$$G1(PEPTIDE1,PEPTIDE2)$$V2.0"),
            Err(CanonicalizeError::Groupings)
        );
        assert_eq!(
            canonical("PEPTIDE1{A}|BLOB1{Bead}$$$$V2.0"),
            Err(CanonicalizeError::BlobPolymer(PolymerId::new(
                PolymerType::Blob,
                NonZeroU32::MIN
            )))
        );
        assert_eq!(
            canonical("PEPTIDE1{A}|PEPTIDE2{C}$G1,PEPTIDE1,1:R3-1:R3$G1(PEPTIDE1,PEPTIDE2)$$V2.0"),
            Err(CanonicalizeError::GroupConnection("G1,PEPTIDE1,1:R3-1:R3".to_owned()))
        );
        assert_miette_contains!(
            canonical("PEPTIDE1{A}|PEPTIDE2{C}$$G1(PEPTIDE1,PEPTIDE2)$$V2.0"),
            "there is no order-independent way to number them"
        );
    }
}
