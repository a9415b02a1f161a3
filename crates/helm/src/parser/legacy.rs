//! Rewrites HELM1 documents (`polymers$connections$hydrogen bonds$annotations$`) as HELM2 text, so they can be handed
//! to the regular parser

// Standard Library Imports
use std::borrow::Cow;

// External Crate Imports
use itertools::Itertools;
use tracing::{debug, warn};

// Local Crate Imports
use super::primitives::{version, whole};
use crate::notation::DEFAULT_VERSION;

const HELM1_SECTIONS: usize = 4;

/// Text that already ends in a version marker, or that has too many sections to be HELM1, is returned untouched.
/// Hydrogen bonds are merged into the connection section, and polymer annotations are moved onto their polymers
#[must_use]
pub fn upgrade(text: &str) -> Cow<'_, str> {
    let mut sections = split_outside_brackets(text, '$');
    if sections.last().is_some_and(|&last| whole(version, last).is_some()) {
        return Cow::Borrowed(text);
    }

    // NOTE: HELM1 documents end with a `$`, which leaves one empty section behind
    if sections.len() > 1 && sections.last().is_some_and(|last| last.is_empty()) {
        sections.pop();
    }
    if text.is_empty() || sections.len() > HELM1_SECTIONS {
        return Cow::Borrowed(text);
    }
    sections.resize(HELM1_SECTIONS, "");

    let [polymers, connections, hydrogen_bonds, annotations] = sections[..] else {
        return Cow::Borrowed(text);
    };

    let mut polymers: Vec<String> = entries(polymers).map(str::to_owned).collect();
    for annotation in entries(annotations) {
        attach_annotation(&mut polymers, annotation);
    }
    let connections = entries(connections).chain(entries(hydrogen_bonds)).join("|");

    debug!("upgraded HELM1 document to {DEFAULT_VERSION}");
    Cow::Owned(format!("{}${connections}$$${DEFAULT_VERSION}", polymers.join("|")))
}

fn entries(section: &str) -> impl Iterator<Item = &str> {
    split_outside_brackets(section, '|')
        .into_iter()
        .filter(|entry| !entry.is_empty())
}

/// Splits on every `separator` that isn't part of a bracketed monomer, a polymer body, or an annotation. Inline
/// structures (like the extended SMILES `[*]CC[*] |$_R1;;_R2$|`) can contain both `$` and `|`
fn split_outside_brackets(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let (mut brackets, mut braces, mut quoted) = (0_usize, 0_usize, false);
    let mut start = 0;
    for (offset, c) in text.char_indices() {
        match c {
            '[' if !quoted => brackets += 1,
            ']' if !quoted => brackets = brackets.saturating_sub(1),
            _ if brackets > 0 => (),
            '"' => quoted = !quoted,
            _ if quoted => (),
            '{' => braces += 1,
            '}' => braces = braces.saturating_sub(1),
            _ if c == separator && braces == 0 => {
                pieces.push(&text[start..offset]);
                start = offset + c.len_utf8();
            }
            _ => (),
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// HELM1 annotations look like `RNA1{StrandType:ss}`
fn attach_annotation(polymers: &mut [String], annotation: &str) {
    let Some((id, text)) = annotation
        .strip_suffix('}')
        .and_then(|a| a.split_once('{'))
    else {
        warn!(annotation, "skipping malformed HELM1 annotation");
        return;
    };

    let prefix = format!("{id}{{");
    match polymers.iter_mut().find(|p| p.starts_with(&prefix)) {
        Some(polymer) if polymer.ends_with('}') => {
            polymer.push('"');
            polymer.push_str(text);
            polymer.push('"');
        }
        _ => warn!(id, "skipping HELM1 annotation for a polymer that isn't in the document"),
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn helm2_is_untouched() {
        let text = "PEPTIDE1{A.C}$$$$V2.0";
        assert!(matches!(upgrade(text), Cow::Borrowed(t) if t == text));
    }

    #[test]
    fn upgrade_simple_documents() {
        assert_eq!(upgrade("PEPTIDE1{A.C}$$$$"), "PEPTIDE1{A.C}$$$$V2.0");
        assert_eq!(upgrade("PEPTIDE1{A.C}"), "PEPTIDE1{A.C}$$$$V2.0");
        assert_eq!(
            upgrade("PEPTIDE1{C.A.C}$PEPTIDE1,PEPTIDE1,1:R3-3:R3$$$"),
            "PEPTIDE1{C.A.C}$PEPTIDE1,PEPTIDE1,1:R3-3:R3$$$V2.0"
        );
    }

    #[test]
    fn upgrade_hydrogen_bonds_and_annotations() {
        let text = "RNA1{R(A)P.R(C)}|RNA2{R(G)P.R(U)}$$RNA1,RNA2,2:pair-5:pair$RNA1{StrandType:ss}|RNA2{StrandType:as}$";
        let upgraded = upgrade(text);
        assert_eq!(
            upgraded,
            r#"RNA1{R(A)P.R(C)}"StrandType:ss"|RNA2{R(G)P.R(U)}"StrandType:as"$RNA1,RNA2,2:pair-5:pair$$$V2.0"#
        );

        let doc = parse(upgraded).unwrap();
        assert_eq!(doc.polymers()[1].annotation.as_deref(), Some("StrandType:as"));
        assert!(doc.connections()[0].source.attachment.is_pair());
    }

    #[test]
    fn separators_inside_inline_structures() {
        let text = "CHEM1{[[*]OCCO[*] |$_R1;;;;;_R2$|]}|PEPTIDE1{A}$CHEM1,PEPTIDE1,1:R2-1:R1$$$";
        let upgraded = upgrade(text);
        assert_eq!(
            upgraded,
            "CHEM1{[[*]OCCO[*] |$_R1;;;;;_R2$|]}|PEPTIDE1{A}$CHEM1,PEPTIDE1,1:R2-1:R1$$$V2.0"
        );

        let doc = parse(upgraded).unwrap();
        assert_eq!(doc.polymers().len(), 2);
        assert_eq!(doc.connections().len(), 1);
    }

    #[test]
    fn upgrading_twice_changes_nothing() {
        let documents = [
            "PEPTIDE1{A.C}$$$$",
            "PEPTIDE1{A.C}",
            "PEPTIDE1{C.A.C}$PEPTIDE1,PEPTIDE1,1:R3-3:R3$$$",
            "RNA1{R(A)P.R(C)}|RNA2{R(G)P.R(U)}$$RNA1,RNA2,2:pair-5:pair$RNA1{StrandType:ss}|RNA2{StrandType:as}$",
            "CHEM1{[[*]OCCO[*] |$_R1;;;;;_R2$|]}$$$$",
        ];
        for text in documents {
            let once = upgrade(text);
            assert_eq!(upgrade(&once), once);
        }
    }

    #[test]
    fn unknown_annotations_are_skipped() {
        assert_eq!(
            upgrade("PEPTIDE1{A}$$$PEPTIDE2{note}|junk$"),
            "PEPTIDE1{A}$$$$V2.0"
        );
    }

    #[test]
    fn too_many_sections() {
        let text = "PEPTIDE1{A}$$$$$$";
        assert!(matches!(upgrade(text), Cow::Borrowed(t) if t == text));
        assert!(matches!(upgrade(""), Cow::Borrowed("")));
    }
}
