// Standard Library Imports
use std::collections::BTreeMap;

// External Crate Imports
use tracing::trace;

// Local Crate Imports
use crate::{
    Formula, MonomerStructure,
    engine::{AttachmentSite, BondError, ChemistryEngine, EngineKind, InstanceId},
};

// Public API ==========================================================================================================

/// A [`ChemistryEngine`] that only tracks molecular formulae: every monomer is stored as its fragment (the full
/// formula minus its capping groups), and caps are added back onto any attachment point that is never bonded
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct FormulaEngine;

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct FormulaStructure {
    fragment: Formula,
    open: BTreeMap<AttachmentSite, Formula>,
    bonds: Vec<(AttachmentSite, AttachmentSite)>,
}

impl FormulaStructure {
    #[must_use]
    pub fn open_sites(&self) -> impl Iterator<Item = AttachmentSite> + '_ {
        self.open.keys().copied()
    }

    #[must_use]
    pub fn bonds(&self) -> &[(AttachmentSite, AttachmentSite)] {
        &self.bonds
    }
}

impl ChemistryEngine for FormulaEngine {
    type Structure = FormulaStructure;

    fn kind(&self) -> EngineKind {
        EngineKind::Formula
    }

    fn instantiate(
        &self,
        monomer: &MonomerStructure,
        instance: InstanceId,
    ) -> Result<Self::Structure, BondError> {
        let mut fragment = monomer.formula().clone();
        let mut open = BTreeMap::new();
        for attachment in monomer.attachments() {
            fragment -= attachment.cap();
            let site = AttachmentSite::new(instance, attachment.label());
            open.insert(site, attachment.cap().clone());
        }

        Ok(FormulaStructure {
            fragment,
            open,
            bonds: Vec::new(),
        })
    }

    fn bond(
        &self,
        left: Self::Structure,
        left_site: AttachmentSite,
        right: Self::Structure,
        right_site: AttachmentSite,
    ) -> Result<Self::Structure, BondError> {
        if !left.open.contains_key(&left_site) {
            return Err(BondError::MissingAttachment(left_site));
        }
        if !right.open.contains_key(&right_site) {
            return Err(BondError::MissingAttachment(right_site));
        }

        let joined = self.combine(left, right);
        self.cyclize(joined, left_site, right_site)
    }

    fn cyclize(
        &self,
        mut structure: Self::Structure,
        a: AttachmentSite,
        b: AttachmentSite,
    ) -> Result<Self::Structure, BondError> {
        if a == b {
            return Err(BondError::SelfBond(a));
        }
        // NOTE: Both sites are checked before either is removed, so a failed bond leaves the structure untouched
        for site in [a, b] {
            if !structure.open.contains_key(&site) {
                return Err(BondError::MissingAttachment(site));
            }
        }

        trace!(%a, %b, "bonding");
        structure.open.remove(&a);
        structure.open.remove(&b);
        structure.bonds.push((a, b));
        Ok(structure)
    }

    fn combine(&self, mut a: Self::Structure, b: Self::Structure) -> Self::Structure {
        a.fragment += &b.fragment;
        a.open.extend(b.open);
        a.bonds.extend(b.bonds);
        a
    }

    fn cap(&self, mut structure: Self::Structure) -> Result<Self::Structure, BondError> {
        for cap in std::mem::take(&mut structure.open).values() {
            structure.fragment += cap;
        }
        Ok(structure)
    }

    fn formula(&self, structure: &Self::Structure) -> Formula {
        structure.fragment.clone()
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use crate::{MonomerKind, PolymerType, RGroup};

    use super::*;

    fn formula(text: &str) -> Formula {
        Formula::new(text).unwrap()
    }

    fn site(instance: usize, label: RGroup) -> AttachmentSite {
        AttachmentSite::new(InstanceId(instance), label)
    }

    fn alanine() -> MonomerStructure {
        MonomerStructure::new(PolymerType::Peptide, "A", "Alanine", formula("C3H7NO2"))
            .with_kind(MonomerKind::Backbone)
            .with_attachment(RGroup::R1, formula("H"))
            .with_attachment(RGroup::R2, formula("OH"))
    }

    #[test]
    fn instantiate_removes_caps() {
        let engine = FormulaEngine;
        let ala = engine.instantiate(&alanine(), InstanceId(0)).unwrap();
        assert_eq!(engine.formula(&ala).to_string(), "C3H5NO");
        assert_eq!(
            ala.open_sites().collect::<Vec<_>>(),
            [site(0, RGroup::R1), site(0, RGroup::R2)]
        );

        let capped = engine.cap(ala).unwrap();
        assert_eq!(engine.formula(&capped).to_string(), "C3H7NO2");
        assert_eq!(capped.open_sites().count(), 0);
    }

    #[test]
    fn dipeptide_loses_water() {
        let engine = FormulaEngine;
        let first = engine.instantiate(&alanine(), InstanceId(0)).unwrap();
        let second = engine.instantiate(&alanine(), InstanceId(1)).unwrap();
        let dipeptide = engine
            .bond(first, site(0, RGroup::R2), second, site(1, RGroup::R1))
            .unwrap();
        assert_eq!(dipeptide.bonds(), [(site(0, RGroup::R2), site(1, RGroup::R1))]);

        let dipeptide = engine.cap(dipeptide).unwrap();
        assert_eq!(engine.formula(&dipeptide).to_string(), "C6H12N2O3");
    }

    #[test]
    fn cyclic_dipeptide_loses_two_waters() {
        let engine = FormulaEngine;
        let first = engine.instantiate(&alanine(), InstanceId(0)).unwrap();
        let second = engine.instantiate(&alanine(), InstanceId(1)).unwrap();
        let chain = engine
            .bond(first, site(0, RGroup::R2), second, site(1, RGroup::R1))
            .unwrap();
        let ring = engine
            .cyclize(chain, site(1, RGroup::R2), site(0, RGroup::R1))
            .unwrap();
        let ring = engine.cap(ring).unwrap();
        assert_eq!(engine.formula(&ring).to_string(), "C6H10N2O2");
    }

    #[test]
    fn chem_monomers_bond_through_r1() {
        let engine = FormulaEngine;
        let mcc = MonomerStructure::new(PolymerType::Chem, "MCC", "MCC", formula("C12H15NO4"))
            .with_attachment(RGroup::R1, formula("OH"));
        let az = MonomerStructure::new(PolymerType::Chem, "Az", "Azide", formula("C4H7N3O"))
            .with_attachment(RGroup::R1, formula("H"));

        let mcc = engine.instantiate(&mcc, InstanceId(0)).unwrap();
        let az = engine.instantiate(&az, InstanceId(1)).unwrap();
        let conjugate = engine
            .bond(mcc, site(0, RGroup::R1), az, site(1, RGroup::R1))
            .unwrap();
        let conjugate = engine.cap(conjugate).unwrap();
        assert_eq!(engine.formula(&conjugate).to_string(), "C16H20N4O4");
    }

    #[test]
    fn bonding_errors() {
        let engine = FormulaEngine;
        let first = engine.instantiate(&alanine(), InstanceId(0)).unwrap();
        let second = engine.instantiate(&alanine(), InstanceId(1)).unwrap();

        assert_eq!(
            engine.bond(first.clone(), site(0, RGroup::R3), second.clone(), site(1, RGroup::R1)),
            Err(BondError::MissingAttachment(site(0, RGroup::R3)))
        );
        assert_eq!(
            engine.cyclize(first.clone(), site(0, RGroup::R1), site(0, RGroup::R1)),
            Err(BondError::SelfBond(site(0, RGroup::R1)))
        );

        let chain = engine
            .bond(first, site(0, RGroup::R2), second, site(1, RGroup::R1))
            .unwrap();
        assert_eq!(
            engine.cyclize(chain, site(0, RGroup::R2), site(1, RGroup::R2)),
            Err(BondError::MissingAttachment(site(0, RGroup::R2)))
        );
    }

    #[test]
    fn combined_structures_stay_unbonded() {
        let engine = FormulaEngine;
        assert!(engine.kind().is_formula());
        let first = engine.instantiate(&alanine(), InstanceId(0)).unwrap();
        let second = engine.instantiate(&alanine(), InstanceId(1)).unwrap();
        let mixture = engine.cap(engine.combine(first, second)).unwrap();
        assert_eq!(engine.formula(&mixture).to_string(), "C6H14N2O4");
        assert!(mixture.bonds().is_empty());
    }
}
