// Local Crate Imports
use crate::{Attachment, Formula, MonomerKind, MonomerStructure, PolymerType, RGroup};

// Public API ==========================================================================================================

impl MonomerStructure {
    #[must_use]
    pub fn new(
        polymer_type: PolymerType,
        symbol: impl Into<String>,
        name: impl Into<String>,
        formula: Formula,
    ) -> Self {
        Self {
            polymer_type,
            symbol: symbol.into(),
            name: name.into(),
            kind: MonomerKind::default(),
            natural_analog: None,
            formula,
            attachments: Vec::new(),
            smiles: None,
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: MonomerKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds (or replaces) the attachment point `label`, which is capped by `cap` when left unbonded
    #[must_use]
    pub fn with_attachment(mut self, label: RGroup, cap: Formula) -> Self {
        self.attachments.retain(|a| a.label != label);
        self.attachments.push(Attachment { label, cap });
        self.attachments.sort_by_key(|a| a.label);
        self
    }

    #[must_use]
    pub fn with_natural_analog(mut self, analog: impl Into<String>) -> Self {
        self.natural_analog = Some(analog.into());
        self
    }

    #[must_use]
    pub fn with_smiles(mut self, smiles: impl Into<String>) -> Self {
        self.smiles = Some(smiles.into());
        self
    }

    #[must_use]
    pub const fn polymer_type(&self) -> PolymerType {
        self.polymer_type
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> MonomerKind {
        self.kind
    }

    /// The symbol of the natural monomer this one is derived from, falling back to its own symbol
    #[must_use]
    pub fn natural_analog(&self) -> &str {
        self.natural_analog.as_deref().unwrap_or(&self.symbol)
    }

    #[must_use]
    pub const fn formula(&self) -> &Formula {
        &self.formula
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    #[must_use]
    pub fn attachment(&self, label: RGroup) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.label == label)
    }

    #[must_use]
    pub fn smiles(&self) -> Option<&str> {
        self.smiles.as_deref()
    }
}

impl Attachment {
    #[must_use]
    pub const fn label(&self) -> RGroup {
        self.label
    }

    #[must_use]
    pub const fn cap(&self) -> &Formula {
        &self.cap
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn alanine() -> MonomerStructure {
        let formula = |f| Formula::new(f).unwrap();
        MonomerStructure::new(PolymerType::Peptide, "A", "Alanine", formula("C3H7NO2"))
            .with_kind(MonomerKind::Backbone)
            .with_attachment(RGroup::R2, formula("OH"))
            .with_attachment(RGroup::R1, formula("H"))
    }

    #[test]
    fn attachments_are_sorted_and_unique() {
        let ala = alanine();
        let labels: Vec<_> = ala.attachments().iter().map(Attachment::label).collect();
        assert_eq!(labels, [RGroup::R1, RGroup::R2]);
        assert_eq!(ala.attachment(RGroup::R2).unwrap().cap().to_string(), "HO");
        assert!(ala.attachment(RGroup::R3).is_none());

        let replaced = ala.with_attachment(RGroup::R1, Formula::new("OH").unwrap());
        assert_eq!(replaced.attachments().len(), 2);
        assert_eq!(replaced.attachment(RGroup::R1).unwrap().cap().to_string(), "HO");
    }

    #[test]
    fn natural_analog_falls_back_to_symbol() {
        let ala = alanine();
        assert_eq!(ala.natural_analog(), "A");
        assert_eq!(ala.kind(), MonomerKind::Backbone);
        assert_eq!(ala.polymer_type(), PolymerType::Peptide);
        assert_eq!(ala.name(), "Alanine");
        assert!(ala.smiles().is_none());

        let methyl = MonomerStructure::new(
            PolymerType::Rna,
            "5meC",
            "5-Methylcytosine",
            Formula::new("C5H7N3O").unwrap(),
        )
        .with_natural_analog("C")
        .with_smiles("CC1=CN([*:1])C(=O)N=C1N");
        assert_eq!(methyl.natural_analog(), "C");
        assert_eq!(methyl.symbol(), "5meC");
        assert_eq!(methyl.smiles(), Some("CC1=CN([*:1])C(=O)N=C1N"));
    }
}
