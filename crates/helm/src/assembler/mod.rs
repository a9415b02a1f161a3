//! Builds a single molecular structure from a [`Helm2Notation`], using a [`MonomerStore`] to find monomers and a
//! [`ChemistryEngine`] to bond them. Every monomer of every polymer is resolved before any bonds are made, and any
//! error throws away everything that was built so far

mod errors;

// Standard Library Imports
use std::borrow::Cow;

// External Crate Imports
use ahash::{HashMap, HashSet};
use helm_chem::{
    AttachmentSite, ChemistryEngine, Formula, InstanceId, MonomerStore, MonomerStructure, PolymerType, RGroup,
};
use tracing::{debug, trace};

// Local Crate Imports
use crate::notation::{
    AttachmentPoint, ConnectionNotation, Endpoint, EntityId, Helm2Notation, Link, MonomerNotation, MonomerRef,
    PolymerId, PolymerNotation, RepeatCount, SitePosition,
};
pub use errors::BuildError;

type Result<T, E = BuildError> = std::result::Result<T, E>;

// Public API ==========================================================================================================

#[derive(Copy, Clone, Debug)]
pub struct Assembler<'s, 'e, S, E> {
    store: &'s S,
    engine: &'e E,
}

impl<'s, 'e, S: MonomerStore, E: ChemistryEngine> Assembler<'s, 'e, S, E> {
    #[must_use]
    pub const fn new(store: &'s S, engine: &'e E) -> Self {
        Self { store, engine }
    }

    pub fn assemble(&self, doc: &Helm2Notation) -> Result<E::Structure> {
        debug!(engine = ?self.engine.kind(), polymers = doc.polymers().len(), "assembling document");
        if doc.polymers().is_empty() {
            return Err(BuildError::EmptyDocument);
        }

        let resolved: Vec<_> = doc
            .polymers()
            .iter()
            .map(|polymer| Ok((polymer.id(), self.resolve_polymer(polymer)?)))
            .collect::<Result<_>>()?;
        trace!("resolved every monomer");

        let mut build = Build::new(self.engine);
        for (id, elements) in &resolved {
            build.expand(*id, elements)?;
        }
        trace!(instances = build.instances.len(), "expanded repeats");

        build.chain()?;
        for connection in doc.connections() {
            build.connect(connection)?;
        }

        build.finish()
    }

    /// Assembles `doc` and returns the formula of the result
    pub fn formula(&self, doc: &Helm2Notation) -> Result<Formula> {
        let structure = self.assemble(doc)?;
        Ok(self.engine.formula(&structure))
    }
}

// Monomer Resolution ==================================================================================================

enum Resolved<'s> {
    Unit {
        position: usize,
        link: Link,
        monomer: Cow<'s, MonomerStructure>,
        copies: u32,
    },
    Group {
        elements: Vec<Resolved<'s>>,
        copies: u32,
    },
}

impl<'s, S: MonomerStore, E: ChemistryEngine> Assembler<'s, '_, S, E> {
    fn resolve_polymer(&self, polymer: &PolymerNotation) -> Result<Vec<Resolved<'s>>> {
        let id = polymer.id();
        if id.kind == PolymerType::Blob {
            return Err(BuildError::OpaquePolymer(id));
        }
        if polymer.position_count() == 0 {
            return Err(BuildError::EmptyPolymer(id));
        }

        self.resolve_elements(id, polymer.elements())
    }

    fn resolve_elements(&self, id: PolymerId, elements: &[MonomerNotation]) -> Result<Vec<Resolved<'s>>> {
        let ambiguous = |position, reason| BuildError::AmbiguousMonomer {
            polymer: id,
            position,
            reason,
        };

        elements
            .iter()
            .map(|element| match element {
                MonomerNotation::Unit(unit) => {
                    let position = unit.position();
                    Ok(Resolved::Unit {
                        position,
                        link: unit.link,
                        monomer: self.resolve_monomer(id, position, &unit.monomer)?,
                        copies: copies(id, position, unit.repeat)?,
                    })
                }
                MonomerNotation::List(list) => Err(ambiguous(list.position(), "a list of alternative monomers")),
                MonomerNotation::Mixture(list) => Err(ambiguous(list.position(), "a mixture of monomers")),
                MonomerNotation::Group(group) => {
                    let position = element.position().unwrap_or_default();
                    Ok(Resolved::Group {
                        elements: self.resolve_elements(id, &group.elements)?,
                        copies: copies(id, position, group.repeat)?,
                    })
                }
            })
            .collect()
    }

    fn resolve_monomer(
        &self,
        id: PolymerId,
        position: usize,
        monomer: &MonomerRef,
    ) -> Result<Cow<'s, MonomerStructure>> {
        let unknown = |symbol: &str| BuildError::UnknownMonomer {
            polymer: id,
            position,
            symbol: symbol.to_owned(),
        };
        let ambiguous = |reason| BuildError::AmbiguousMonomer {
            polymer: id,
            position,
            reason,
        };

        match monomer {
            MonomerRef::Symbol(symbol) => self
                .store
                .lookup(id.kind, symbol)
                .map(Cow::Borrowed)
                .ok_or_else(|| unknown(symbol)),
            MonomerRef::Inline(structure) => self
                .store
                .resolve_inline(id.kind, structure)
                .ok_or_else(|| unknown(structure)),
            MonomerRef::Wildcard => Err(ambiguous("the wildcard monomer `?`")),
            MonomerRef::Undefined => Err(ambiguous("the undefined monomer `_`")),
        }
    }
}

fn copies(id: PolymerId, position: usize, repeat: Option<RepeatCount>) -> Result<u32> {
    repeat.map_or(Ok(1), |repeat| {
        repeat.concrete().ok_or(BuildError::AmbiguousMonomer {
            polymer: id,
            position,
            reason: "repeated a range of times",
        })
    })
}

// Structure Building ==================================================================================================

#[derive(Copy, Clone)]
struct Instance<'r> {
    polymer: PolymerId,
    position: usize,
    link: Link,
    monomer: &'r MonomerStructure,
}

struct Build<'r, 'e, E: ChemistryEngine> {
    engine: &'e E,
    instances: Vec<Instance<'r>>,
    polymers: Vec<(PolymerId, Vec<InstanceId>)>,
    // NOTE: Every copy made by a repeat keeps the position it was written at
    sites: HashMap<(PolymerId, usize), Vec<InstanceId>>,
    // NOTE: `owners[i]` is the index of the component that instance `i` belongs to. Merged components are left `None`
    components: Vec<Option<E::Structure>>,
    owners: Vec<usize>,
    consumed: HashSet<AttachmentSite>,
}

impl<'r, 'e, E: ChemistryEngine> Build<'r, 'e, E> {
    fn new(engine: &'e E) -> Self {
        Self {
            engine,
            instances: Vec::new(),
            polymers: Vec::new(),
            sites: HashMap::default(),
            components: Vec::new(),
            owners: Vec::new(),
            consumed: HashSet::default(),
        }
    }

    fn expand(&mut self, id: PolymerId, elements: &'r [Resolved<'_>]) -> Result<()> {
        let mut order = Vec::new();
        self.expand_elements(id, elements, &mut order)?;
        self.polymers.push((id, order));
        Ok(())
    }

    fn expand_elements(
        &mut self,
        id: PolymerId,
        elements: &'r [Resolved<'_>],
        order: &mut Vec<InstanceId>,
    ) -> Result<()> {
        for element in elements {
            match element {
                Resolved::Unit {
                    position,
                    link,
                    monomer,
                    copies,
                } => {
                    for _ in 0..*copies {
                        let instance = InstanceId(self.instances.len());
                        let structure = self.engine.instantiate(monomer, instance)?;
                        self.instances.push(Instance {
                            polymer: id,
                            position: *position,
                            link: *link,
                            monomer,
                        });
                        self.components.push(Some(structure));
                        self.owners.push(instance.0);
                        self.sites.entry((id, *position)).or_default().push(instance);
                        order.push(instance);
                    }
                }
                Resolved::Group { elements, copies } => {
                    for _ in 0..*copies {
                        self.expand_elements(id, elements, order)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Bonds each backbone monomer to the one before it, and hangs branch monomers off of the backbone monomer that
    /// precedes them
    fn chain(&mut self) -> Result<()> {
        for (id, order) in self.polymers.clone() {
            let Some((outgoing, incoming)) = id.kind.backbone_points() else {
                return Err(BuildError::OpaquePolymer(id));
            };

            let mut backbone: Option<InstanceId> = None;
            for instance in order {
                if self.instances[instance.0].link.is_branch() {
                    if let (Some(previous), Some((outgoing, incoming))) = (backbone, id.kind.branch_points()) {
                        self.bond(previous, outgoing, instance, incoming)?;
                    }
                    continue;
                }

                if let Some(previous) = backbone {
                    self.bond(previous, outgoing, instance, incoming)?;
                }
                backbone = Some(instance);
            }
        }
        Ok(())
    }

    fn connect(&mut self, connection: &ConnectionNotation) -> Result<()> {
        let ambiguous = |reason| BuildError::AmbiguousConnection {
            connection: connection.to_string(),
            reason,
        };

        match (connection.source.attachment, connection.target.attachment) {
            (AttachmentPoint::Pair, AttachmentPoint::Pair) => {
                trace!(%connection, "skipping hydrogen bond");
                return Ok(());
            }
            (AttachmentPoint::Pair, _) | (_, AttachmentPoint::Pair) => {
                return Err(ambiguous("a `pair` can only be joined to another `pair`"));
            }
            _ => (),
        }

        let (polymer, position, label) = self.endpoint(connection, &connection.source)?;
        let source = self.claim(polymer, position, label)?;
        self.consumed.insert(source);

        let (polymer, position, label) = self.endpoint(connection, &connection.target)?;
        let target = self.claim(polymer, position, label)?;

        trace!(%connection, "applying connection");
        self.join(source, target)
    }

    fn finish(self) -> Result<E::Structure> {
        let mut result: Option<E::Structure> = None;
        let mut count = 0;
        for structure in self.components.into_iter().flatten() {
            let capped = self.engine.cap(structure)?;
            result = Some(match result {
                Some(result) => self.engine.combine(result, capped),
                None => capped,
            });
            count += 1;
        }

        debug!(components = count, "finished assembly");
        result.ok_or(BuildError::EmptyDocument)
    }
}

// Private Helper Methods ==============================================================================================

impl<E: ChemistryEngine> Build<'_, '_, E> {
    fn bond(&mut self, left: InstanceId, left_label: RGroup, right: InstanceId, right_label: RGroup) -> Result<()> {
        let left = self.free_site(left, left_label)?;
        self.consumed.insert(left);
        let right = self.free_site(right, right_label)?;
        self.join(left, right)
    }

    fn endpoint(&self, connection: &ConnectionNotation, endpoint: &Endpoint) -> Result<(PolymerId, usize, RGroup)> {
        let ambiguous = |reason| BuildError::AmbiguousConnection {
            connection: connection.to_string(),
            reason,
        };

        let EntityId::Polymer(polymer) = endpoint.entity else {
            return Err(ambiguous("it refers to a group of polymers"));
        };
        let SitePosition::Index(position) = endpoint.position else {
            return Err(ambiguous("it doesn't name a single monomer position"));
        };
        let AttachmentPoint::RGroup(label) = endpoint.attachment else {
            return Err(ambiguous("it doesn't name a specific attachment point"));
        };
        if !self.polymers.iter().any(|(id, _)| *id == polymer) {
            return Err(BuildError::UnknownPolymer(polymer));
        }

        Ok((polymer, position, label))
    }

    /// Finds the first copy of the monomer at `position` whose `label` attachment point is still free
    fn claim(&self, polymer: PolymerId, position: usize, label: RGroup) -> Result<AttachmentSite> {
        let mut first_error = None;
        for &instance in self.sites.get(&(polymer, position)).into_iter().flatten() {
            match self.free_site(instance, label) {
                Ok(site) => return Ok(site),
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }

        Err(first_error.unwrap_or(BuildError::AmbiguousMonomer {
            polymer,
            position,
            reason: "not a single monomer",
        }))
    }

    fn free_site(&self, instance: InstanceId, label: RGroup) -> Result<AttachmentSite> {
        let Instance {
            polymer,
            position,
            monomer,
            ..
        } = self.instances[instance.0];

        if monomer.attachment(label).is_none() {
            return Err(BuildError::MissingAttachment {
                polymer,
                position,
                label,
                symbol: monomer.symbol().to_owned(),
            });
        }

        let site = AttachmentSite::new(instance, label);
        if self.consumed.contains(&site) {
            return Err(BuildError::ConflictingAttachment {
                polymer,
                position,
                label,
            });
        }
        Ok(site)
    }

    fn join(&mut self, left: AttachmentSite, right: AttachmentSite) -> Result<()> {
        self.consumed.insert(left);
        self.consumed.insert(right);

        let left_component = self.owners[left.instance.0];
        let right_component = self.owners[right.instance.0];
        let structure = if left_component == right_component {
            let structure = self.take(left_component);
            self.engine.cyclize(structure, left, right)?
        } else {
            let left_structure = self.take(left_component);
            let right_structure = self.take(right_component);
            let joined = self.engine.bond(left_structure, left, right_structure, right)?;
            for owner in &mut self.owners {
                if *owner == right_component {
                    *owner = left_component;
                }
            }
            joined
        };

        trace!(%left, %right, "bonded");
        self.components[left_component] = Some(structure);
        Ok(())
    }

    fn take(&mut self, component: usize) -> E::Structure {
        // SAFETY: `owners` only ever points at components that haven't been merged into another, and those always hold
        // a structure outside of `join()`
        self.components[component].take().unwrap()
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use helm_chem::{FormulaEngine, MonomerDatabase};
    use once_cell::sync::Lazy;

    use super::*;
    use crate::{parser::parse, testing_tools::assert_miette_contains};

    static DB: Lazy<MonomerDatabase> = Lazy::new(MonomerDatabase::default);

    fn formula(text: &str) -> Result<String> {
        let doc = parse(text).unwrap();
        Assembler::new(&*DB, &FormulaEngine)
            .formula(&doc)
            .map(|f| f.to_string())
    }

    fn id(kind: PolymerType, index: u32) -> PolymerId {
        PolymerId::new(kind, std::num::NonZeroU32::new(index).unwrap())
    }

    #[test]
    fn linked_chemical_modifiers() {
        assert_eq!(
            formula("CHEM1{[MCC]}|CHEM2{[Az]}$CHEM1,CHEM2,1:R1-1:R1$$$V2.0").unwrap(),
            "C16H20N4O4"
        );
    }

    #[test]
    fn linear_peptides() {
        assert_eq!(formula("PEPTIDE1{A}$$$$V2.0").unwrap(), "C3H7NO2");
        assert_eq!(formula("PEPTIDE1{A.G}$$$$V2.0").unwrap(), "C5H10N2O3");
        assert_eq!(formula("PEPTIDE1{[ac].A.G.[am]}$$$$V2.0").unwrap(), "C7H13N3O3");
    }

    #[test]
    fn nucleotides() {
        assert_eq!(formula("RNA1{R(A)P}$$$$V2.0").unwrap(), "C10H14N5O7P");
        assert_eq!(formula("RNA1{R(A)}$$$$V2.0").unwrap(), "C10H13N5O4");
    }

    #[test]
    fn repeats_are_expanded() {
        assert_eq!(formula("PEPTIDE1{G'3'}$$$$V2.0").unwrap(), "C6H11N3O4");
        assert_eq!(formula("PEPTIDE1{G'3-3'}$$$$V2.0").unwrap(), "C6H11N3O4");
        assert_eq!(formula("PEPTIDE1{(A.G)'2'}$$$$V2.0").unwrap(), "C10H18N4O5");
    }

    #[test]
    fn cycles_and_cross_links() {
        assert_eq!(
            formula("PEPTIDE1{A.G}$PEPTIDE1,PEPTIDE1,2:R2-1:R1$$$V2.0").unwrap(),
            "C5H8N2O2"
        );
        assert_eq!(
            formula("PEPTIDE1{C}|PEPTIDE2{C}$PEPTIDE1,PEPTIDE2,1:R3-1:R3$$$V2.0").unwrap(),
            "C6H12N2O4S2"
        );
        assert_eq!(
            formula("PEPTIDE1{C'2'}$PEPTIDE1,PEPTIDE1,1:R3-1:R3$$$V2.0").unwrap(),
            "C6H10N2O3S2"
        );
    }

    #[test]
    fn hydrogen_bonds_add_nothing() {
        let paired = "RNA1{R(A)P}|RNA2{R(U)P}$RNA1,RNA2,2:pair-2:pair$$$V2.0";
        let unpaired = "RNA1{R(A)P}|RNA2{R(U)P}$$$$V2.0";
        assert_eq!(formula(paired).unwrap(), formula(unpaired).unwrap());
    }

    #[test]
    fn inline_structures() {
        assert_eq!(formula("CHEM1{[[*:1]OCCOCCO[*:2]]}$$$$V2.0").unwrap(), "C4H10O3");
        assert_eq!(
            formula("CHEM1{[[*]CC[*]]}$$$$V2.0"),
            Err(BuildError::UnknownMonomer {
                polymer: id(PolymerType::Chem, 1),
                position: 1,
                symbol: "[*]CC[*]".to_owned(),
            })
        );
    }

    #[test]
    fn unknown_monomers_are_found_before_bonding() {
        let chem1 = id(PolymerType::Chem, 1);
        let unknown = BuildError::UnknownMonomer {
            polymer: chem1,
            position: 1,
            symbol: "CZ".to_owned(),
        };
        assert_eq!(formula("CHEM1{[CZ]}$$$$V2.0"), Err(unknown.clone()));
        // NOTE: `[ac]` can't be bonded after `A`, but the unknown monomer is still reported first
        assert_eq!(formula("PEPTIDE1{A.[ac]}|CHEM1{[CZ]}$$$$V2.0"), Err(unknown));
    }

    #[test]
    fn ambiguous_monomers() {
        let peptide1 = id(PolymerType::Peptide, 1);
        let ambiguous = |position, reason| {
            Err(BuildError::AmbiguousMonomer {
                polymer: peptide1,
                position,
                reason,
            })
        };
        assert_eq!(formula("PEPTIDE1{A.(A,G)}$$$$V2.0"), ambiguous(2, "a list of alternative monomers"));
        assert_eq!(formula("PEPTIDE1{(A+G)}$$$$V2.0"), ambiguous(1, "a mixture of monomers"));
        assert_eq!(formula("PEPTIDE1{A.?}$$$$V2.0"), ambiguous(2, "the wildcard monomer `?`"));
        assert_eq!(formula("PEPTIDE1{_}$$$$V2.0"), ambiguous(1, "the undefined monomer `_`"));
        assert_eq!(formula("PEPTIDE1{A.G'2-4'}$$$$V2.0"), ambiguous(2, "repeated a range of times"));
    }

    #[test]
    fn attachment_errors() {
        let peptide1 = id(PolymerType::Peptide, 1);
        assert_eq!(
            formula("PEPTIDE1{A.[ac]}$$$$V2.0"),
            Err(BuildError::MissingAttachment {
                polymer: peptide1,
                position: 2,
                label: RGroup::R1,
                symbol: "ac".to_owned(),
            })
        );
        assert_eq!(
            formula("PEPTIDE1{A}|CHEM1{[MCC]}$PEPTIDE1,CHEM1,1:R3-1:R1$$$V2.0"),
            Err(BuildError::MissingAttachment {
                polymer: peptide1,
                position: 1,
                label: RGroup::R3,
                symbol: "A".to_owned(),
            })
        );

        let two_links = "PEPTIDE1{K'2'}|CHEM1{[MCC]}|CHEM2{[MCC]}$PEPTIDE1,CHEM1,1:R3-1:R1|PEPTIDE1,CHEM2,1:R3-1:R1";
        assert!(formula(&format!("{two_links}$$$V2.0")).is_ok());
        assert_eq!(
            formula(&format!("{two_links}|PEPTIDE1,CHEM1,1:R3-1:R1$$$V2.0")),
            Err(BuildError::ConflictingAttachment {
                polymer: peptide1,
                position: 1,
                label: RGroup::R3,
            })
        );
        assert_eq!(
            formula("PEPTIDE1{A.G}$PEPTIDE1,PEPTIDE1,1:R2-2:R1$$$V2.0"),
            Err(BuildError::ConflictingAttachment {
                polymer: peptide1,
                position: 1,
                label: RGroup::R2,
            })
        );
    }

    #[test]
    fn unbuildable_documents() {
        assert_eq!(formula("$$$$V2.0"), Err(BuildError::EmptyDocument));
        assert_eq!(
            formula("PEPTIDE1{}$$$$V2.0"),
            Err(BuildError::EmptyPolymer(id(PolymerType::Peptide, 1)))
        );
        assert_eq!(
            formula("BLOB1{Bead}$$$$V2.0"),
            Err(BuildError::OpaquePolymer(id(PolymerType::Blob, 1)))
        );
        assert_miette_contains!(
            formula("PEPTIDE1{C}|PEPTIDE2{C}$G1,PEPTIDE1,1:R3-1:R3$G1(PEPTIDE1,PEPTIDE2)$$V2.0"),
            "since it refers to a group of polymers"
        );
        assert_miette_contains!(
            formula("PEPTIDE1{C.C}$PEPTIDE1,PEPTIDE1,(1,2):R3-1:R3$$$V2.0"),
            "since it doesn't name a single monomer position"
        );
        assert_miette_contains!(
            formula("PEPTIDE1{C}|PEPTIDE2{C}$PEPTIDE1,PEPTIDE2,1:R3-1:pair$$$V2.0"),
            "a `pair` can only be joined to another `pair`"
        );
    }

    #[test]
    fn structures_remember_their_bonds() {
        let doc = parse("PEPTIDE1{A.G.S}$$$$V2.0").unwrap();
        let structure = Assembler::new(&*DB, &FormulaEngine).assemble(&doc).unwrap();
        assert_eq!(structure.bonds().len(), 2);
        assert_eq!(structure.open_sites().count(), 0);
    }
}
