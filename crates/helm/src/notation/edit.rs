//! Atomic edits on a [`Helm2Notation`]. Every operation checks that it can succeed before touching the document, so a
//! failed edit leaves it exactly as it was

// Standard Library Imports
use std::mem;

// External Crate Imports
use helm_chem::PolymerType;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

// Local Crate Imports
use super::{
    Alternative, GroupId, Helm2Notation, Link, MonomerNotation, MonomerRef, MonomerUnit, PolymerId,
    PolymerNotation, SitePosition,
};

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum EditError {
    #[error("{0} is already part of this document")]
    DuplicatePolymer(PolymerId),

    #[error("{0} is not part of this document")]
    UnknownPolymer(PolymerId),

    #[error("{0} cannot be removed while it belongs to {1}")]
    #[diagnostic(help("remove or edit the grouping first"))]
    PolymerInGroup(PolymerId, GroupId),

    #[error("cannot insert at index {1} of {0}, which only has {2} elements")]
    IndexOutOfBounds(PolymerId, usize, usize),

    #[error("{0} has no monomer at position {1}")]
    NoSuchPosition(PolymerId, usize),

    #[error("position {1} of {0} is not a single monomer")]
    #[diagnostic(help("only units outside of groups, lists, and mixtures can be edited this way"))]
    NotAUnit(PolymerId, usize),

    #[error("position {1} of {0} is used by a connection")]
    #[diagnostic(help("remove the connections to this monomer before deleting it"))]
    PositionInUse(PolymerId, usize),

    #[error("deleting position {1} of {0} would leave its branch monomer without a backbone")]
    OrphanedBranch(PolymerId, usize),

    #[error("{0} is not RNA, so its monomers can't use {1:?} links")]
    #[diagnostic(help("only RNA monomers can be written adjacent to one another or hung off in a branch"))]
    LinkOutsideRna(PolymerId, Link),

    #[error("{0:?} is not a valid monomer symbol")]
    #[diagnostic(help("symbols must be non-empty, and `?` and `_` are reserved"))]
    InvalidSymbol(String),
}

type Result<T, E = EditError> = std::result::Result<T, E>;

impl Helm2Notation {
    pub fn add_polymer(&mut self, polymer: PolymerNotation) -> Result<()> {
        if self.polymer(polymer.id()).is_some() {
            return Err(EditError::DuplicatePolymer(polymer.id()));
        }
        check_links(polymer.id(), polymer.elements())?;
        debug!(id = %polymer.id(), "adding polymer");
        self.polymers.push(polymer);
        Ok(())
    }

    /// Removes a polymer along with every connection that touches it
    pub fn remove_polymer(&mut self, id: PolymerId) -> Result<PolymerNotation> {
        let index = self.polymer_index(id)?;
        if let Some(group) = self
            .groups
            .iter()
            .find(|g| g.members.iter().any(|m| m.entity == id.into()))
        {
            return Err(EditError::PolymerInGroup(id, group.id));
        }

        self.connections.retain(|c| !c.touches(id.into()));
        debug!(%id, "removed polymer");
        Ok(self.polymers.remove(index))
    }

    /// Inserts `element` before the top-level element at `index`. Connections to later monomers are shifted so that
    /// they keep pointing at the same monomers
    pub fn insert_monomer(&mut self, id: PolymerId, index: usize, element: MonomerNotation) -> Result<()> {
        check_links(id, std::slice::from_ref(&element))?;
        let polymer = self.polymer_mut(id).ok_or(EditError::UnknownPolymer(id))?;
        let len = polymer.elements().len();
        if index > len {
            return Err(EditError::IndexOutOfBounds(id, index, len));
        }

        let first = polymer.elements()[..index]
            .iter()
            .map(site_count)
            .sum::<usize>()
            + 1;
        let inserted = site_count(&element);

        polymer.elements_mut().insert(index, element);
        polymer.renumber();
        self.shift_positions(id, first, |p| p + inserted);
        Ok(())
    }

    /// Swaps the monomer of the unit at `position`, returning the monomer it replaced
    pub fn replace_monomer(&mut self, id: PolymerId, position: usize, monomer: MonomerRef) -> Result<MonomerRef> {
        if let MonomerRef::Symbol(symbol) = &monomer {
            check_symbol(symbol)?;
        }

        let polymer = self.polymer_mut(id).ok_or(EditError::UnknownPolymer(id))?;
        match site_mut(polymer.elements_mut(), position) {
            Some(MonomerNotation::Unit(unit)) => Ok(mem::replace(&mut unit.monomer, monomer)),
            Some(_) => Err(EditError::NotAUnit(id, position)),
            None => Err(EditError::NoSuchPosition(id, position)),
        }
    }

    /// Removes the top-level unit at `position`. Connections to later monomers are shifted down to follow them
    pub fn delete_monomer(&mut self, id: PolymerId, position: usize) -> Result<MonomerNotation> {
        let polymer = self.polymer(id).ok_or(EditError::UnknownPolymer(id))?;
        if polymer.site(position).is_none() {
            return Err(EditError::NoSuchPosition(id, position));
        }

        let elements = polymer.elements();
        let Some(index) = elements
            .iter()
            .position(|e| e.is_unit() && e.position() == Some(position))
        else {
            return Err(EditError::NotAUnit(id, position));
        };
        if elements.get(index + 1).is_some_and(|next| next.link() == Link::Branch) {
            return Err(EditError::OrphanedBranch(id, position));
        }
        if self.connections.iter().any(|c| {
            c.endpoints()
                .any(|e| e.entity == id.into() && addresses(&e.position, position))
        }) {
            return Err(EditError::PositionInUse(id, position));
        }

        let polymer = self.polymer_mut(id).ok_or(EditError::UnknownPolymer(id))?;
        let removed = polymer.elements_mut().remove(index);
        polymer.renumber();
        self.shift_positions(id, position + 1, |p| p - 1);
        Ok(removed)
    }

    /// Renames every use of the `old` symbol in polymers of type `kind`, including alternatives and the contents of
    /// groups. Returns the number of monomers that were renamed
    pub fn replace_monomer_symbol(&mut self, kind: PolymerType, old: &str, new: &str) -> Result<usize> {
        check_symbol(new)?;

        let replacements = self
            .polymers
            .iter_mut()
            .filter(|p| p.kind() == kind)
            .map(|p| rename_symbol(p.elements_mut(), old, new))
            .sum::<usize>();
        debug!(%kind, old, new, replacements, "renamed monomer symbol");
        Ok(replacements)
    }
}

// Private Helper Methods ==============================================================================================

impl Helm2Notation {
    fn polymer_index(&self, id: PolymerId) -> Result<usize> {
        self.polymers
            .iter()
            .position(|p| p.id() == id)
            .ok_or(EditError::UnknownPolymer(id))
    }

    fn shift_positions(&mut self, id: PolymerId, from: usize, shift: impl Fn(usize) -> usize) {
        let apply = |p: &mut usize| {
            if *p >= from {
                *p = shift(*p);
            }
        };
        for endpoint in self.connections.iter_mut().flat_map(|c| c.endpoints_mut()) {
            if endpoint.entity != id.into() {
                continue;
            }
            match &mut endpoint.position {
                SitePosition::Index(p) => apply(p),
                SitePosition::Alternatives(ps) => ps.iter_mut().for_each(&apply),
                SitePosition::Unknown => (),
            }
        }
    }
}

fn check_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() || matches!(symbol, "?" | "_") {
        Err(EditError::InvalidSymbol(symbol.to_owned()))
    } else {
        Ok(())
    }
}

fn check_links(id: PolymerId, elements: &[MonomerNotation]) -> Result<()> {
    if id.kind == PolymerType::Rna {
        return Ok(());
    }
    for element in elements {
        match element {
            MonomerNotation::Group(group) => check_links(id, &group.elements)?,
            element if !element.link().is_backbone() => return Err(EditError::LinkOutsideRna(id, element.link())),
            _ => (),
        }
    }
    Ok(())
}

fn site_count(element: &MonomerNotation) -> usize {
    match element {
        MonomerNotation::Group(group) => group.elements.iter().map(site_count).sum(),
        _ => 1,
    }
}

fn addresses(site: &SitePosition, position: usize) -> bool {
    match site {
        SitePosition::Index(p) => *p == position,
        SitePosition::Alternatives(ps) => ps.contains(&position),
        SitePosition::Unknown => false,
    }
}

fn site_mut(elements: &mut [MonomerNotation], position: usize) -> Option<&mut MonomerNotation> {
    for element in elements {
        match element {
            MonomerNotation::Group(group) => {
                if let Some(site) = site_mut(&mut group.elements, position) {
                    return Some(site);
                }
            }
            site if site.position() == Some(position) => return Some(site),
            _ => (),
        }
    }
    None
}

fn rename_symbol(elements: &mut [MonomerNotation], old: &str, new: &str) -> usize {
    let rename = |monomer: &mut MonomerRef| {
        if monomer.as_symbol() == Some(old) {
            *monomer = MonomerRef::symbol(new);
            1
        } else {
            0
        }
    };

    let mut replacements = 0;
    for element in elements {
        replacements += match element {
            MonomerNotation::Unit(MonomerUnit { monomer, .. }) => rename(monomer),
            MonomerNotation::List(list) | MonomerNotation::Mixture(list) => list
                .alternatives
                .iter_mut()
                .map(|Alternative { monomer, .. }| rename(monomer))
                .sum::<usize>(),
            MonomerNotation::Group(group) => rename_symbol(&mut group.elements, old, new),
        };
    }
    replacements
}

// Module Tests ========================================================================================================
