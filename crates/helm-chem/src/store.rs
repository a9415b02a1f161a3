// Standard Library Imports
use std::borrow::Cow;

// Local Crate Imports
use crate::{MonomerDatabase, MonomerStructure, PolymerType};

// Public API ==========================================================================================================

/// Somewhere monomer structures can be looked up by polymer type and symbol
pub trait MonomerStore {
    fn lookup(&self, polymer_type: PolymerType, symbol: &str) -> Option<&MonomerStructure>;

    /// Resolves an inline structure (like `[*]OCCO[*]`) written directly in the notation. Stores that can't interpret
    /// inline structures return `None`
    fn resolve_inline(
        &self,
        polymer_type: PolymerType,
        structure: &str,
    ) -> Option<Cow<'_, MonomerStructure>> {
        let _ = (polymer_type, structure);
        None
    }
}

impl MonomerStore for MonomerDatabase {
    fn lookup(&self, polymer_type: PolymerType, symbol: &str) -> Option<&MonomerStructure> {
        self.get(polymer_type, symbol)
    }

    // NOTE: No chemistry is done here, so an inline structure only resolves if it's written exactly like the SMILES of
    // a known monomer
    fn resolve_inline(
        &self,
        polymer_type: PolymerType,
        structure: &str,
    ) -> Option<Cow<'_, MonomerStructure>> {
        self.monomers(polymer_type)
            .find(|m| m.smiles() == Some(structure))
            .map(Cow::Borrowed)
    }
}

impl<S: MonomerStore + ?Sized> MonomerStore for &S {
    fn lookup(&self, polymer_type: PolymerType, symbol: &str) -> Option<&MonomerStructure> {
        (**self).lookup(polymer_type, symbol)
    }

    fn resolve_inline(
        &self,
        polymer_type: PolymerType,
        structure: &str,
    ) -> Option<Cow<'_, MonomerStructure>> {
        (**self).resolve_inline(polymer_type, structure)
    }
}

// Module Tests ========================================================================================================
