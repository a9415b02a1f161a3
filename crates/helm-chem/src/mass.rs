// External Crate Imports
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Local Crate Imports
use crate::{AverageMass, Formula, Massive, MonoisotopicMass};

// NOTE: Monoisotopic masses are those of the most abundant isotope; average masses are the IUPAC standard atomic
// weights. Only the elements that turn up in biopolymer monomer libraries are included
pub(crate) struct ElementData {
    pub(crate) symbol: &'static str,
    monoisotopic: Decimal,
    average: Decimal,
}

static ELEMENTS: [ElementData; 15] = [
    element("B", dec!(11.0093054), dec!(10.811)),
    element("Br", dec!(78.9183371), dec!(79.904)),
    element("C", dec!(12.0000000), dec!(12.0107)),
    element("Cl", dec!(34.96885268), dec!(35.453)),
    element("F", dec!(18.99840322), dec!(18.9984032)),
    element("H", dec!(1.00782503207), dec!(1.00794)),
    element("I", dec!(126.904473), dec!(126.90447)),
    element("K", dec!(38.96370668), dec!(39.0983)),
    element("N", dec!(14.0030740048), dec!(14.0067)),
    element("Na", dec!(22.9897692809), dec!(22.98976928)),
    element("O", dec!(15.99491461956), dec!(15.9994)),
    element("P", dec!(30.97376163), dec!(30.973762)),
    element("S", dec!(31.97207100), dec!(32.065)),
    element("Se", dec!(79.9165213), dec!(78.96)),
    element("Si", dec!(27.9769265325), dec!(28.0855)),
];

const fn element(symbol: &'static str, monoisotopic: Decimal, average: Decimal) -> ElementData {
    ElementData {
        symbol,
        monoisotopic,
        average,
    }
}

pub(crate) fn lookup_element(symbol: &str) -> Option<&'static ElementData> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

impl Massive for Formula {
    fn monoisotopic_mass(&self) -> MonoisotopicMass {
        MonoisotopicMass(self.mass(|e| e.monoisotopic))
    }

    fn average_mass(&self) -> AverageMass {
        AverageMass(self.mass(|e| e.average))
    }
}

impl Formula {
    fn mass(&self, accessor: impl Fn(&ElementData) -> Decimal) -> Decimal {
        self.atoms
            .iter()
            .map(|(&symbol, &count)| {
                // SAFETY: Every symbol stored in a `Formula` was looked up in `ELEMENTS` when it was parsed
                let element = lookup_element(symbol).unwrap();
                Decimal::from(count) * accessor(element)
            })
            .sum()
    }
}
