// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroU32,
    str::FromStr,
};

// External Crate Imports
use nom::{Finish, combinator::all_consuming};

// Local Crate Imports
use crate::{RGroup, errors::RGroupError, parsers::primitives::r_group};

// Public API ==========================================================================================================

impl RGroup {
    pub const R1: Self = Self(NonZeroU32::MIN);
    pub const R2: Self = Self(NonZeroU32::MIN.saturating_add(1));
    pub const R3: Self = Self(NonZeroU32::MIN.saturating_add(2));

    #[must_use]
    pub const fn new(number: NonZeroU32) -> Self {
        Self(number)
    }

    #[must_use]
    pub const fn number(self) -> u32 {
        self.0.get()
    }
}

impl Display for RGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

impl FromStr for RGroup {
    type Err = RGroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(r_group)(s)
            .finish()
            .map(|(_, number)| Self(number))
            .map_err(|_| RGroupError::new(s))
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!("R1".parse(), Ok(RGroup::R1));
        assert_eq!("R3".parse(), Ok(RGroup::R3));
        assert_eq!("R12".parse::<RGroup>().map(RGroup::number), Ok(12));
        assert_eq!(RGroup::R2.to_string(), "R2");

        for invalid in ["", "R", "R0", "r1", "R1a", "3"] {
            assert!(invalid.parse::<RGroup>().is_err(), "{invalid:?} parsed");
        }
    }

    #[test]
    fn r_groups_order_numerically() {
        let mut labels: Vec<RGroup> = ["R10", "R2", "R1"].iter().map(|l| l.parse().unwrap()).collect();
        labels.sort();
        assert_eq!(labels[0], RGroup::R1);
        assert_eq!(labels[1], RGroup::R2);
        assert_eq!(labels[2].number(), 10);
    }
}
