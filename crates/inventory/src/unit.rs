use core::str::FromStr;

use serde::{Deserialize, Serialize};

use warehouse_core::{DomainError, ValueObject};

/// Unit of measure (satuan). The set is fixed; anything else is rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Unit {
    Pcs,
    Kg,
    Gram,
    Liter,
    Meter,
    Box,
    Pack,
    Unit,
}

impl Unit {
    pub const ALL: [Unit; 8] = [
        Unit::Pcs,
        Unit::Kg,
        Unit::Gram,
        Unit::Liter,
        Unit::Meter,
        Unit::Box,
        Unit::Pack,
        Unit::Unit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Pcs => "Pcs",
            Unit::Kg => "Kg",
            Unit::Gram => "Gram",
            Unit::Liter => "Liter",
            Unit::Meter => "Meter",
            Unit::Box => "Box",
            Unit::Pack => "Pack",
            Unit::Unit => "Unit",
        }
    }
}

impl ValueObject for Unit {}

impl FromStr for Unit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Unit::ALL
            .into_iter()
            .find(|u| u.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown unit '{wanted}'")))
    }
}

impl TryFrom<String> for Unit {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Unit> for String {
    fn from(value: Unit) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("kg".parse::<Unit>().unwrap(), Unit::Kg);
        assert_eq!(" BOX ".parse::<Unit>().unwrap(), Unit::Box);
    }

    #[test]
    fn unknown_unit_is_a_validation_error() {
        assert!(matches!("ton".parse::<Unit>(), Err(DomainError::Validation(_))));
        assert!(matches!("".parse::<Unit>(), Err(DomainError::Validation(_))));
    }
}
