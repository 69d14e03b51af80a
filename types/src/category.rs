//! Proposal categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// The area of the platform a proposal concerns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    FeeStructure,
    PlatformUpdates,
    TreasuryManagement,
    Governance,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Self::FeeStructure,
        Self::PlatformUpdates,
        Self::TreasuryManagement,
        Self::Governance,
    ];

    /// Stable snake_case name used on the wire and in query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeeStructure => "fee_structure",
            Self::PlatformUpdates => "platform_updates",
            Self::TreasuryManagement => "treasury_management",
            Self::Governance => "governance",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TypesError;

    /// Accepts the snake_case name or the variant name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s || format!("{c:?}") == s)
            .ok_or_else(|| TypesError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!("fee_structure".parse::<Category>(), Ok(Category::FeeStructure));
        assert_eq!("TreasuryManagement".parse::<Category>(), Ok(Category::TreasuryManagement));
        assert!("marketing".parse::<Category>().is_err());
    }
}
