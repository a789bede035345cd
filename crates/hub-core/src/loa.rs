//! Level of assurance.
//!
//! Levels are ranked `LEVEL_1 < LEVEL_2 < SUBSTANTIAL < HIGH`. `LEVEL_X` is the
//! sentinel an IdP asserts when it has detected fraud; it has no rank.
//!
//! Ordering is only defined through [`LevelOfAssurance::rank`]; the type has
//! no `PartialOrd`, so `LEVEL_X` can never take part in a comparison.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identity-proofing strength asserted by an identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelOfAssurance {
    /// Lowest level.
    #[serde(rename = "LEVEL_1")]
    Level1,
    /// Standard level for most services.
    #[serde(rename = "LEVEL_2")]
    Level2,
    /// eIDAS substantial.
    #[serde(rename = "SUBSTANTIAL")]
    Substantial,
    /// eIDAS high.
    #[serde(rename = "HIGH")]
    High,
    /// Fraud / unknown sentinel.
    #[serde(rename = "LEVEL_X")]
    LevelX,
}

impl LevelOfAssurance {
    /// Position in the ordering, `None` for `LEVEL_X`.
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::Level1 => Some(1),
            Self::Level2 => Some(2),
            Self::Substantial => Some(3),
            Self::High => Some(4),
            Self::LevelX => None,
        }
    }

    /// Returns true for the fraud sentinel.
    #[must_use]
    pub const fn is_fraud_sentinel(self) -> bool {
        matches!(self, Self::LevelX)
    }

    /// Returns true for the levels an eIDAS country node may assert.
    #[must_use]
    pub const fn is_eidas_level(self) -> bool {
        matches!(self, Self::Substantial | Self::High)
    }

    /// Wire name of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Level1 => "LEVEL_1",
            Self::Level2 => "LEVEL_2",
            Self::Substantial => "SUBSTANTIAL",
            Self::High => "HIGH",
            Self::LevelX => "LEVEL_X",
        }
    }
}

impl fmt::Display for LevelOfAssurance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LevelOfAssurance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LEVEL_1" => Ok(Self::Level1),
            "LEVEL_2" => Ok(Self::Level2),
            "SUBSTANTIAL" => Ok(Self::Substantial),
            "HIGH" => Ok(Self::High),
            "LEVEL_X" => Ok(Self::LevelX),
            other => Err(Error::UnknownLevelOfAssurance(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERED: [LevelOfAssurance; 4] = [
        LevelOfAssurance::Level1,
        LevelOfAssurance::Level2,
        LevelOfAssurance::Substantial,
        LevelOfAssurance::High,
    ];

    #[test]
    fn ranks_order_real_levels_transitively() {
        for (i, a) in ORDERED.iter().enumerate() {
            for (j, b) in ORDERED.iter().enumerate() {
                assert_eq!(a.rank().cmp(&b.rank()), i.cmp(&j), "{a} vs {b}");
            }
        }
        let rank = |level: LevelOfAssurance| level.rank().unwrap();
        assert!(rank(LevelOfAssurance::High) > rank(LevelOfAssurance::Substantial));
        assert!(rank(LevelOfAssurance::Substantial) > rank(LevelOfAssurance::Level2));
        assert!(rank(LevelOfAssurance::Level2) > rank(LevelOfAssurance::Level1));
    }

    #[test]
    fn level_x_has_no_rank_but_equals_itself() {
        let x = LevelOfAssurance::LevelX;
        assert_eq!(x.rank(), None);
        assert!(x.is_fraud_sentinel());
        assert_eq!(x, LevelOfAssurance::LevelX);
        for level in ORDERED {
            assert_ne!(x, level);
            assert!(level.rank().is_some());
        }
    }

    #[test]
    fn parses_and_serializes_wire_names() {
        for level in ORDERED {
            assert_eq!(level.as_str().parse::<LevelOfAssurance>().ok(), Some(level));
        }
        assert!("LEVEL_3".parse::<LevelOfAssurance>().is_err());

        let json = serde_json::to_string(&LevelOfAssurance::Level2).unwrap();
        assert_eq!(json, "\"LEVEL_2\"");
    }
}
