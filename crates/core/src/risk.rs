//! Risk severity types
//!
//! Two related but distinct scales:
//! - [`RiskLevel`] is the analyzer's bucketing of a 0-100 score
//! - [`RiskFlag`] is the severity stored on a transaction record, which adds `none`
//!
//! Both are ordered from least to most severe so that `max()` picks the most
//! restrictive value.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{parse_variant, ValidationError};

/// Score at or above which a result is `high`
pub const HIGH_SCORE: u8 = 60;

/// Score at or above which a result is `medium`
pub const MEDIUM_SCORE: u8 = 30;

/// Analyzer risk level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
}

impl RiskLevel {
    /// Bucket a saturated score. Lower edges are inclusive.
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_SCORE {
            RiskLevel::High
        } else if score >= MEDIUM_SCORE {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Parse from text, rejecting unknown values
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        parse_variant("risk_level", value)
    }
}

/// Severity flag stored on a transaction
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    #[default]
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl RiskFlag {
    /// Whether the flag carries any severity at all
    pub fn is_raised(&self) -> bool {
        !matches!(self, RiskFlag::None)
    }

    /// Medium and high flags are alert-worthy
    pub fn is_alerting(&self) -> bool {
        matches!(self, RiskFlag::Medium | RiskFlag::High)
    }

    /// Parse from text, rejecting unknown values
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        parse_variant("risk_flag", value)
    }
}

impl From<RiskLevel> for RiskFlag {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => RiskFlag::Low,
            RiskLevel::Medium => RiskFlag::Medium,
            RiskLevel::High => RiskFlag::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_buckets_are_lower_inclusive() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(59), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }

    #[test]
    fn test_flag_ordering() {
        assert!(RiskFlag::None < RiskFlag::Low);
        assert!(RiskFlag::Low < RiskFlag::Medium);
        assert!(RiskFlag::Medium < RiskFlag::High);
        assert_eq!(RiskFlag::Low.max(RiskFlag::High), RiskFlag::High);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(RiskFlag::parse("HIGH").unwrap(), RiskFlag::High);
        assert_eq!(RiskFlag::parse("none").unwrap(), RiskFlag::None);
        assert!(matches!(
            RiskFlag::parse("severe"),
            Err(ValidationError::UnknownVariant { field: "risk_flag", .. })
        ));
    }

    #[test]
    fn test_display_is_snake_case() {
        assert_eq!(RiskFlag::Medium.to_string(), "medium");
        assert_eq!(RiskLevel::High.to_string(), "high");
    }
}
