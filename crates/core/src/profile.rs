//! User profile - KYC status and stored risk score

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{parse_variant, ValidationError};

/// Know-Your-Customer verification status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    Pending,
    InProgress,
    Verified,
    Rejected,
}

impl KycStatus {
    /// Verified and rejected are final analyst decisions
    pub fn is_decided(&self) -> bool {
        matches!(self, KycStatus::Verified | KycStatus::Rejected)
    }

    /// Parse from text, rejecting unknown values
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        parse_variant("kyc_status", value)
    }
}

/// Investment risk appetite captured at onboarding
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

/// One profile per user. Profiles are updated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Storage identifier
    pub id: String,

    /// The user this profile belongs to (matches `Transaction::created_by`)
    pub user_id: String,

    #[serde(default)]
    pub full_name: Option<String>,

    /// Last computed user risk score (0-100)
    #[serde(default)]
    pub risk_score: Option<u8>,

    #[serde(default)]
    pub risk_tolerance: RiskTolerance,

    #[serde(default)]
    pub kyc_status: KycStatus,

    #[serde(default = "Utc::now")]
    pub updated_date: DateTime<Utc>,
}

impl UserProfile {
    /// Create a pending-KYC profile for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            full_name: None,
            risk_score: None,
            risk_tolerance: RiskTolerance::default(),
            kyc_status: KycStatus::Pending,
            updated_date: Utc::now(),
        }
    }

    /// Set the KYC status
    pub fn with_kyc_status(mut self, status: KycStatus) -> Self {
        self.kyc_status = status;
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Set the risk tolerance
    pub fn with_risk_tolerance(mut self, tolerance: RiskTolerance) -> Self {
        self.risk_tolerance = tolerance;
        self
    }

    pub fn is_kyc_verified(&self) -> bool {
        self.kyc_status == KycStatus::Verified
    }

    /// Parse a JSON array of profiles
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, ValidationError> {
        let profiles: Vec<UserProfile> = serde_json::from_str(json)?;
        for profile in &profiles {
            if profile.user_id.trim().is_empty() {
                return Err(ValidationError::EmptyField("user_id"));
            }
            if profile.risk_score.is_some_and(|score| score > 100) {
                return Err(ValidationError::Malformed(format!(
                    "risk_score out of range for {}",
                    profile.user_id
                )));
            }
        }
        Ok(profiles)
    }
}
