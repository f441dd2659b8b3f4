//! Alert - persisted notification record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{parse_variant, ValidationError};

/// Visual severity of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Info,
    Warning,
    Danger,
    Success,
}

impl AlertType {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        parse_variant("alert_type", value)
    }
}

/// Business area of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Compliance,
    Fraud,
    Advisory,
    System,
}

impl AlertCategory {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        parse_variant("alert_category", value)
    }
}

/// A notification created by the engine or an analyst action.
///
/// Only `is_read` is mutable; deletion is an explicit analyst action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub category: AlertCategory,
    #[serde(default)]
    pub is_read: bool,
    /// Transaction the alert refers to, if any
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub created_date: DateTime<Utc>,
}

impl Alert {
    /// Create a new unread alert
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        alert_type: AlertType,
        category: AlertCategory,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            message: message.into(),
            alert_type,
            category,
            is_read: false,
            transaction_id: None,
            created_date: Utc::now(),
        }
    }

    /// Link the alert to a transaction
    pub fn for_transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Parse a JSON array of alerts
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, ValidationError> {
        Ok(serde_json::from_str(json)?)
    }
}
