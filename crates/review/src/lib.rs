//! # RiskWatch Review
//!
//! Review workflow around the compliance engine.
//!
//! ## Scope
//! - Collaborator contracts for transactions, profiles and alerts
//! - Transaction review state machine (automatic flags + analyst actions)
//! - KYC sub-workflow, analyst-driven only
//! - Append-only audit ledger of every state change
//! - Idempotent batch monitor: re-evaluates only when the transaction set changed
//!
//! ## Features
//! - Per-transaction write serialization plus compare-and-set on the stored
//!   review state
//! - Alerts emitted once per crossing into `flagged` or escalation
//! - [`ComplianceService`] facade exposing every operation in-process

pub mod alerts;
pub mod error;
pub mod event;
pub mod ledger;
pub mod monitor;
pub mod service;
pub mod store;
pub mod workflow;

pub use alerts::{AlertCenter, AlertFilter};
pub use error::{WorkflowError, WorkflowResult};
pub use event::ReviewEvent;
pub use ledger::{LedgerError, ReviewLedger};
pub use monitor::{MonitorReport, RiskMonitor};
pub use service::{ComplianceOverview, ComplianceService};
pub use store::{
    AlertStore, InMemoryStore, ProfilePatch, ProfileStore, SortOrder, StoreError, StoreResult, TransactionFilter,
    TransactionPatch, TransactionStore,
};
pub use workflow::{KycAction, ReviewAction, ReviewConfig, ReviewWorkflow, VerdictOutcome};
