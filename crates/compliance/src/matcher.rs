//! Counterparty classification capability
//!
//! The keyword rules (offshore, crypto, unknown counterparty) only ask
//! "does this transaction match?". Scoring depends on [`CounterpartyMatcher`],
//! so the default keyword implementation can be swapped for a watchlist or
//! entity-resolution service without touching the analyzer.

use std::sync::Arc;

use riskwatch_core::Transaction;

use crate::config::KeywordLists;

/// Classifies a transaction by its counterparty / category
pub trait CounterpartyMatcher: Send + Sync {
    /// Matcher name for logging/debugging
    fn name(&self) -> &str;

    /// Whether the transaction belongs to this matcher's class
    fn matches(&self, tx: &Transaction) -> bool;
}

/// Which free-text fields a keyword matcher inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    Counterparty,
    CounterpartyOrCategory,
}

/// Case-insensitive substring match against a fixed keyword list
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    name: String,
    keywords: Vec<String>,
    scope: MatchScope,
}

impl KeywordMatcher {
    pub fn new(name: impl Into<String>, keywords: &[String], scope: MatchScope) -> Self {
        Self {
            name: name.into(),
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            scope,
        }
    }

    fn field_matches(&self, field: &str) -> bool {
        let field = field.to_lowercase();
        self.keywords.iter().any(|kw| field.contains(kw.as_str()))
    }
}

impl CounterpartyMatcher for KeywordMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, tx: &Transaction) -> bool {
        let counterparty_hit = tx
            .counterparty
            .as_deref()
            .is_some_and(|cp| self.field_matches(cp));

        match self.scope {
            MatchScope::Counterparty => counterparty_hit,
            MatchScope::CounterpartyOrCategory => counterparty_hit || self.field_matches(&tx.category),
        }
    }
}

/// The three classifiers the analyzer consults
#[derive(Clone)]
pub struct RuleMatchers {
    pub offshore: Arc<dyn CounterpartyMatcher>,
    pub crypto: Arc<dyn CounterpartyMatcher>,
    pub unknown: Arc<dyn CounterpartyMatcher>,
}

impl RuleMatchers {
    /// Keyword-backed matchers built from the catalog lists
    pub fn from_keywords(lists: &KeywordLists) -> Self {
        Self {
            offshore: Arc::new(KeywordMatcher::new(
                "offshore_keywords",
                &lists.offshore,
                MatchScope::CounterpartyOrCategory,
            )),
            crypto: Arc::new(KeywordMatcher::new(
                "crypto_keywords",
                &lists.crypto,
                MatchScope::CounterpartyOrCategory,
            )),
            unknown: Arc::new(KeywordMatcher::new(
                "unknown_counterparty_keywords",
                &lists.unknown,
                MatchScope::Counterparty,
            )),
        }
    }

    /// Replace the offshore classifier
    pub fn with_offshore(mut self, matcher: Arc<dyn CounterpartyMatcher>) -> Self {
        self.offshore = matcher;
        self
    }

    /// Replace the crypto classifier
    pub fn with_crypto(mut self, matcher: Arc<dyn CounterpartyMatcher>) -> Self {
        self.crypto = matcher;
        self
    }

    /// Replace the unknown-counterparty classifier
    pub fn with_unknown(mut self, matcher: Arc<dyn CounterpartyMatcher>) -> Self {
        self.unknown = matcher;
        self
    }
}

impl std::fmt::Debug for RuleMatchers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleMatchers")
            .field("offshore", &self.offshore.name())
            .field("crypto", &self.crypto.name())
            .field("unknown", &self.unknown.name())
            .finish()
    }
}
