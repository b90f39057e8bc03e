//! Retry policies: which errors a rule matches and how the retry delay
//! grows across attempts.
//!
//! Every parameter is optional. Parameters left unset stay absent from the
//! compiled document; an omitted or empty matcher set defaults to the
//! wildcard when the rule is declared on a state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Jitter applied to the delay between retry attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JitterStrategy {
    /// Each delay is drawn uniformly from zero up to the computed delay.
    #[serde(rename = "FULL")]
    Full,
    /// The computed delay is used as-is.
    #[serde(rename = "NONE")]
    None,
}

impl fmt::Display for JitterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitterStrategy::Full => write!(f, "FULL"),
            JitterStrategy::None => write!(f, "NONE"),
        }
    }
}

/// A single retry rule on a state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Error matchers this rule applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// Delay before the first retry attempt, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u32>,
    /// Maximum number of retry attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_rate: Option<f64>,
    /// Upper bound on the delay between attempts, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_seconds: Option<u32>,
    /// Jitter applied to each computed delay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter_strategy: Option<JitterStrategy>,
}

impl RetryPolicy {
    /// Create a policy with every parameter unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the rule to the given error matchers.
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_interval_seconds(mut self, seconds: u32) -> Self {
        self.interval_seconds = Some(seconds);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_backoff_rate(mut self, rate: f64) -> Self {
        self.backoff_rate = Some(rate);
        self
    }

    pub fn with_max_delay_seconds(mut self, seconds: u32) -> Self {
        self.max_delay_seconds = Some(seconds);
        self
    }

    pub fn with_jitter_strategy(mut self, jitter: JitterStrategy) -> Self {
        self.jitter_strategy = Some(jitter);
        self
    }

    /// Check if this rule matches every error. An omitted or empty matcher
    /// set defaults to the wildcard.
    pub fn matches_all_errors(&self) -> bool {
        match &self.errors {
            Some(errors) if !errors.is_empty() => crate::matchers::contains_wildcard(errors),
            _ => true,
        }
    }
}
