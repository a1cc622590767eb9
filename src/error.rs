//! Error types for rate limit policy resolution.

use std::collections::BTreeMap;

use thiserror::Error;

/// Main error type for ratepolicy operations.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Credit limit is not an integer of at least 1
    #[error("Invalid creditLimit: {0}")]
    InvalidCreditLimit(String),

    /// Reset window is not an integer number of seconds of at least 1
    #[error("Invalid resetSeconds: {0}")]
    InvalidResetSeconds(String),

    /// The rule can never fire because an earlier rule already matches everything it would
    #[error("Unreachable rule {pattern:?}: already covered by rule #{earlier} {earlier_pattern:?}")]
    UnreachableRule {
        /// Pattern of the rejected rule
        pattern: BTreeMap<String, String>,
        /// Index of the earlier rule that subsumes it
        earlier: usize,
        /// Pattern of that earlier rule
        earlier_pattern: BTreeMap<String, String>,
    },

    /// No rule matches the request attributes
    #[error("No matching rule")]
    NoMatchingRule,

    /// The request names a domain with no configured rules
    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    /// A rule inside a policy document was rejected
    #[error("Rule #{position} in domain {domain:?} rejected: {source}")]
    InvalidRule {
        /// Domain the rule was declared in
        domain: String,
        /// Zero-based position of the rule in declaration order
        position: usize,
        /// Why the rule was rejected
        #[source]
        source: Box<PolicyError>,
    },

    /// A glob could not be compiled into a matcher
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PolicyError {
    /// The innermost rule error, looking through [`PolicyError::InvalidRule`] wrappers.
    pub fn root(&self) -> &PolicyError {
        match self {
            PolicyError::InvalidRule { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for ratepolicy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
