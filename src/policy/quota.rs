//! Quota values attached to a rule.

use std::fmt;
use std::num::NonZeroU64;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// An unvalidated count as written by a configuration author.
///
/// Text-based formats hand numbers over as strings, so both shapes are
/// accepted here and checked by [`parse_credit_limit`] / [`parse_reset_seconds`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    /// An integer literal
    Integer(i64),
    /// An integer literal above `i64::MAX`
    Unsigned(u64),
    /// A non-integral numeric literal; never valid
    Float(f64),
    /// Text that may hold a decimal integer
    Text(String),
}

impl RawCount {
    fn to_positive(&self) -> Option<NonZeroU64> {
        match self {
            RawCount::Integer(n) => u64::try_from(*n).ok().and_then(NonZeroU64::new),
            RawCount::Unsigned(n) => NonZeroU64::new(*n),
            RawCount::Float(_) => None,
            RawCount::Text(text) => text.trim().parse::<u64>().ok().and_then(NonZeroU64::new),
        }
    }
}

impl fmt::Display for RawCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCount::Integer(n) => write!(f, "{}", n),
            RawCount::Unsigned(n) => write!(f, "{}", n),
            RawCount::Float(n) => write!(f, "{}", n),
            RawCount::Text(text) => write!(f, "{:?}", text),
        }
    }
}

impl From<i64> for RawCount {
    fn from(n: i64) -> Self {
        RawCount::Integer(n)
    }
}

impl From<i32> for RawCount {
    fn from(n: i32) -> Self {
        RawCount::Integer(n.into())
    }
}

impl From<u32> for RawCount {
    fn from(n: u32) -> Self {
        RawCount::Integer(n.into())
    }
}

impl From<u64> for RawCount {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => RawCount::Integer(n),
            Err(_) => RawCount::Unsigned(n),
        }
    }
}

impl From<f64> for RawCount {
    fn from(n: f64) -> Self {
        RawCount::Float(n)
    }
}

impl From<&str> for RawCount {
    fn from(text: &str) -> Self {
        RawCount::Text(text.to_string())
    }
}

impl From<String> for RawCount {
    fn from(text: String) -> Self {
        RawCount::Text(text)
    }
}

/// Validate a credit limit: an integer of at least 1.
pub fn parse_credit_limit(raw: &RawCount) -> Result<NonZeroU64> {
    raw.to_positive()
        .ok_or_else(|| PolicyError::InvalidCreditLimit(raw.to_string()))
}

/// Validate a reset window: an integer number of seconds of at least 1.
pub fn parse_reset_seconds(raw: &RawCount) -> Result<NonZeroU64> {
    raw.to_positive()
        .ok_or_else(|| PolicyError::InvalidResetSeconds(raw.to_string()))
}

/// Capacity and window length of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quota {
    /// Credits available per window
    pub credit_limit: NonZeroU64,
    /// Window length in seconds
    pub reset_seconds: NonZeroU64,
}

impl Quota {
    /// Validate both raw values, credit limit first.
    pub fn parse(credit_limit: &RawCount, reset_seconds: &RawCount) -> Result<Self> {
        Ok(Self {
            credit_limit: parse_credit_limit(credit_limit)?,
            reset_seconds: parse_reset_seconds(reset_seconds)?,
        })
    }

    /// The quota window as a duration.
    pub fn reset_window(&self) -> Duration {
        Duration::from_secs(self.reset_seconds.get())
    }
}
