//! Ratepolicy - Declarative Rate Limit Policy Resolver
//!
//! This crate decides which rate limit rule governs a request. Rules are
//! partial patterns over request attributes, matched first-to-last in
//! declaration order. Registering a rule that an earlier rule already covers
//! is rejected, so every accepted rule can fire for some request.

pub mod config;
pub mod error;
pub mod policy;

pub use error::{PolicyError, Result};
pub use policy::{Policies, Rule, RuleDefinition, RuleSet, RuleSetBuilder};
