//! Rate limit policy rules, matching and reachability analysis.

mod attributes;
mod document;
mod pattern;
mod quota;
mod rule;
mod store;

pub use attributes::Attributes;
pub use document::{Policies, PolicyDocument, DEFAULT_DOMAIN};
pub use pattern::{compile_pattern, FieldMatcher, PrefixMatcher, WILDCARD};
pub use quota::{parse_credit_limit, parse_reset_seconds, Quota, RawCount};
pub use rule::{Rule, RuleDefinition, RuleSummary};
pub use store::{RuleSet, RuleSetBuilder};
