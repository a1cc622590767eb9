//! Rule definitions, compiled rules and subsumption.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU64;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::attributes::Attributes;
use super::pattern::FieldMatcher;
use super::quota::{Quota, RawCount};
use crate::error::Result;

/// A rule as declared by a configuration author, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    /// Field name to author-written value (`*`, a glob, or an exact value)
    #[serde(rename = "match", deserialize_with = "deserialize_pattern")]
    pub pattern: BTreeMap<String, String>,
    /// Credits per window
    pub credit_limit: RawCount,
    /// Window length in seconds
    pub reset_seconds: RawCount,
    /// Request attribute identifying the limited actor; empty means one shared actor
    #[serde(default)]
    pub actor_field: String,
    /// Free text, ignored by matching
    #[serde(default)]
    pub comment: String,
}

impl RuleDefinition {
    /// Create a definition with a shared actor and no comment.
    pub fn new<I, K, V>(
        pattern: I,
        credit_limit: impl Into<RawCount>,
        reset_seconds: impl Into<RawCount>,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pattern: pattern
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            credit_limit: credit_limit.into(),
            reset_seconds: reset_seconds.into(),
            actor_field: String::new(),
            comment: String::new(),
        }
    }

    /// A definition with an empty pattern, matching every request.
    pub fn catch_all(credit_limit: impl Into<RawCount>, reset_seconds: impl Into<RawCount>) -> Self {
        Self::new(Vec::<(String, String)>::new(), credit_limit, reset_seconds)
    }

    /// Set the actor field.
    pub fn with_actor_field(mut self, actor_field: impl Into<String>) -> Self {
        self.actor_field = actor_field.into();
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// Pattern values may be written as bare YAML/JSON scalars (`true`, `443`).
///
/// Fractional numbers are rejected rather than reformatted, and a field that
/// appears twice in one `match` mapping is an error.
fn deserialize_pattern<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(PatternVisitor)
}

struct PatternVisitor;

impl<'de> Visitor<'de> for PatternVisitor {
    type Value = BTreeMap<String, String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of field names to values")
    }

    fn visit_map<M>(self, mut map: M) -> std::result::Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut pattern = BTreeMap::new();
        while let Some(field) = map.next_key::<String>()? {
            let PatternValue(value) = map.next_value()?;
            match pattern.entry(field) {
                Entry::Occupied(entry) => {
                    return Err(de::Error::custom(format!(
                        "duplicate field {:?} in match",
                        entry.key()
                    )));
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
        Ok(pattern)
    }
}

/// A single pattern value, kept as the text the author wrote.
struct PatternValue(String);

impl<'de> Deserialize<'de> for PatternValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(PatternValueVisitor)
    }
}

struct PatternValueVisitor;

impl<'de> Visitor<'de> for PatternValueVisitor {
    type Value = PatternValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, boolean or integer (quote fractional numbers)")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
        Ok(PatternValue(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Self::Value, E> {
        Ok(PatternValue(value))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Self::Value, E> {
        Ok(PatternValue(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Self::Value, E> {
        Ok(PatternValue(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Self::Value, E> {
        Ok(PatternValue(value.to_string()))
    }
}

/// A validated, compiled rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct Rule {
    operation: BTreeMap<String, String>,
    matchers: BTreeMap<String, FieldMatcher>,
    quota: Quota,
    actor_field: String,
    comment: String,
}

/// What a resolved rule reports to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    /// The rule's pattern as declared
    pub operation: BTreeMap<String, String>,
    /// Credits per window
    pub credit_limit: u64,
    /// Window length in seconds
    pub reset_seconds: u64,
    /// Request attribute identifying the limited actor
    pub actor_field: String,
    /// Author comment
    pub comment: String,
}

impl Rule {
    /// Validate quota values and compile field matchers.
    pub fn from_definition(definition: RuleDefinition) -> Result<Self> {
        let quota = Quota::parse(&definition.credit_limit, &definition.reset_seconds)?;

        let matchers = definition
            .pattern
            .iter()
            .map(|(field, value)| Ok((field.clone(), FieldMatcher::compile(value)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            operation: definition.pattern,
            matchers,
            quota,
            actor_field: definition.actor_field,
            comment: definition.comment,
        })
    }

    /// Whether every request matching `other` also matches `self`.
    ///
    /// `self` may not constrain a field that `other` leaves open, and each
    /// field `self` constrains must cover `other`'s matcher for that field.
    /// An empty pattern subsumes every rule.
    pub fn subsumes(&self, other: &Rule) -> bool {
        self.matchers.iter().all(|(field, matcher)| {
            other
                .matchers
                .get(field)
                .is_some_and(|theirs| matcher.covers(theirs))
        })
    }

    /// Whether a request matches every field of this rule.
    ///
    /// Missing attributes fail the match; attributes the rule does not name
    /// are ignored.
    pub fn matches<A: Attributes + ?Sized>(&self, attributes: &A) -> bool {
        self.matchers.iter().all(|(field, matcher)| {
            attributes
                .get(field)
                .is_some_and(|value| matcher.matches(value))
        })
    }

    /// The pattern as declared.
    pub fn operation(&self) -> &BTreeMap<String, String> {
        &self.operation
    }

    /// Compiled matcher for a field, if the rule constrains it.
    pub fn matcher(&self, field: &str) -> Option<&FieldMatcher> {
        self.matchers.get(field)
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    pub fn credit_limit(&self) -> NonZeroU64 {
        self.quota.credit_limit
    }

    pub fn reset_seconds(&self) -> NonZeroU64 {
        self.quota.reset_seconds
    }

    pub fn actor_field(&self) -> &str {
        &self.actor_field
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// The actor this request is counted against under this rule.
    ///
    /// `None` for the shared actor or when the request lacks the actor field.
    pub fn actor<'a, A: Attributes + ?Sized>(&self, attributes: &'a A) -> Option<&'a str> {
        if self.actor_field.is_empty() {
            return None;
        }
        attributes.get(&self.actor_field)
    }

    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            operation: self.operation.clone(),
            credit_limit: self.quota.credit_limit.get(),
            reset_seconds: self.quota.reset_seconds.get(),
            actor_field: self.actor_field.clone(),
            comment: self.comment.clone(),
        }
    }
}
