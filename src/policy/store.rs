//! Ordered rule storage and first-match resolution.
//!
//! Rules are registered through a [`RuleSetBuilder`] and frozen into a
//! [`RuleSet`] before serving. Declaration order is matching priority: the
//! first rule whose pattern matches a request governs it. The builder rejects
//! any rule that an earlier rule already subsumes, since such a rule could
//! never be selected.

use tracing::{debug, info, trace, warn};

use super::attributes::Attributes;
use super::rule::{Rule, RuleDefinition};
use crate::error::{PolicyError, Result};

/// Mutable, append-only rule list used during the build phase.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<Rule>,
}

impl RuleSetBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a definition and append it as the lowest-priority rule.
    ///
    /// Fails with `InvalidCreditLimit` or `InvalidResetSeconds` for bad quota
    /// values and with `UnreachableRule` when an earlier rule subsumes the new
    /// one. The builder is unchanged on failure. Returns the index of the
    /// appended rule.
    pub fn add_rule(&mut self, definition: RuleDefinition) -> Result<usize> {
        let candidate = Rule::from_definition(definition)?;

        if let Some((earlier, existing)) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, existing)| existing.subsumes(&candidate))
        {
            warn!(
                pattern = ?candidate.operation(),
                earlier,
                earlier_pattern = ?existing.operation(),
                "Rejecting unreachable rule"
            );
            return Err(PolicyError::UnreachableRule {
                pattern: candidate.operation().clone(),
                earlier,
                earlier_pattern: existing.operation().clone(),
            });
        }

        let index = self.rules.len();
        debug!(
            index,
            pattern = ?candidate.operation(),
            credit_limit = candidate.credit_limit().get(),
            reset_seconds = candidate.reset_seconds().get(),
            actor_field = candidate.actor_field(),
            "Rule added"
        );
        self.rules.push(candidate);
        Ok(index)
    }

    /// Number of rules accepted so far.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Freeze the rules for serving.
    pub fn build(self) -> RuleSet {
        info!(rules = self.rules.len(), "Rule set built");
        RuleSet { rules: self.rules }
    }
}

/// An immutable, ordered rule list.
///
/// There is no way to change a `RuleSet` after it is built, so it can be
/// shared behind an `Arc` by any number of concurrent resolvers. Replacing a
/// configuration means building a new `RuleSet` and swapping the handle.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set from definitions in declaration order.
    ///
    /// Stops at the first rejected definition.
    pub fn from_definitions<I>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = RuleDefinition>,
    {
        let mut builder = RuleSetBuilder::new();
        for definition in definitions {
            builder.add_rule(definition)?;
        }
        Ok(builder.build())
    }

    /// Find the first rule whose every field matches the request.
    pub fn resolve<A: Attributes + ?Sized>(&self, attributes: &A) -> Result<&Rule> {
        match self.position(attributes) {
            Some(index) => {
                let rule = &self.rules[index];
                trace!(index, operation = ?rule.operation(), "Resolved rule");
                Ok(rule)
            }
            None => {
                trace!("No rule matched request");
                Err(PolicyError::NoMatchingRule)
            }
        }
    }

    /// Index of the rule that governs the request.
    pub fn position<A: Attributes + ?Sized>(&self, attributes: &A) -> Option<usize> {
        self.rules.iter().position(|rule| rule.matches(attributes))
    }

    /// Rules in priority order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
