//! Policy documents and per-domain rule sets.
//!
//! A document lists rules in priority order. YAML and JSON accept two layouts:
//!
//! ```yaml
//! domain: api
//! rules:
//!   - match: { method: GET, path: /ping, ip: "*" }
//!     credit_limit: 10
//!     reset_seconds: 60
//!     actor_field: ip
//!   - match: {}
//!     credit_limit: 1
//!     reset_seconds: 60
//! ```
//!
//! or several domains at once under a top-level `domains` mapping, each with
//! its own `rules` list. INI documents hold a single domain with one section
//! per rule:
//!
//! ```ini
//! domain = api
//!
//! [anonymous ping]
//! method = GET
//! path = /ping
//! ip = *
//! creditLimit = 10
//! resetSeconds = 60
//! actorField = ip
//! ```

use ini::{Ini, Properties};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

use super::attributes::Attributes;
use super::quota::RawCount;
use super::rule::{Rule, RuleDefinition};
use super::store::{RuleSet, RuleSetBuilder};
use crate::error::{PolicyError, Result};

/// Domain used when a document does not name one.
pub const DEFAULT_DOMAIN: &str = "default";

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

/// The rules of a single domain, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// The domain name
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Rule definitions in priority order
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// Only used to tell the single-domain and multi-domain layouts apart.
#[derive(Deserialize)]
struct DocumentShape {
    #[serde(default)]
    domains: Option<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct DomainRules {
    #[serde(default)]
    rules: Vec<RuleDefinition>,
}

#[derive(Debug, Deserialize)]
struct MultiDomainDocument {
    domains: BTreeMap<String, DomainRules>,
}

impl MultiDomainDocument {
    fn into_documents(self) -> Vec<PolicyDocument> {
        self.domains
            .into_iter()
            .map(|(domain, body)| PolicyDocument {
                domain,
                rules: body.rules,
            })
            .collect()
    }
}

impl PolicyDocument {
    /// Parse a single-domain YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(parse_error)
    }

    /// Parse a single-domain JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(parse_error)
    }

    /// Parse a single-domain INI document.
    ///
    /// Every section is one rule, in file order. The keys `creditLimit`,
    /// `resetSeconds`, `actorField` and `comment` set the quota; any other key
    /// is a pattern field. A section with only quota keys is a catch-all. An
    /// optional `domain` key may precede the first section.
    pub fn from_ini(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text).map_err(parse_error)?;

        let mut document = PolicyDocument {
            domain: default_domain(),
            rules: Vec::new(),
        };
        for (section, properties) in ini.iter() {
            match section {
                None => {
                    for (key, value) in properties.iter() {
                        if key != "domain" {
                            return Err(PolicyError::Config(format!(
                                "Unexpected key {:?} outside a rule section",
                                key
                            )));
                        }
                        document.domain = value.to_string();
                    }
                }
                Some(name) => document.rules.push(ini_rule(name, properties)?),
            }
        }
        Ok(document)
    }

    /// Build the document's rule set, failing on the first rejected rule.
    pub fn into_rule_set(self) -> Result<RuleSet> {
        let mut builder = RuleSetBuilder::new();
        for (position, definition) in self.rules.into_iter().enumerate() {
            builder
                .add_rule(definition)
                .map_err(|e| PolicyError::InvalidRule {
                    domain: self.domain.clone(),
                    position,
                    source: Box::new(e),
                })?;
        }
        Ok(builder.build())
    }
}

fn parse_error(e: impl std::fmt::Display) -> PolicyError {
    PolicyError::Config(format!("Failed to parse policy document: {}", e))
}

fn ini_rule(section: &str, properties: &Properties) -> Result<RuleDefinition> {
    let mut pattern = BTreeMap::new();
    let mut credit_limit = None;
    let mut reset_seconds = None;
    let mut actor_field = None;
    let mut comment = None;

    for (key, value) in properties.iter() {
        let duplicate = match key {
            "creditLimit" => credit_limit.replace(RawCount::from(value)).is_some(),
            "resetSeconds" => reset_seconds.replace(RawCount::from(value)).is_some(),
            "actorField" => actor_field.replace(value.to_string()).is_some(),
            "comment" => comment.replace(value.to_string()).is_some(),
            field => pattern.insert(field.to_string(), value.to_string()).is_some(),
        };
        if duplicate {
            return Err(PolicyError::Config(format!(
                "Duplicate key {:?} in rule [{}]",
                key, section
            )));
        }
    }

    let missing = |key: &str| PolicyError::Config(format!("Rule [{}] is missing {}", section, key));
    let credit_limit = credit_limit.ok_or_else(|| missing("creditLimit"))?;
    let reset_seconds = reset_seconds.ok_or_else(|| missing("resetSeconds"))?;

    Ok(RuleDefinition::new(pattern, credit_limit, reset_seconds)
        .with_actor_field(actor_field.unwrap_or_default())
        .with_comment(comment.unwrap_or_default()))
}

/// Independent rule sets keyed by domain.
#[derive(Debug, Clone, Default)]
pub struct Policies {
    domains: HashMap<String, RuleSet>,
}

impl Policies {
    /// Create an empty set of policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every document's rule set. Each domain may appear only once.
    pub fn from_documents<I>(documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = PolicyDocument>,
    {
        let mut policies = Policies::new();
        for document in documents {
            let domain = document.domain.clone();
            if policies.domains.contains_key(&domain) {
                return Err(PolicyError::Config(format!("Duplicate domain: {}", domain)));
            }
            let rule_set = document.into_rule_set()?;
            info!(domain = %domain, rules = rule_set.len(), "Loaded policy domain");
            policies.domains.insert(domain, rule_set);
        }
        Ok(policies)
    }

    /// Load policies from a file: JSON for `.json`, INI for `.ini`, YAML otherwise.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit policies");

        let contents = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Self::from_json(&contents),
            Some("ini") => Self::from_ini(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Load policies from YAML, either a single domain or a `domains` mapping.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let shape: DocumentShape = serde_yaml::from_str(yaml).map_err(parse_error)?;

        let documents = if shape.domains.is_some() {
            serde_yaml::from_str::<MultiDomainDocument>(yaml).map(MultiDomainDocument::into_documents)
        } else {
            serde_yaml::from_str::<PolicyDocument>(yaml).map(|document| vec![document])
        }
        .map_err(parse_error)?;

        Self::from_documents(documents)
    }

    /// Load policies from JSON, either a single domain or a `domains` mapping.
    pub fn from_json(json: &str) -> Result<Self> {
        let shape: DocumentShape = serde_json::from_str(json).map_err(parse_error)?;

        let documents = if shape.domains.is_some() {
            serde_json::from_str::<MultiDomainDocument>(json).map(MultiDomainDocument::into_documents)
        } else {
            serde_json::from_str::<PolicyDocument>(json).map(|document| vec![document])
        }
        .map_err(parse_error)?;

        Self::from_documents(documents)
    }

    /// Load a single-domain INI document.
    pub fn from_ini(ini: &str) -> Result<Self> {
        Self::from_documents([PolicyDocument::from_ini(ini)?])
    }

    /// Add a prebuilt rule set, replacing any previous one for the domain.
    pub fn insert(&mut self, domain: impl Into<String>, rules: RuleSet) -> Option<RuleSet> {
        self.domains.insert(domain.into(), rules)
    }

    /// Get the rule set for a specific domain.
    pub fn get(&self, domain: &str) -> Option<&RuleSet> {
        self.domains.get(domain)
    }

    /// Domain names in sorted order.
    pub fn domains(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.domains.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Find the rule governing a request within a domain.
    pub fn resolve<A: Attributes + ?Sized>(&self, domain: &str, attributes: &A) -> Result<&Rule> {
        self.get(domain)
            .ok_or_else(|| PolicyError::UnknownDomain(domain.to_string()))?
            .resolve(attributes)
    }
}
