//! Glob compilation and per-field matchers.
//!
//! Rule patterns are written as plain strings. A value without `*` is matched
//! by string equality, a value containing `*` is compiled into a regex that is
//! anchored at the start only, and the bare `*` matches any value.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::Result;

/// The universal wildcard value.
pub const WILDCARD: &str = "*";

/// A compiled glob that tests whether a value starts with the glob's shape.
///
/// Equality compares the glob text the matcher was compiled from, never the
/// generated regex.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    glob: String,
    regex: Regex,
}

impl PrefixMatcher {
    /// The glob this matcher was compiled from.
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// The generated regex source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Test a candidate value.
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for PrefixMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.glob == other.glob
    }
}

impl Eq for PrefixMatcher {}

impl fmt::Display for PrefixMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.regex.as_str())
    }
}

/// Compile a glob into a start-anchored matcher.
///
/// Every regex-significant character is escaped and each `*` becomes "zero or
/// more arbitrary characters". Nothing anchors the end, so `pages/*` accepts
/// `pages/`, `pages/x` and `pages/x/y`.
pub fn compile_pattern(glob: &str) -> Result<PrefixMatcher> {
    let mut source = String::with_capacity(glob.len() + 8);
    source.push('^');
    for (i, literal) in glob.split('*').enumerate() {
        if i > 0 {
            source.push_str(".*");
        }
        source.push_str(&regex::escape(literal));
    }

    let regex = RegexBuilder::new(&source)
        .dot_matches_new_line(true)
        .build()?;

    Ok(PrefixMatcher {
        glob: glob.to_string(),
        regex,
    })
}

/// How a single rule field constrains the matching request attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatcher {
    /// `*`: any value, as long as the attribute is present
    Wildcard,
    /// Plain string equality
    Exact(String),
    /// Start-anchored glob
    Prefix(PrefixMatcher),
}

impl FieldMatcher {
    /// Build the matcher for an author-written field value.
    ///
    /// Only values containing `*` go through the glob compiler.
    pub fn compile(value: &str) -> Result<Self> {
        if value == WILDCARD {
            Ok(FieldMatcher::Wildcard)
        } else if value.contains('*') {
            Ok(FieldMatcher::Prefix(compile_pattern(value)?))
        } else {
            Ok(FieldMatcher::Exact(value.to_string()))
        }
    }

    /// Test a request attribute value.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            FieldMatcher::Wildcard => true,
            FieldMatcher::Exact(expected) => expected == value,
            FieldMatcher::Prefix(matcher) => matcher.is_match(value),
        }
    }

    /// Whether every value accepted by `other` is also accepted by `self`.
    ///
    /// Two different globs are never considered to cover each other, even when
    /// one literal prefix extends the other (`acc*` vs `account*`).
    pub fn covers(&self, other: &FieldMatcher) -> bool {
        match (self, other) {
            (FieldMatcher::Wildcard, _) => true,
            (FieldMatcher::Exact(a), FieldMatcher::Exact(b)) => a == b,
            (FieldMatcher::Exact(_), _) => false,
            (FieldMatcher::Prefix(matcher), FieldMatcher::Exact(value)) => matcher.is_match(value),
            (FieldMatcher::Prefix(a), FieldMatcher::Prefix(b)) => a == b,
            (FieldMatcher::Prefix(_), FieldMatcher::Wildcard) => false,
        }
    }

    /// The author-written value this matcher was built from.
    pub fn raw(&self) -> &str {
        match self {
            FieldMatcher::Wildcard => WILDCARD,
            FieldMatcher::Exact(value) => value,
            FieldMatcher::Prefix(matcher) => matcher.glob(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(glob: &str) -> String {
        compile_pattern(glob).unwrap().to_string()
    }

    #[test]
    fn test_simple_glob() {
        assert_eq!(source("pages/*"), "/^pages/.*/");
    }

    #[test]
    fn test_prefix_semantics() {
        let matcher = compile_pattern("pages/*").unwrap();
        assert!(matcher.is_match("pages/x"));
        assert!(matcher.is_match("pages/"));
        assert!(matcher.is_match("pages/anything/else"));
        assert!(!matcher.is_match("page"));
        assert!(!matcher.is_match("my/pages/x"));
    }

    #[test]
    fn test_glob_is_not_end_anchored() {
        let matcher = compile_pattern("a*b").unwrap();
        assert!(matcher.is_match("a--b"));
        assert!(matcher.is_match("ab-and-more"));
        assert!(!matcher.is_match("a--c"));
    }

    #[test]
    fn test_escapes_regex_characters() {
        assert_eq!(source("my-name-is-jim"), r"/^my\-name\-is\-jim/");
        assert_eq!(source("array[index]"), r"/^array\[index\]/");
        assert_eq!(source("struct{2}"), r"/^struct\{2\}/");
        assert_eq!(source("john(jacob)"), r"/^john\(jacob\)/");
        assert_eq!(source("me+you"), r"/^me\+you/");
        assert_eq!(source("ronburgundy?"), r"/^ronburgundy\?/");
        assert_eq!(source("slim.shady"), r"/^slim\.shady/");
        assert_eq!(source("10^20"), r"/^10\^20/");
        assert_eq!(source("$250"), r"/^\$250/");
        assert_eq!(source("wall|wall"), r"/^wall\|wall/");
        assert_eq!(source("# TODO"), r"/^\# TODO/");
    }

    #[test]
    fn test_escaped_characters_match_literally() {
        let matcher = compile_pattern("comma, splice").unwrap();
        assert!(matcher.is_match("comma, splice"));

        let matcher = compile_pattern("slim.shady*").unwrap();
        assert!(matcher.is_match("slim.shady!"));
        assert!(!matcher.is_match("slimXshady"));

        let matcher = compile_pattern("10^20").unwrap();
        assert!(matcher.is_match("10^20"));
    }

    #[test]
    fn test_bare_wildcard_glob_matches_everything() {
        let matcher = compile_pattern("*").unwrap();
        assert!(matcher.is_match(""));
        assert!(matcher.is_match("anything"));
        assert!(matcher.is_match("multi\nline"));
    }

    #[test]
    fn test_field_matcher_kinds() {
        assert_eq!(FieldMatcher::compile("*").unwrap(), FieldMatcher::Wildcard);
        assert_eq!(
            FieldMatcher::compile("pages").unwrap(),
            FieldMatcher::Exact("pages".to_string())
        );
        assert!(matches!(
            FieldMatcher::compile("pages/*").unwrap(),
            FieldMatcher::Prefix(_)
        ));
    }

    #[test]
    fn test_exact_field_uses_equality() {
        let matcher = FieldMatcher::compile("pages").unwrap();
        assert!(matcher.matches("pages"));
        assert!(!matcher.matches("pagesX"));
        assert!(!matcher.matches("page"));

        // Regex characters in an exact value are plain text
        let matcher = FieldMatcher::compile("a.c").unwrap();
        assert!(matcher.matches("a.c"));
        assert!(!matcher.matches("abc"));
    }

    #[test]
    fn test_raw_round_trips_author_value() {
        for value in ["*", "GET", "/account*"] {
            assert_eq!(FieldMatcher::compile(value).unwrap().raw(), value);
        }
    }

    #[test]
    fn test_covers() {
        let wildcard = FieldMatcher::compile("*").unwrap();
        let exact = FieldMatcher::compile("/accounts/logout").unwrap();
        let glob = FieldMatcher::compile("/account*").unwrap();

        assert!(wildcard.covers(&exact));
        assert!(wildcard.covers(&glob));
        assert!(wildcard.covers(&wildcard));

        assert!(exact.covers(&exact));
        assert!(!exact.covers(&FieldMatcher::Exact("/accounts".to_string())));
        assert!(!exact.covers(&glob));
        assert!(!exact.covers(&wildcard));

        assert!(glob.covers(&exact));
        assert!(glob.covers(&glob));
        assert!(!glob.covers(&FieldMatcher::Exact("/login".to_string())));
        assert!(!glob.covers(&wildcard));
    }

    #[test]
    fn test_overlapping_globs_do_not_cover() {
        let short = FieldMatcher::compile("acc*").unwrap();
        let long = FieldMatcher::compile("account*").unwrap();

        // Every value matching account* also matches acc*, but glob-to-glob
        // coverage is literal equality only.
        assert!(!short.covers(&long));
        assert!(!long.covers(&short));
    }
}
