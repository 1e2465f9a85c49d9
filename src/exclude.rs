//! Exclusion rules for coverage listings
//!
//! Rules are authored per target in the repo configuration and are
//! immutable after resolution. Each rule is either a plain path fragment
//! (substring match) or, with the `re:` prefix, a regular expression.
//!
//! Matching happens against the de-flattened representation of a produced
//! listing: the reserved `#` delimiter substituted back to the platform
//! separator and the `^` up-marker back to `..`, so rules read like the
//! relative paths a user would write. Excluded listings stay on disk; they
//! are only dropped from the aggregator's declared input set.

use std::path::MAIN_SEPARATOR;

use regex_lite::Regex;

use crate::naming::{LISTING_SUFFIX, PATH_DELIMITER, UP_MARKER};

/// Prefix selecting regular-expression mode for a configured rule
pub const REGEX_RULE_PREFIX: &str = "re:";

/// Rule parse errors
#[derive(Debug, thiserror::Error)]
pub enum ExcludeError {
    #[error("invalid exclusion pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },
}

/// One user-supplied exclusion rule
#[derive(Debug, Clone)]
pub enum ExclusionRule {
    /// Plain path fragment, matched as a substring
    Fragment(String),
    /// Regular expression, matched anywhere in the path
    Pattern(Regex),
}

impl ExclusionRule {
    /// Parse a configured rule string; `re:` selects regex mode
    pub fn parse(raw: &str) -> Result<Self, ExcludeError> {
        match raw.strip_prefix(REGEX_RULE_PREFIX) {
            Some(pattern) => {
                let regex = Regex::new(pattern).map_err(|source| ExcludeError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
                Ok(Self::Pattern(regex))
            }
            None => Ok(Self::Fragment(raw.to_string())),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Fragment(fragment) => path.contains(fragment.as_str()),
            Self::Pattern(regex) => regex.is_match(path),
        }
    }

    /// The raw pattern text, for verbatim passthrough to the aggregator
    pub fn raw(&self) -> &str {
        match self {
            Self::Fragment(fragment) => fragment,
            Self::Pattern(regex) => regex.as_str(),
        }
    }
}

/// The resolved rule set for one target
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    rules: Vec<ExclusionRule>,
}

impl ExclusionRules {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the configured rule strings for a target
    pub fn parse(raw_rules: &[String]) -> Result<Self, ExcludeError> {
        let rules = raw_rules
            .iter()
            .map(|raw| ExclusionRule::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether a listing (by declared flattened name) is excluded
    pub fn is_excluded(&self, listing_name: &str) -> bool {
        let path = deflatten(listing_name);
        self.rules.iter().any(|rule| rule.matches(&path))
    }

    /// Raw pattern strings for the aggregator's native `--exclude` flags
    pub fn native_patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.raw())
    }
}

/// Reconstruct the relative path a flattened listing name encodes
fn deflatten(listing_name: &str) -> String {
    let stem = listing_name
        .strip_suffix(LISTING_SUFFIX)
        .unwrap_or(listing_name);

    stem.split(PATH_DELIMITER)
        .map(|part| if part == UP_MARKER { ".." } else { part })
        .collect::<Vec<_>>()
        .join(&MAIN_SEPARATOR.to_string())
}
