//! URL canonicalization to stable site identities.
//!
//! A raw tab URL is reduced to its host (without `www.`), optionally followed
//! by the path segments matched by a per-domain truncation pattern. Patterns
//! are `/`-separated literal segments or the wildcard `*`, and the first
//! pattern (in stored order) that matches wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ::url::Url;

use crate::prefs::{Preferences, PrefsError};

/// Preferences key holding the truncation rules.
pub const URL_TRUNCATION_KEY: &str = "url_truncation";

const WILDCARD: &str = "*";

/// Per-domain truncation patterns, keyed by base domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TruncationRules(BTreeMap<String, Vec<String>>);

impl TruncationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads rules from the preferences document; a missing key yields no rules.
    pub fn from_preferences(prefs: &Preferences) -> Result<Self, PrefsError> {
        Ok(prefs.get(URL_TRUNCATION_KEY)?.unwrap_or_default())
    }

    /// Patterns registered for a domain, in match order.
    pub fn patterns(&self, domain: &str) -> Option<&[String]> {
        self.0.get(domain).map(Vec::as_slice)
    }
}

impl<D, P> FromIterator<(D, Vec<P>)> for TruncationRules
where
    D: Into<String>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (D, Vec<P>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(domain, patterns)| {
                    (domain.into(), patterns.into_iter().map(Into::into).collect())
                })
                .collect(),
        )
    }
}

/// Canonicalizes URLs using a fixed rule set.
#[derive(Debug, Clone, Default)]
pub struct UrlNormalizer {
    rules: TruncationRules,
}

impl UrlNormalizer {
    pub const fn new(rules: TruncationRules) -> Self {
        Self { rules }
    }

    /// Reduces a raw URL to its site identity.
    ///
    /// Empty input stays empty. Input that cannot be parsed is returned
    /// unchanged.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        let parsed = if raw.contains("://") {
            Url::parse(raw)
        } else {
            Url::parse(&format!("http://{raw}"))
        };
        let Ok(parsed) = parsed else {
            return raw.to_string();
        };

        let host = host_with_port(&parsed);
        let host = host.strip_prefix("www.").unwrap_or(&host);

        if let Some(patterns) = self.rules.patterns(host) {
            let path = path_segments(parsed.path());
            for pattern in patterns {
                if let Some(matched) = match_pattern(pattern, &path) {
                    if matched.is_empty() {
                        return host.to_string();
                    }
                    return format!("{host}/{}", matched.join("/"));
                }
            }
        }

        host.to_string()
    }
}

fn host_with_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn path_segments(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// Matches a pattern against path segments, returning the matched prefix.
///
/// Every pattern segment must line up with a path segment; trailing path
/// segments beyond the pattern are not allowed.
fn match_pattern<'a>(pattern: &str, path: &[&'a str]) -> Option<Vec<&'a str>> {
    let pattern = path_segments(pattern);
    if pattern.len() != path.len() {
        return None;
    }

    pattern
        .iter()
        .zip(path)
        .map(|(expected, actual)| (*expected == WILDCARD || expected == actual).then_some(*actual))
        .collect()
}
