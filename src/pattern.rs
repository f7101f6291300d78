//! Identifier patterns.
//!
//! Rules select items by identifier using a tiny glob language: `*` matches
//! any run of characters (including `/`), everything else is literal. A
//! pattern is compiled into an anchored regular expression where each `*`
//! becomes its own lazy capture group:
//!
//! ```text
//! foo              →  ^foo$
//! foo/*/bar        →  ^foo/(.*?)/bar$
//! foo/*/bar/*/qux  →  ^foo/(.*?)/bar/(.*?)/qux$
//! *                →  ^(.*?)$
//! ```
//!
//! The whole identifier must match. Because of the end anchor a lazy group
//! still grows as far as it has to, so `foo/*/bar` accepts `foo/a/b/bar`
//! (capturing `a/b`) but rejects `foo/bar`.
//!
//! A pattern too large for the regex engine's size limit is matched by
//! scanning for its literal pieces instead, with the same results.

use regex::Regex;
use std::fmt;

/// A compiled identifier pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex_source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    /// The text between wildcards, in order.
    Literals(Vec<String>),
}

impl Pattern {
    /// Compile a pattern. Never fails: characters other than `*` are escaped,
    /// so anything that is not a wildcard is matched literally.
    pub fn compile(pattern: &str) -> Self {
        let regex_source = regex_source(pattern);
        match Regex::new(&regex_source) {
            Ok(regex) => Self {
                source: pattern.to_string(),
                regex_source,
                matcher: Matcher::Regex(regex),
            },
            Err(_) => Self::literal_scan(pattern),
        }
    }

    fn literal_scan(pattern: &str) -> Self {
        Self {
            source: pattern.to_string(),
            regex_source: regex_source(pattern),
            matcher: Matcher::Literals(pattern.split('*').map(str::to_string).collect()),
        }
    }

    pub fn is_match(&self, identifier: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(regex) => regex.is_match(identifier),
            Matcher::Literals(literals) => scan_literals(literals, identifier).is_some(),
        }
    }

    /// Text captured by each wildcard, left to right, or `None` when the
    /// identifier does not match.
    pub fn captures(&self, identifier: &str) -> Option<Vec<String>> {
        match &self.matcher {
            Matcher::Regex(regex) => {
                let caps = regex.captures(identifier)?;
                Some(
                    caps.iter()
                        .skip(1)
                        .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                        .collect(),
                )
            }
            Matcher::Literals(literals) => scan_literals(literals, identifier),
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The regular expression the pattern compiles to.
    pub fn regex_str(&self) -> &str {
        &self.regex_source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn regex_source(pattern: &str) -> String {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("(.*?)");
    format!("(?s)^{body}$")
}

/// Match `identifier` against the literal pieces of a pattern. The first
/// piece anchors the start, the last anchors the end, and each piece in
/// between is taken at its leftmost occurrence so every wildcard stays as
/// short as the anchors allow.
fn scan_literals(literals: &[String], identifier: &str) -> Option<Vec<String>> {
    let (first, rest) = literals.split_first()?;
    let remaining = identifier.strip_prefix(first.as_str())?;
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty().then(Vec::new);
    };
    let mut body = remaining.strip_suffix(last.as_str())?;

    let mut captures = Vec::with_capacity(rest.len());
    for literal in middle {
        let at = body.find(literal.as_str())?;
        captures.push(body[..at].to_string());
        body = &body[at + literal.len()..];
    }
    captures.push(body.to_string());
    Some(captures)
}
