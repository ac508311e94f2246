//! Scope parsing, normalization and matcher compilation.
//!
//! A scope is exactly three colon-separated domains. Each domain is one or
//! more dot-separated segments, and a segment is either a literal token
//! (letters, digits, `_`, `-`) or a run of `*` characters. `*` stands for
//! exactly one literal segment, `**` for zero or more; longer star runs are
//! accepted and canonicalized to `**`.

use crate::error::ScopeError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

static GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    let segment = r"(?:[A-Za-z0-9_-]+|\*+)";
    let domain = format!(r"{segment}(?:\.{segment})*");
    Regex::new(&format!("^{domain}:{domain}:{domain}$")).expect("scope grammar regex")
});

// Compiled matchers, keyed by normalized scope text. Matchers are reused
// heavily by collection simplification, so compile each one once.
static MATCHERS: Lazy<RwLock<HashMap<String, Regex>>> = Lazy::new(Default::default);

/// A validated, normalized scope string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scope(String);

impl Scope {
    /// Parse and normalize a scope string.
    pub fn parse(raw: &str) -> Result<Self, ScopeError> {
        if !Self::validate(raw) {
            return Err(ScopeError::Malformed(raw.to_string()));
        }
        Ok(Self(normalize(raw)))
    }

    /// True when the string matches the scope grammar, before normalization.
    pub fn validate(raw: &str) -> bool {
        GRAMMAR.is_match(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this scope contains no wildcard segments.
    pub fn is_literal(&self) -> bool {
        !self.0.contains('*')
    }

    /// The pattern compiled to a regex over scope text.
    ///
    /// Literal segments match themselves, `*` matches one literal segment or
    /// a lone `*`, and `**` matches any run of characters short of a domain
    /// boundary. `*` never matches a `**`, which keeps the textual dominance
    /// order antisymmetric: `**` dominates `*`, not the other way around.
    pub fn matcher(&self) -> Regex {
        if let Some(hit) = MATCHERS
            .read()
            .expect("scope matcher cache poisoned")
            .get(&self.0)
        {
            return hit.clone();
        }
        let compiled = Regex::new(&self.regex_source(false)).expect("scope matcher regex");
        MATCHERS
            .write()
            .expect("scope matcher cache poisoned")
            .insert(self.0.clone(), compiled.clone());
        compiled
    }

    /// True when `subject`'s text is matched by this pattern.
    pub fn allows(&self, subject: &Scope) -> bool {
        self.matcher().is_match(subject.as_str())
    }

    /// The unification variant of the matcher: every wildcard segment becomes
    /// a capturing group, and literal segments also accept a star run so that
    /// a wildcard on the other side does not mask them.
    pub(crate) fn unifier(&self) -> Regex {
        Regex::new(&self.regex_source(true)).expect("scope unifier regex")
    }

    fn regex_source(&self, unifying: bool) -> String {
        let mut out = String::from("^");
        for (di, domain) in self.0.split(':').enumerate() {
            if di > 0 {
                out.push(':');
            }
            for (si, segment) in domain.split('.').enumerate() {
                if si > 0 {
                    out.push_str(r"\.");
                }
                match segment {
                    "*" => out.push_str(if unifying {
                        "([^.:]*)"
                    } else {
                        r"(?:\*|[^.:*][^.:]*)"
                    }),
                    "**" => out.push_str(if unifying { "([^:]*)" } else { "[^:]*" }),
                    literal => {
                        if unifying {
                            out.push_str("(?:");
                            out.push_str(&regex::escape(literal));
                            out.push_str(r"|\*+)");
                        } else {
                            out.push_str(&regex::escape(literal));
                        }
                    }
                }
            }
        }
        out.push('$');
        out
    }
}

/// Canonicalize wildcard runs: star runs of two or more become `**`, and a
/// `*` segment immediately followed by a `**` collapses into the `**`
/// (applied until stable, so `*.*.**` ends up as `**`).
fn normalize(raw: &str) -> String {
    raw.split(':')
        .map(normalize_domain)
        .collect::<Vec<_>>()
        .join(":")
}

fn normalize_domain(domain: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in domain.split('.') {
        let segment = if segment.bytes().all(|b| b == b'*') {
            if segment.len() >= 2 {
                "**"
            } else {
                "*"
            }
        } else {
            segment
        };
        if segment == "**" {
            while out.last() == Some(&"*") {
                out.pop();
            }
            if out.last() == Some(&"**") {
                continue;
            }
        }
        out.push(segment);
    }
    out.join(".")
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Scope {
    type Error = ScopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.0
    }
}
