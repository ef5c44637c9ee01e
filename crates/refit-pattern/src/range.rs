//! Floating semantic-version ranges

use crate::error::PatternError;
use semver::{Version, VersionReq};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A floating semantic-version constraint from a `{v...}` placeholder.
///
/// Supported forms:
/// - `x` / `*` — any version (float on major)
/// - `1.x` — any `1.*` version (float on minor)
/// - `1.2.x` — any `1.2.*` version (float on patch)
/// - `1.2.3` — exactly that version
///
/// Exact forms are pinned with an `=` comparator so they never float the
/// way a bare semver requirement would. Pre-release versions only satisfy
/// an exact pre-release range, following semver crate semantics.
#[derive(Debug, Clone)]
pub struct FloatRange {
    raw: String,
    req: VersionReq,
}

impl FloatRange {
    /// Parse the range text from inside a `{v...}` tag
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PatternError::invalid_range(raw));
        }

        let req = if raw == "x" || raw == "*" {
            VersionReq::STAR
        } else if is_wildcard(raw) {
            VersionReq::parse(raw).map_err(|_| PatternError::invalid_range(raw))?
        } else if let Ok(version) = Version::parse(raw) {
            VersionReq::parse(&format!("={}", version))
                .map_err(|_| PatternError::invalid_range(raw))?
        } else {
            return Err(PatternError::invalid_range(raw));
        };

        Ok(Self {
            raw: raw.to_string(),
            req,
        })
    }

    /// Whether a concrete version satisfies this range
    pub fn matches(&self, version: &Version) -> bool {
        self.req.matches(version)
    }

    /// The range text as written in the template
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// `1.x`, `1.*`, `1.2.x`, `1.2.*` wildcard forms
fn is_wildcard(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return false;
    }
    let (last, leading) = parts.split_last().expect("parts is non-empty");
    (*last == "x" || *last == "*") && leading.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty())
}

impl PartialEq for FloatRange {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for FloatRange {}

impl Hash for FloatRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for FloatRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
