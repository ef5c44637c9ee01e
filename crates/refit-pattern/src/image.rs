//! Concrete image references and their template bindings

use crate::error::PatternError;
use crate::template::Template;
use semver::Version;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A concrete image reference: owner, repository name, the versions bound
/// to each version placeholder (left to right), and an optional content
/// digest.
///
/// Created either from a registry tag ([`Template::bind_tag`]) or by the
/// search tree while scanning text. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    /// Repository owner (e.g. `myorg`)
    pub owner: String,
    /// Repository name (e.g. `app`)
    pub name: String,
    /// Concrete versions, one per version placeholder
    pub versions: Vec<Version>,
    /// Content digest (`sha256:...`), when known
    pub digest: Option<String>,
}

impl ImageRef {
    /// Create a new image reference
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        versions: Vec<Version>,
        digest: Option<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            versions,
            digest,
        }
    }

    /// `owner/name` as used in registry API paths
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// A copy of this reference carrying the given digest
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }
}

/// A template paired with a concrete image reference.
///
/// Construction validates that the image carries exactly as many versions
/// as the template has version placeholders; a mismatch is an internal
/// invariant violation, not operator input. Rendering the binding
/// produces the literal reference text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundImage {
    pattern: Arc<Template>,
    image: ImageRef,
}

impl BoundImage {
    /// Bind an image to the template that produced it (or that it will be
    /// rendered against).
    pub fn new(pattern: Arc<Template>, image: ImageRef) -> Result<Self, PatternError> {
        let expected = pattern.version_count();
        if image.versions.len() != expected {
            return Err(PatternError::VersionCount {
                expected,
                actual: image.versions.len(),
            });
        }
        Ok(Self { pattern, image })
    }

    /// The template side of the binding
    pub fn pattern(&self) -> &Arc<Template> {
        &self.pattern
    }

    /// The concrete image side of the binding
    pub fn image(&self) -> &ImageRef {
        &self.image
    }
}

impl fmt::Display for BoundImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Construction guaranteed the version count, so rendering cannot
        // fail on a live binding.
        match self.pattern.render(&self.image) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}
