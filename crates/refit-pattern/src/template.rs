//! Template compilation and rendering

use crate::error::PatternError;
use crate::image::ImageRef;
use crate::range::FloatRange;
use crate::token::{scan_digest, scan_version};
use regex::Regex;
use semver::Version;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One segment of a compiled template.
///
/// A compiled template is an ordered sequence of parts; the end of the
/// sequence terminates the chain and contributes nothing when rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternPart {
    /// Fixed text, contributed verbatim on render
    Literal(String),
    /// Consumes one concrete version on render; constrains matches to a
    /// floating range
    Version(FloatRange),
    /// Substitutes a concrete content digest (or nothing) on render
    Digest,
}

/// A compiled image-reference template.
///
/// Compiled once at configuration-load time and immutable for the process
/// lifetime. Equality and hashing are structural over the part sequence,
/// which makes templates usable as cache keys.
#[derive(Debug)]
pub struct Template {
    raw: String,
    group: String,
    parts: Vec<PatternPart>,
    owner: String,
    name: String,
    /// Literal text between the repository's `:` and the first placeholder,
    /// e.g. the `v` in `myorg/app:v{v1.x}`. Registry tags start with it.
    tag_prefix: String,
}

impl Template {
    /// Compile a template string like `myorg/app:{v1.x}` or
    /// `myorg/app:{v1.x}@{digest}`.
    ///
    /// Placeholders are `{v<range>}` (version, see [`FloatRange`]) and
    /// `{digest}`; everything else is literal text. Malformed tags fail
    /// compilation, naming the offending substring and its byte position.
    pub fn compile(template: &str, group: &str) -> Result<Self, PatternError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = template;
        let mut consumed = 0usize;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let tag_start = consumed + open;
            let close = rest[open..]
                .find('}')
                .ok_or_else(|| PatternError::format(&rest[open..], tag_start))?;
            let tag = &rest[open + 1..open + close];

            if !literal.is_empty() {
                parts.push(PatternPart::Literal(std::mem::take(&mut literal)));
            }

            if tag == "digest" {
                parts.push(PatternPart::Digest);
            } else if let Some(range) = tag.strip_prefix('v') {
                let range = FloatRange::parse(range)
                    .map_err(|_| PatternError::format(&rest[open..=open + close], tag_start))?;
                parts.push(PatternPart::Version(range));
            } else {
                return Err(PatternError::format(&rest[open..=open + close], tag_start));
            }

            consumed += open + close + 1;
            rest = &rest[open + close + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(PatternPart::Literal(literal));
        }

        let (owner, name, tag_prefix) = extract_repository(template, &parts)?;

        Ok(Self {
            raw: template.to_string(),
            group: group.to_string(),
            parts,
            owner,
            name,
            tag_prefix,
        })
    }

    /// The template string as written in configuration
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The group label clustering this template's replacements
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The compiled part sequence
    pub fn parts(&self) -> &[PatternPart] {
        &self.parts
    }

    /// Repository owner implied by the leading literal
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name implied by the leading literal
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name` as used in registry API paths
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Number of version placeholders
    pub fn version_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, PatternPart::Version(_)))
            .count()
    }

    /// The floating ranges of the version placeholders, left to right
    pub fn ranges(&self) -> impl Iterator<Item = &FloatRange> {
        self.parts.iter().filter_map(|p| match p {
            PatternPart::Version(range) => Some(range),
            _ => None,
        })
    }

    /// Whether the template carries a digest placeholder
    pub fn has_digest(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, PatternPart::Digest))
    }

    /// Validate that an image can be rendered against this template
    /// without producing the text: the image must carry at least one
    /// version per version placeholder.
    pub fn ensure_renderable(&self, image: &ImageRef) -> Result<(), PatternError> {
        let expected = self.version_count();
        if image.versions.len() < expected {
            return Err(PatternError::VersionCount {
                expected,
                actual: image.versions.len(),
            });
        }
        Ok(())
    }

    /// Render the literal reference text for a concrete image.
    ///
    /// Walks the parts in order, consuming one version per version
    /// placeholder; a digest placeholder contributes the image's digest or
    /// nothing.
    pub fn render(&self, image: &ImageRef) -> Result<String, PatternError> {
        self.ensure_renderable(image)?;

        let mut out = String::new();
        let mut versions = image.versions.iter();
        for part in &self.parts {
            match part {
                PatternPart::Literal(text) => out.push_str(text),
                PatternPart::Version(_) => {
                    let version = versions.next().ok_or(PatternError::VersionCount {
                        expected: self.version_count(),
                        actual: image.versions.len(),
                    })?;
                    out.push_str(&version.to_string());
                }
                PatternPart::Digest => {
                    if let Some(digest) = &image.digest {
                        out.push_str(digest);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Bind a registry tag to this template, producing the image reference
    /// the tag denotes.
    ///
    /// The tag text is matched against the template's tag-side parts (the
    /// literal prefix after the repository's `:` plus every later part,
    /// with the trailing digest section set aside — digests are not part
    /// of tag text). Tags that do not fit the template's shape, including
    /// non-semver tags like `latest`, bind to nothing. A leading `v` on
    /// the tag is tolerated when the template itself does not spell one.
    pub fn bind_tag(&self, tag: &str) -> Option<ImageRef> {
        let tag_parts = self.tag_parts();

        let versions = match_parts(&tag_parts, tag)
            .or_else(|| tag.strip_prefix('v').and_then(|t| match_parts(&tag_parts, t)))?;

        Some(ImageRef::new(&self.owner, &self.name, versions, None))
    }

    /// The parts a registry tag is matched against: the post-`:` literal
    /// prefix plus every part after the leading literal, minus the
    /// trailing digest section (`@{digest}`).
    fn tag_parts(&self) -> Vec<PatternPart> {
        let mut parts: Vec<PatternPart> = Vec::with_capacity(self.parts.len());
        if !self.tag_prefix.is_empty() {
            parts.push(PatternPart::Literal(self.tag_prefix.clone()));
        }
        parts.extend(self.parts.iter().skip(1).cloned());

        if matches!(parts.last(), Some(PatternPart::Digest)) {
            parts.pop();
            if let Some(PatternPart::Literal(text)) = parts.last_mut() {
                if let Some(stripped) = text.strip_suffix('@') {
                    if stripped.is_empty() {
                        parts.pop();
                    } else {
                        *text = stripped.to_string();
                    }
                }
            }
        }
        parts
    }
}

/// Anchored match of a part sequence against the whole of `text`.
///
/// Version tokens are maximal-munch, exactly as the search tree consumes
/// them; digest parts accept a digest token or absence. Returns the
/// concrete versions bound left to right.
fn match_parts(parts: &[PatternPart], text: &str) -> Option<Vec<Version>> {
    fn recurse(parts: &[PatternPart], text: &str, offset: usize, versions: &mut Vec<Version>) -> bool {
        match parts.first() {
            None => offset == text.len(),
            Some(PatternPart::Literal(lit)) => {
                text[offset..].starts_with(lit.as_str())
                    && recurse(&parts[1..], text, offset + lit.len(), versions)
            }
            Some(PatternPart::Version(_)) => match scan_version(text, offset) {
                Some((version, len)) => {
                    versions.push(version);
                    if recurse(&parts[1..], text, offset + len, versions) {
                        true
                    } else {
                        versions.pop();
                        false
                    }
                }
                None => false,
            },
            Some(PatternPart::Digest) => {
                if let Some((_, len)) = scan_digest(text, offset) {
                    if recurse(&parts[1..], text, offset + len, versions) {
                        return true;
                    }
                }
                recurse(&parts[1..], text, offset, versions)
            }
        }
    }

    let mut versions = Vec::new();
    recurse(parts, text, 0, &mut versions).then_some(versions)
}

/// Pull `owner/name` out of the leading literal. The repository is the
/// last `owner/name:` occurrence before the first placeholder; the text
/// after its `:` is the tag prefix.
fn extract_repository(
    template: &str,
    parts: &[PatternPart],
) -> Result<(String, String, String), PatternError> {
    let leading = match parts.first() {
        Some(PatternPart::Literal(text)) => text.as_str(),
        _ => return Err(PatternError::missing_repository(template)),
    };

    let re = Regex::new(r"([A-Za-z0-9][A-Za-z0-9._-]*)/([A-Za-z0-9][A-Za-z0-9._-]*):")
        .expect("repository regex is valid");
    let captures = re
        .captures_iter(leading)
        .last()
        .ok_or_else(|| PatternError::missing_repository(template))?;

    let owner = captures[1].to_string();
    let name = captures[2].to_string();
    let end = captures.get(0).expect("whole match exists").end();
    let tag_prefix = leading[end..].to_string();

    Ok((owner, name, tag_prefix))
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for Template {}

impl Hash for Template {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
