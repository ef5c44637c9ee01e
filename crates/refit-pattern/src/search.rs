//! Trie-based matching of compiled templates against text

use crate::image::ImageRef;
use crate::range::FloatRange;
use crate::template::{PatternPart, Template};
use crate::token::{scan_digest, scan_version};
use semver::Version;
use std::collections::HashMap;
use std::sync::Arc;

/// One recognized image reference in a span of text
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// The template that matched
    pub pattern: Arc<Template>,
    /// The concrete reference extracted from the text
    pub image: ImageRef,
    /// Byte offset of the match start
    pub start: usize,
    /// Byte offset one past the match end
    pub end: usize,
}

/// A trie over every registered template's literal characters, branching
/// at placeholder boundaries.
///
/// A line of text is scanned once against all templates simultaneously
/// instead of once per template. When several templates match at the same
/// position, the longest match wins, then the match with the most literal
/// characters (concrete text outranks placeholders), then the template
/// registered first.
#[derive(Debug, Default)]
pub struct SearchTree {
    root: Node,
    inserted: usize,
}

#[derive(Debug, Default)]
struct Node {
    /// Next-literal-character edges
    children: HashMap<char, Node>,
    /// Version-placeholder edges, one per distinct range
    versions: Vec<(FloatRange, Node)>,
    /// Digest-placeholder edge
    digest: Option<Box<Node>>,
    /// A template terminates at this node
    terminal: Option<Terminal>,
}

#[derive(Debug)]
struct Terminal {
    pattern: Arc<Template>,
    order: usize,
}

struct Candidate {
    pattern: Arc<Template>,
    versions: Vec<Version>,
    digest: Option<String>,
    end: usize,
    literals: usize,
    order: usize,
}

impl Candidate {
    /// Longest match, then most literal characters, then registration order
    fn beats(&self, other: &Candidate) -> bool {
        (self.end, self.literals, std::cmp::Reverse(self.order))
            > (other.end, other.literals, std::cmp::Reverse(other.order))
    }
}

impl SearchTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered templates
    pub fn len(&self) -> usize {
        self.inserted
    }

    /// Whether no template has been registered
    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    /// Register a compiled template. When two templates share the same
    /// part structure, the first registration owns the terminal.
    pub fn insert(&mut self, pattern: Arc<Template>) {
        let mut node = &mut self.root;
        for part in pattern.parts() {
            match part {
                PatternPart::Literal(text) => {
                    for c in text.chars() {
                        node = node.children.entry(c).or_default();
                    }
                }
                PatternPart::Version(range) => {
                    let idx = match node.versions.iter().position(|(r, _)| r == range) {
                        Some(idx) => idx,
                        None => {
                            node.versions.push((range.clone(), Node::default()));
                            node.versions.len() - 1
                        }
                    };
                    node = &mut node.versions[idx].1;
                }
                PatternPart::Digest => {
                    node = node.digest.get_or_insert_with(Box::default);
                }
            }
        }
        if node.terminal.is_none() {
            node.terminal = Some(Terminal {
                pattern,
                order: self.inserted,
            });
        }
        self.inserted += 1;
    }

    /// Find the first match at or after `from` (a char boundary), never
    /// crossing the end of `text`. Returns the bound reference and the
    /// match span; `None` when no template matches anywhere in the rest
    /// of the text.
    pub fn search(&self, text: &str, from: usize) -> Option<PatternMatch> {
        let mut idx = from;
        while idx < text.len() {
            if let Some(found) = self.match_at(text, idx) {
                return Some(found);
            }
            idx += text[idx..].chars().next().map_or(1, char::len_utf8);
        }
        None
    }

    /// Try every template at exactly `start`, returning the best match
    fn match_at(&self, text: &str, start: usize) -> Option<PatternMatch> {
        let mut best: Option<Candidate> = None;
        let mut versions = Vec::new();
        descend(&self.root, text, start, 0, &mut versions, None, &mut best);

        best.map(|c| PatternMatch {
            image: ImageRef::new(c.pattern.owner(), c.pattern.name(), c.versions, c.digest),
            pattern: c.pattern,
            start,
            end: c.end,
        })
    }
}

fn descend(
    node: &Node,
    text: &str,
    offset: usize,
    literals: usize,
    versions: &mut Vec<Version>,
    digest: Option<String>,
    best: &mut Option<Candidate>,
) {
    if let Some(terminal) = &node.terminal {
        let candidate = Candidate {
            pattern: terminal.pattern.clone(),
            versions: versions.clone(),
            digest: digest.clone(),
            end: offset,
            literals,
            order: terminal.order,
        };
        if best.as_ref().is_none_or(|b| candidate.beats(b)) {
            *best = Some(candidate);
        }
    }

    if let Some(c) = text[offset..].chars().next() {
        if let Some(child) = node.children.get(&c) {
            descend(
                child,
                text,
                offset + c.len_utf8(),
                literals + 1,
                versions,
                digest.clone(),
                best,
            );
        }
    }

    if !node.versions.is_empty() {
        if let Some((version, len)) = scan_version(text, offset) {
            for (range, child) in &node.versions {
                // A range rejection is a plain no-match for that edge
                if range.matches(&version) {
                    versions.push(version.clone());
                    descend(
                        child,
                        text,
                        offset + len,
                        literals,
                        versions,
                        digest.clone(),
                        best,
                    );
                    versions.pop();
                }
            }
        }
    }

    if let Some(child) = &node.digest {
        if let Some((token, len)) = scan_digest(text, offset) {
            descend(
                child,
                text,
                offset + len,
                literals,
                versions,
                Some(token),
                best,
            );
        }
        // Absence is accepted: an empty digest binds
        descend(child, text, offset, literals, versions, digest, best);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(templates: &[&str]) -> SearchTree {
        let mut tree = SearchTree::new();
        for raw in templates {
            tree.insert(Arc::new(Template::compile(raw, "g").unwrap()));
        }
        tree
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_match_with_offsets() {
        let tree = tree(&["myorg/app:{v1.x}"]);
        let text = "image: myorg/app:1.2.0";

        let m = tree.search(text, 0).unwrap();
        assert_eq!(m.start, 7);
        assert_eq!(m.end, text.len());
        assert_eq!(&text[m.start..m.end], "myorg/app:1.2.0");
        assert_eq!(m.image.versions, vec![v("1.2.0")]);
        assert_eq!(m.image.owner, "myorg");
        assert_eq!(m.image.digest, None);
    }

    #[test]
    fn test_no_match_in_unrelated_text() {
        let tree = tree(&["myorg/app:{v1.x}"]);
        assert!(tree.search("nothing to see here", 0).is_none());
        assert!(tree.search("myorg/app:latest", 0).is_none());
    }

    #[test]
    fn test_out_of_range_version_is_not_a_match() {
        let tree = tree(&["myorg/app:{v1.x}"]);
        assert!(tree.search("image: myorg/app:2.0.0", 0).is_none());
    }

    #[test]
    fn test_multiple_occurrences_resume_from_end() {
        let tree = tree(&["myorg/app:{vx}"]);
        let text = "myorg/app:1.0.0 and myorg/app:2.0.0";

        let first = tree.search(text, 0).unwrap();
        assert_eq!(first.start, 0);
        assert_eq!(first.image.versions, vec![v("1.0.0")]);

        let second = tree.search(text, first.end).unwrap();
        assert_eq!(second.start, 20);
        assert_eq!(second.image.versions, vec![v("2.0.0")]);

        assert!(tree.search(text, second.end).is_none());
    }

    #[test]
    fn test_all_templates_tested_in_one_scan() {
        let tree = tree(&["myorg/app:{v1.x}", "myorg/tool:{vx}", "other/thing:{vx}"]);

        let m = tree.search("x myorg/tool:4.5.6 x", 0).unwrap();
        assert_eq!(m.pattern.name(), "tool");
        assert_eq!(m.image.versions, vec![v("4.5.6")]);
    }

    #[test]
    fn test_digest_template_matches_digest() {
        let tree = tree(&["myorg/app:{v1.x}@{digest}"]);
        let digest = format!("sha256:{}", "0f".repeat(32));
        let text = format!("myorg/app:1.2.0@{}", digest);

        let m = tree.search(&text, 0).unwrap();
        assert_eq!(m.end, text.len());
        assert_eq!(m.image.digest.as_deref(), Some(digest.as_str()));
    }

    #[test]
    fn test_longer_match_wins() {
        let tree = tree(&["myorg/app:{vx}", "myorg/app:{vx}@{digest}"]);
        let digest = format!("sha256:{}", "0f".repeat(32));
        let text = format!("myorg/app:1.2.0@{}", digest);

        let m = tree.search(&text, 0).unwrap();
        assert!(m.pattern.has_digest());
        assert_eq!(m.end, text.len());

        // Without a digest in the text, the shorter template matches
        let m = tree.search("myorg/app:1.2.0 rest", 0).unwrap();
        assert!(!m.pattern.has_digest());
        assert_eq!(m.end, 15);
    }

    #[test]
    fn test_concrete_literal_outranks_placeholder() {
        let mut tree = SearchTree::new();
        tree.insert(Arc::new(Template::compile("myorg/app:{vx}", "float").unwrap()));
        tree.insert(Arc::new(
            Template::compile("myorg/app:1.2.3", "pinned").unwrap(),
        ));

        let m = tree.search("myorg/app:1.2.3", 0).unwrap();
        assert_eq!(m.pattern.group(), "pinned");
        assert!(m.image.versions.is_empty());

        // A different concrete version falls back to the placeholder
        let m = tree.search("myorg/app:9.9.9", 0).unwrap();
        assert_eq!(m.pattern.group(), "float");
    }

    #[test]
    fn test_first_registered_wins_ties() {
        let mut tree = SearchTree::new();
        tree.insert(Arc::new(Template::compile("myorg/app:{vx}", "first").unwrap()));
        tree.insert(Arc::new(
            Template::compile("myorg/app:{v*}", "second").unwrap(),
        ));

        let m = tree.search("myorg/app:1.0.0", 0).unwrap();
        assert_eq!(m.pattern.group(), "first");
    }

    #[test]
    fn test_never_crosses_given_bounds() {
        let tree = tree(&["myorg/app:{vx}"]);
        // Scanning one line at a time means a reference split across
        // lines is simply not found.
        assert!(tree.search("myorg/app:", 0).is_none());
    }
}
