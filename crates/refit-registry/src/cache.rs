//! The version cache: per-pattern registry state and upgrade queries

use crate::client::RegistryClient;
use anyhow::Result;
use refit_core::CancelToken;
use refit_pattern::{BoundImage, FloatRange, ImageRef, Template};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};

/// Result of a cache refresh. Failures are per repository; one
/// repository's failure never aborts the others.
#[derive(Debug, Default)]
pub struct UpdateOutcome {
    /// Number of pattern entry sets refreshed
    pub refreshed: usize,
    /// `(repository, error)` pairs for repositories that could not be
    /// fetched
    pub failures: Vec<(String, String)>,
}

impl UpdateOutcome {
    /// Whether every repository was fetched successfully
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-pattern store of the registry's known tags, answering "best
/// available upgrade" queries.
///
/// Entry sets are snapshots behind `Arc`s: a merge builds the new map
/// aside and swaps it in whole, so concurrent readers never observe a
/// partially merged entry set. Entries are created lazily on first
/// update, merged additively with the tag text as dedup key, and live for
/// the process lifetime.
#[derive(Debug, Default)]
pub struct VersionCache {
    entries: RwLock<HashMap<Arc<Template>, Arc<HashMap<String, ImageRef>>>>,
}

impl VersionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the entry sets for a set of patterns.
    ///
    /// Each distinct repository implied by the patterns is fetched once;
    /// every tag that binds to a pattern becomes an entry, with the
    /// per-tag digest resolved when the pattern carries a digest
    /// placeholder. Fetching is idempotent and additive: known tags are
    /// overwritten, not duplicated.
    pub async fn update(
        &self,
        client: &RegistryClient,
        patterns: &[Arc<Template>],
        cancel: &CancelToken,
    ) -> Result<UpdateOutcome> {
        let mut by_repository: BTreeMap<String, Vec<Arc<Template>>> = BTreeMap::new();
        for pattern in patterns {
            by_repository
                .entry(pattern.repository())
                .or_default()
                .push(pattern.clone());
        }

        let mut outcome = UpdateOutcome::default();
        for (repository, patterns) in by_repository {
            cancel.check()?;

            debug!("Refreshing tag list for {}", repository);
            let tags = match client.list_tags(&repository).await {
                Ok(tags) => tags,
                Err(e) => {
                    warn!("Failed to refresh {}: {:#}", repository, e);
                    outcome.failures.push((repository.clone(), format!("{:#}", e)));
                    continue;
                }
            };
            trace!("{}: {} tags", repository, tags.len());

            for pattern in patterns {
                let mut additions = Vec::new();
                for tag in &tags {
                    cancel.check()?;
                    let Some(image) = pattern.bind_tag(tag) else {
                        continue;
                    };
                    let image = if pattern.has_digest() {
                        match client.resolve_digest(&repository, tag).await {
                            Ok(digest) => image.with_digest(digest),
                            Err(e) => {
                                warn!("Skipping {}:{}: {:#}", repository, tag, e);
                                continue;
                            }
                        }
                    } else {
                        image
                    };
                    additions.push((tag.clone(), image));
                }

                trace!(
                    "{}: {} tag(s) bound for pattern {}",
                    repository,
                    additions.len(),
                    pattern.raw()
                );
                self.merge(&pattern, additions);
                outcome.refreshed += 1;
            }
        }

        Ok(outcome)
    }

    /// Merge entries into a pattern's set, atomically replacing the
    /// published snapshot. Tag text is the dedup key.
    pub fn merge(
        &self,
        pattern: &Arc<Template>,
        additions: impl IntoIterator<Item = (String, ImageRef)>,
    ) {
        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .entry(pattern.clone())
            .or_insert_with(|| Arc::new(HashMap::new()));

        let mut next = (**entry).clone();
        for (tag, image) in additions {
            next.insert(tag, image);
        }
        *entry = Arc::new(next);
    }

    /// Number of entries stored for a pattern
    pub fn entry_count(&self, pattern: &Arc<Template>) -> usize {
        self.entries
            .read()
            .unwrap()
            .get(pattern)
            .map_or(0, |e| e.len())
    }

    /// The best available upgrade for an already-matched reference.
    ///
    /// Picks the stored entry with the greatest version ordering among
    /// those whose owner/name match and whose versions satisfy the
    /// pattern's floating ranges. Returns `None` when the cache holds
    /// nothing for the pattern or the best entry is not strictly newer
    /// than the bound reference — no gratuitous "upgrade" to an equal or
    /// older version.
    pub fn fetch_latest(&self, bound: &BoundImage) -> Option<ImageRef> {
        let pattern = bound.pattern();
        let snapshot = self.entries.read().unwrap().get(pattern).cloned()?;

        let current = bound.image();
        let ranges: Vec<&FloatRange> = pattern.ranges().collect();

        let best = snapshot
            .values()
            .filter(|candidate| {
                candidate.owner == current.owner && candidate.name == current.name
            })
            .filter(|candidate| candidate.versions.len() == ranges.len())
            .filter(|candidate| {
                candidate
                    .versions
                    .iter()
                    .zip(&ranges)
                    .all(|(version, range)| range.matches(version))
            })
            .max_by(|a, b| a.versions.cmp(&b.versions))?;

        (best.versions > current.versions).then(|| best.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    fn pattern(raw: &str) -> Arc<Template> {
        Arc::new(Template::compile(raw, "g").unwrap())
    }

    fn seed(cache: &VersionCache, pattern: &Arc<Template>, tags: &[&str]) {
        let additions: Vec<(String, ImageRef)> = tags
            .iter()
            .map(|tag| {
                (
                    tag.to_string(),
                    pattern.bind_tag(tag).expect("seed tag must bind"),
                )
            })
            .collect();
        cache.merge(pattern, additions);
    }

    fn bound(pattern: &Arc<Template>, version: &str) -> BoundImage {
        let image = ImageRef::new(
            pattern.owner(),
            pattern.name(),
            vec![Version::parse(version).unwrap()],
            None,
        );
        BoundImage::new(pattern.clone(), image).unwrap()
    }

    #[test]
    fn test_fetch_latest_respects_the_floating_range() {
        let p = pattern("myorg/app:{v1.x}");
        let cache = VersionCache::new();
        seed(&cache, &p, &["1.2.0", "1.9.9", "2.0.0"]);

        let latest = cache.fetch_latest(&bound(&p, "1.2.0")).unwrap();
        assert_eq!(latest.versions[0].to_string(), "1.9.9");
    }

    #[test]
    fn test_fetch_latest_requires_a_strict_upgrade() {
        let p = pattern("myorg/app:{v1.x}");
        let cache = VersionCache::new();
        seed(&cache, &p, &["1.0.0"]);

        assert!(cache.fetch_latest(&bound(&p, "1.0.0")).is_none());
        assert!(cache.fetch_latest(&bound(&p, "1.5.0")).is_none());
    }

    #[test]
    fn test_fetch_latest_on_an_empty_cache() {
        let p = pattern("myorg/app:{v1.x}");
        let cache = VersionCache::new();
        assert!(cache.fetch_latest(&bound(&p, "1.0.0")).is_none());
    }

    #[test]
    fn test_merge_overwrites_by_tag_identity() {
        let p = pattern("myorg/app:{v1.x}");
        let cache = VersionCache::new();
        seed(&cache, &p, &["1.2.0"]);
        seed(&cache, &p, &["1.2.0", "1.3.0"]);

        assert_eq!(cache.entry_count(&p), 2);
    }

    #[test]
    fn test_patterns_with_equal_structure_share_entries() {
        // Structural equality makes the pattern a usable cache key: the
        // same template compiled twice reads the same entry set.
        let a = pattern("myorg/app:{v1.x}");
        let b = pattern("myorg/app:{v1.x}");
        let cache = VersionCache::new();
        seed(&cache, &a, &["1.2.0", "1.3.0"]);

        assert_eq!(cache.entry_count(&b), 2);
        let latest = cache.fetch_latest(&bound(&b, "1.2.0")).unwrap();
        assert_eq!(latest.versions[0].to_string(), "1.3.0");
    }

    #[test]
    fn test_prerelease_entries_do_not_float() {
        let p = pattern("myorg/app:{v1.x}");
        let cache = VersionCache::new();
        seed(&cache, &p, &["1.2.0", "1.3.0-rc.1"]);

        let latest = cache.fetch_latest(&bound(&p, "1.0.0")).unwrap();
        assert_eq!(latest.versions[0].to_string(), "1.2.0");
    }
}
