//! Computing the replacement plan for a file

use crate::replacement::TextReplacement;
use anyhow::{Context, Result};
use camino::Utf8Path;
use refit_core::CancelToken;
use refit_pattern::{BoundImage, SearchTree};
use refit_registry::VersionCache;
use std::sync::Arc;
use tracing::{debug, trace};

/// Walks a file's lines, drives the search tree over each line, asks the
/// version cache for an upgrade for every match, and emits one
/// [`TextReplacement`] per upgrade found.
pub struct ReplacementPlanner {
    tree: SearchTree,
    cache: Arc<VersionCache>,
}

impl ReplacementPlanner {
    /// Create a planner over a populated search tree and version cache
    pub fn new(tree: SearchTree, cache: Arc<VersionCache>) -> Self {
        Self { tree, cache }
    }

    /// The search tree driving this planner
    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    /// Compute the ordered replacement plan for one file.
    ///
    /// Lines are indexed from 0. Every line is scanned left to right,
    /// resuming after the previous match's end, so multiple independent
    /// occurrences per line are all discovered without overlapping. A
    /// match whose upgrade renders identically to the existing text emits
    /// nothing, which makes re-planning an already-upgraded file yield an
    /// empty plan.
    ///
    /// Cancellation is checked between lines; a cancelled plan abandons
    /// the whole file (the caller treats it as unprocessed).
    pub async fn plan_file(
        &self,
        file: &Utf8Path,
        root: &Utf8Path,
        cancel: &CancelToken,
    ) -> Result<Vec<TextReplacement>> {
        let content = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read {}", file))?;

        let relative = file.strip_prefix(root).unwrap_or(file);

        let mut plan = Vec::new();
        for (line_index, line) in content.split('\n').enumerate() {
            cancel.check()?;
            self.plan_line(line, line_index, relative, &mut plan)?;
        }

        debug!("{}: {} replacement(s) planned", relative, plan.len());
        Ok(plan)
    }

    fn plan_line(
        &self,
        line: &str,
        line_index: usize,
        file: &Utf8Path,
        plan: &mut Vec<TextReplacement>,
    ) -> Result<()> {
        let mut position = 0;
        while let Some(found) = self.tree.search(line, position) {
            position = found.end;

            let matched = &line[found.start..found.end];
            let source = BoundImage::new(found.pattern.clone(), found.image.clone())
                .context("Search tree produced an unrenderable match")?;

            let Some(latest) = self.cache.fetch_latest(&source) else {
                trace!(
                    "{}:{}: no upgrade for {} at {}",
                    file,
                    line_index,
                    matched,
                    found.start
                );
                continue;
            };

            let target = BoundImage::new(found.pattern.clone(), latest)
                .context("Cache produced an unrenderable upgrade")?;
            let rendered = target.to_string();
            if rendered == matched {
                continue;
            }

            trace!(
                "{}:{}: {} -> {} at {}",
                file,
                line_index,
                matched,
                rendered,
                found.start
            );
            plan.push(TextReplacement {
                group: found.pattern.group().to_string(),
                file: file.to_owned(),
                from: matched.to_string(),
                to: rendered,
                line: line_index,
                start: found.start,
                source,
                target,
            });
        }
        Ok(())
    }
}
