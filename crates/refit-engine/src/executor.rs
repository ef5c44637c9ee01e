//! Applying replacement plans to files

use crate::replacement::TextReplacement;
use anyhow::{anyhow, bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of executing a plan. Failures are per file; one file's failure
/// never aborts the others.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Files rewritten successfully
    pub files_changed: usize,
    /// Replacements applied across all rewritten files
    pub replacements_applied: usize,
    /// `(file, error)` pairs for files that could not be rewritten
    pub failures: Vec<(Utf8PathBuf, String)>,
    /// Files not started because cancellation was requested
    pub skipped: usize,
}

impl ExecutionReport {
    /// Whether every file was rewritten
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }
}

/// Groups replacements by file and rewrites each file atomically.
///
/// Within one line, edits are applied in descending start-offset order so
/// earlier edits never shift the positions later edits depend on. The
/// rewritten content goes to a fresh temporary sibling first; the
/// original is then deleted and the temporary moved into its place, so a
/// crash mid-write never leaves a half-written file at the original path.
#[derive(Debug, Default)]
pub struct ReplacementExecutor;

impl ReplacementExecutor {
    /// Create an executor
    pub fn new() -> Self {
        Self
    }

    /// Execute a plan against files under `root`.
    ///
    /// Overlapping replacements are a planner defect and fail the whole
    /// call before any file is touched. Per-file I/O failures are
    /// recorded in the report and the remaining files still execute.
    /// Once cancellation is requested no new file is started; the file
    /// in flight completes its swap.
    pub async fn execute(
        &self,
        root: &Utf8Path,
        replacements: Vec<TextReplacement>,
        cancel: &refit_core::CancelToken,
    ) -> Result<ExecutionReport> {
        let mut by_file: BTreeMap<Utf8PathBuf, Vec<TextReplacement>> = BTreeMap::new();
        for replacement in replacements {
            by_file
                .entry(replacement.file.clone())
                .or_default()
                .push(replacement);
        }

        // An overlap can only come from a planner bug; refuse the plan
        // outright rather than corrupting a line.
        for edits in by_file.values() {
            validate_non_overlapping(edits)?;
        }

        let mut report = ExecutionReport::default();
        for (file, edits) in by_file {
            if cancel.is_cancelled() {
                report.skipped += 1;
                continue;
            }

            let absolute = root.join(&file);
            match rewrite_file(&absolute, &edits).await {
                Ok(applied) => {
                    info!("Rewrote {} ({} replacement(s))", file, applied);
                    report.files_changed += 1;
                    report.replacements_applied += applied;
                }
                Err(e) => {
                    warn!("Failed to rewrite {}: {:#}", file, e);
                    report.failures.push((file, format!("{:#}", e)));
                }
            }
        }

        Ok(report)
    }
}

fn validate_non_overlapping(edits: &[TextReplacement]) -> Result<()> {
    for (i, a) in edits.iter().enumerate() {
        for b in &edits[i + 1..] {
            if a.overlaps(b) {
                bail!(
                    "Overlapping replacements in {} line {}: [{}, {}) and [{}, {})",
                    a.file,
                    a.line,
                    a.start,
                    a.end(),
                    b.start,
                    b.end()
                );
            }
        }
    }
    Ok(())
}

/// Rewrite one file, returning the number of replacements applied
async fn rewrite_file(file: &Utf8Path, edits: &[TextReplacement]) -> Result<usize> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file))?;

    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();

    let mut by_line: BTreeMap<usize, Vec<&TextReplacement>> = BTreeMap::new();
    for edit in edits {
        by_line.entry(edit.line).or_default().push(edit);
    }

    let mut applied = 0;
    for (line_index, mut line_edits) in by_line {
        let line = lines.get_mut(line_index).ok_or_else(|| {
            anyhow!("Plan addresses line {} beyond the end of {}", line_index, file)
        })?;

        // Rightmost edit first, so earlier offsets stay valid
        line_edits.sort_by(|a, b| b.start.cmp(&a.start));
        for edit in line_edits {
            let span = edit.start..edit.start + edit.from.len();
            match line.get(span.clone()) {
                Some(current) if current == edit.from => {}
                _ => bail!(
                    "{} changed since planning: {:?} not found at line {} offset {}",
                    file,
                    edit.from,
                    line_index,
                    edit.start
                ),
            }
            line.replace_range(span, &edit.to);
            applied += 1;
        }
    }

    let rewritten = lines.join("\n");

    // Two-phase replace: write a temporary sibling, then swap it in.
    let temp = temp_sibling(file);
    debug!("Writing rewritten content to {}", temp);
    tokio::fs::write(&temp, &rewritten)
        .await
        .with_context(|| format!("Failed to write {}", temp))?;

    if let Err(e) = tokio::fs::remove_file(file).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e).with_context(|| format!("Failed to delete {} before swap", file));
    }
    // Past this point the temporary is the only copy; leave it in place
    // if the rename fails so nothing is lost.
    tokio::fs::rename(&temp, file)
        .await
        .with_context(|| format!("Failed to move {} into place at {}", temp, file))?;

    Ok(applied)
}

fn temp_sibling(file: &Utf8Path) -> Utf8PathBuf {
    let name = file.file_name().unwrap_or("file");
    file.with_file_name(format!(".{}.refit-{}", name, Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_sibling_stays_in_the_same_directory() {
        let temp = temp_sibling(Utf8Path::new("/srv/deploy/app.yaml"));
        assert_eq!(temp.parent(), Some(Utf8Path::new("/srv/deploy")));
        assert!(temp.file_name().unwrap().starts_with(".app.yaml.refit-"));
    }
}
