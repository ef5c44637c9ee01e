//! File discovery with include/exclude globs

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Version-control metadata directories, never descended into
const VCS_DIRECTORIES: &[&str] = &[".git", ".hg", ".svn"];

/// Walks a directory tree collecting the files to scan.
///
/// Globs are matched against paths relative to the search root. An empty
/// include list means every file; excludes always win.
#[derive(Debug)]
pub struct FileWalker {
    include: GlobSet,
    include_all: bool,
    exclude: GlobSet,
}

impl FileWalker {
    /// Build a walker from include/exclude glob lists
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_glob_set(include)?,
            include_all: include.is_empty(),
            exclude: build_glob_set(exclude)?,
        })
    }

    /// Collect every matching file under `root`, sorted for determinism
    pub fn walk(&self, root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_vcs_dir(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(path) => path,
                Err(path) => {
                    warn!("Skipping non-UTF-8 path: {}", path.display());
                    continue;
                }
            };

            let relative = path.strip_prefix(root).unwrap_or(&path);
            if !self.include_all && !self.include.is_match(relative) {
                continue;
            }
            if self.exclude.is_match(relative) {
                continue;
            }

            files.push(path);
        }

        files.sort();
        Ok(files)
    }
}

fn build_glob_set(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(Glob::new(glob).with_context(|| format!("Invalid glob: {}", glob))?);
    }
    builder.build().context("Failed to build glob set")
}

fn is_vcs_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| VCS_DIRECTORIES.contains(&name))
}
