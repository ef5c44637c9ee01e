//! Common test infrastructure for refit-engine tests

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use refit_engine::{ReplacementPlanner, TextReplacement};
use refit_pattern::{BoundImage, ImageRef, SearchTree, Template};
use refit_registry::VersionCache;
use semver::Version;
use std::sync::Arc;

/// Compile a template or panic
pub fn template(raw: &str, group: &str) -> Arc<Template> {
    Arc::new(Template::compile(raw, group).expect("test template must compile"))
}

/// Build a search tree over templates
pub fn tree(templates: &[&Arc<Template>]) -> SearchTree {
    let mut tree = SearchTree::new();
    for t in templates {
        tree.insert(Arc::clone(t));
    }
    tree
}

/// A cache seeded with tags for one pattern
pub fn seeded_cache(entries: &[(&Arc<Template>, &[&str])]) -> Arc<VersionCache> {
    let cache = VersionCache::new();
    for (pattern, tags) in entries {
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
    Arc::new(cache)
}

/// A planner over one seeded template
pub fn planner_for(pattern: &Arc<Template>, tags: &[&str]) -> ReplacementPlanner {
    ReplacementPlanner::new(tree(&[pattern]), seeded_cache(&[(pattern, tags)]))
}

/// Write a file under the test root, returning its absolute path
pub fn write_file(root: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = root.join(name);
    std::fs::create_dir_all(path.parent().expect("file has a parent")).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

pub fn read_file(path: &Utf8Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// UTF-8 view of a tempdir path
pub fn utf8_root(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("tempdir is UTF-8")
}

/// A hand-built replacement for executor-level tests
pub fn manual_replacement(
    file: &str,
    line: usize,
    start: usize,
    from: &str,
    to: &str,
) -> TextReplacement {
    let pattern = template("myorg/app:{vx}", "manual");
    let image = ImageRef::new(
        "myorg",
        "app",
        vec![Version::parse("1.0.0").unwrap()],
        None,
    );
    let bound = BoundImage::new(pattern, image).expect("binding is valid");
    TextReplacement {
        group: "manual".to_string(),
        file: Utf8PathBuf::from(file),
        from: from.to_string(),
        to: to.to_string(),
        line,
        start,
        source: bound.clone(),
        target: bound,
    }
}
