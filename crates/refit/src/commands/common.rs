//! Shared setup for the plan and apply commands

use crate::cli::ScanArgs;
use crate::output;
use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use refit_core::{CancelToken, RefitConfig};
use refit_engine::{FileWalker, ReplacementPlanner, TextReplacement};
use refit_pattern::{SearchTree, Template};
use refit_registry::{RegistryClient, VersionCache};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a scan needs: compiled templates, the matcher, the registry
/// client, the shared cache, and the file walker
pub struct ScanContext {
    pub templates: Vec<Arc<Template>>,
    pub planner: ReplacementPlanner,
    pub client: RegistryClient,
    pub cache: Arc<VersionCache>,
    pub walker: FileWalker,
    pub root: Utf8PathBuf,
}

/// Load configuration, merge CLI flags over it, and build the scan context
pub fn build_context(config_path: Option<&Utf8Path>, scan: &ScanArgs) -> Result<ScanContext> {
    let config = RefitConfig::load(config_path)?.merge_cli(
        scan.registry.clone(),
        scan.templates.clone(),
        scan.auth.clone(),
        scan.include.clone(),
        scan.exclude.clone(),
    );

    let templates = compile_templates(&config)?;

    let mut tree = SearchTree::new();
    for template in &templates {
        tree.insert(template.clone());
    }

    let mut client =
        RegistryClient::new(config.registry())?.with_credentials(config.auth_entries()?);
    if let Some(auth_host) = &config.file.auth_host {
        client = client.with_auth_host(auth_host);
    }
    if let Some(token) = &scan.token {
        client = client.with_token(token);
    }

    let walker = FileWalker::new(&config.file.include, &config.file.exclude)?;

    let cache = Arc::new(VersionCache::new());
    let planner = ReplacementPlanner::new(tree, cache.clone());

    Ok(ScanContext {
        templates,
        planner,
        client,
        cache,
        walker,
        root: scan.path.clone(),
    })
}

/// Compile every configured template, failing startup on the first bad one
pub fn compile_templates(config: &RefitConfig) -> Result<Vec<Arc<Template>>> {
    let mut templates = Vec::new();
    for entry in &config.file.templates {
        let compiled = Template::compile(&entry.pattern, entry.group())
            .with_context(|| format!("Failed to compile template {:?}", entry.pattern))?;
        templates.push(Arc::new(compiled));
    }
    if templates.is_empty() {
        bail!("No templates configured; add them to refit.yaml or pass --template");
    }
    Ok(templates)
}

/// A cancellation token flipped by Ctrl-C
pub fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let handler = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            output::warning("Cancellation requested; finishing in-flight work");
            handler.cancel();
        }
    });
    cancel
}

/// Refresh the cache and plan every file under the scan root.
///
/// Repository and file failures are reported per unit and do not halt the
/// run; only a fully failed refresh or cancellation aborts.
pub async fn compute_plan(
    ctx: &ScanContext,
    cancel: &CancelToken,
) -> Result<Vec<TextReplacement>> {
    let outcome = ctx.cache.update(&ctx.client, &ctx.templates, cancel).await?;
    for (repository, error) in &outcome.failures {
        output::warning(&format!("{}: {}", repository, error));
    }
    if outcome.refreshed == 0 && !outcome.is_complete() {
        bail!("Every repository refresh failed");
    }

    let files = ctx.walker.walk(&ctx.root)?;
    debug!("Scanning {} file(s) under {}", files.len(), ctx.root);

    let plans = futures::future::join_all(
        files
            .iter()
            .map(|file| ctx.planner.plan_file(file, &ctx.root, cancel)),
    )
    .await;

    let mut replacements = Vec::new();
    for (file, result) in files.iter().zip(plans) {
        match result {
            Ok(mut plan) => replacements.append(&mut plan),
            Err(e) if cancel.is_cancelled() => return Err(e),
            Err(e) => warn!("Skipping {}: {:#}", file, e),
        }
    }

    Ok(replacements)
}
