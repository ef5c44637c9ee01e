//! Apply command: compute the plan and rewrite the outdated references

use crate::cli::ApplyArgs;
use crate::commands::common;
use crate::output;
use anyhow::{bail, Result};
use camino::Utf8Path;
use refit_engine::ReplacementExecutor;

pub async fn run(args: ApplyArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let ctx = common::build_context(config_path, &args.scan)?;
    let cancel = common::cancel_on_ctrl_c();

    let replacements = common::compute_plan(&ctx, &cancel).await?;
    if replacements.is_empty() {
        output::success("Everything is up to date");
        return Ok(());
    }

    let report = ReplacementExecutor::new()
        .execute(&ctx.root, replacements, &cancel)
        .await?;

    for (file, error) in &report.failures {
        output::error(&format!("{}: {}", file, error));
    }
    if report.skipped > 0 {
        output::warning(&format!("{} file(s) skipped after cancellation", report.skipped));
    }

    output::success(&format!(
        "Applied {} replacement(s) across {} file(s)",
        report.replacements_applied, report.files_changed
    ));

    if !report.is_complete() {
        bail!(
            "{} file(s) failed, {} skipped",
            report.failures.len(),
            report.skipped
        );
    }
    Ok(())
}
