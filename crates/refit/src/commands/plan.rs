//! Plan command: compute and display replacements without applying them

use crate::cli::PlanArgs;
use crate::commands::common;
use crate::output;
use anyhow::Result;
use camino::Utf8Path;
use refit_engine::TextReplacement;
use tabled::{settings::Style, Table, Tabled};

pub async fn run(args: PlanArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let ctx = common::build_context(config_path, &args.scan)?;
    let cancel = common::cancel_on_ctrl_c();

    let replacements = common::compute_plan(&ctx, &cancel).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&replacements)?);
        return Ok(());
    }

    if replacements.is_empty() {
        output::success("Everything is up to date");
        return Ok(());
    }

    let rows: Vec<PlanRow> = replacements.iter().map(PlanRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    let files: std::collections::BTreeSet<_> =
        replacements.iter().map(|r| r.file.as_str()).collect();
    output::info(&format!(
        "{} replacement(s) across {} file(s)",
        replacements.len(),
        files.len()
    ));

    Ok(())
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "GROUP")]
    group: String,
    #[tabled(rename = "FILE")]
    file: String,
    #[tabled(rename = "LINE")]
    line: usize,
    #[tabled(rename = "FROM")]
    from: String,
    #[tabled(rename = "TO")]
    to: String,
}

impl From<&TextReplacement> for PlanRow {
    fn from(replacement: &TextReplacement) -> Self {
        Self {
            group: replacement.group.clone(),
            file: replacement.file.to_string(),
            // 1-based for humans; the JSON output stays 0-based
            line: replacement.line + 1,
            from: replacement.from.clone(),
            to: replacement.to.clone(),
        }
    }
}
