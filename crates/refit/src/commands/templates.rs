//! Templates command: show the compiled template set

use crate::cli::TemplatesArgs;
use crate::commands::common;
use crate::output;
use anyhow::Result;
use camino::Utf8Path;
use refit_core::RefitConfig;
use tabled::{settings::Style, Table, Tabled};

pub fn run(args: TemplatesArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = RefitConfig::load(config_path)?.merge_cli(
        None,
        args.templates,
        vec![],
        vec![],
        vec![],
    );

    let templates = common::compile_templates(&config)?;

    let rows: Vec<TemplateRow> = templates
        .iter()
        .map(|t| TemplateRow {
            pattern: t.raw().to_string(),
            group: t.group().to_string(),
            repository: t.repository(),
            versions: t.version_count(),
            digest: if t.has_digest() { "yes" } else { "no" },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    output::info(&format!("{} template(s) compiled", templates.len()));
    Ok(())
}

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "PATTERN")]
    pattern: String,
    #[tabled(rename = "GROUP")]
    group: String,
    #[tabled(rename = "REPOSITORY")]
    repository: String,
    #[tabled(rename = "VERSIONS")]
    versions: usize,
    #[tabled(rename = "DIGEST")]
    digest: &'static str,
}
