//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// refit - find outdated container image references and rewrite them
#[derive(Parser, Debug)]
#[command(name = "refit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to refit.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the replacement plan without touching any file
    Plan(PlanArgs),

    /// Compute the replacement plan and rewrite the outdated references
    Apply(ApplyArgs),

    /// Show the compiled templates
    Templates(TemplatesArgs),

    /// Show version information
    Version(VersionArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments shared by plan and apply
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(default_value = ".")]
    pub path: Utf8PathBuf,

    /// Additional template string (repeatable)
    #[arg(short, long = "template")]
    pub templates: Vec<String>,

    /// Registry host or base URL
    #[arg(short, long)]
    pub registry: Option<String>,

    /// Registry authentication token
    #[arg(long, env = "REFIT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// owner/repo=username,password authentication entry (repeatable)
    #[arg(long = "auth")]
    pub auth: Vec<String>,

    /// Include glob, relative to the scanned directory (repeatable)
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Exclude glob, relative to the scanned directory (repeatable)
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,
}

// Plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub scan: ScanArgs,
}

// Templates command
#[derive(Args, Debug)]
pub struct TemplatesArgs {
    /// Additional template string (repeatable)
    #[arg(short, long = "template")]
    pub templates: Vec<String>,
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Completions command
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_plan_parses_repeatable_flags() {
        let cli = Cli::parse_from([
            "refit",
            "plan",
            "deploy",
            "--template",
            "myorg/app:{v1.x}",
            "--template",
            "myorg/tool:{vx}",
            "--auth",
            "myorg/app=robot,s3cret",
            "--include",
            "**/*.yaml",
        ]);

        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.scan.path, "deploy");
                assert_eq!(args.scan.templates.len(), 2);
                assert_eq!(args.scan.auth.len(), 1);
                assert_eq!(args.scan.include, vec!["**/*.yaml"]);
                assert!(!args.json);
            }
            other => panic!("expected plan, got {:?}", other),
        }
    }
}
