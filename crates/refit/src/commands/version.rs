//! Version command

use crate::cli::VersionArgs;
use anyhow::Result;

pub fn run(args: VersionArgs) -> Result<()> {
    if args.json {
        println!(
            "{}",
            serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })
        );
    } else {
        println!("refit {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(())
}
