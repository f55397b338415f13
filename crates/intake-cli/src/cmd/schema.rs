use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use intake_lib::intake_spec::LayoutSpec;

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Write the schema to a file instead of stdout
    #[arg(long = "out", value_name = "FILE")]
    pub out: Option<PathBuf>,
}

pub fn run(args: &SchemaArgs) -> Result<()> {
    let schema = schemars::schema_for!(LayoutSpec);
    let text = serde_json::to_string_pretty(&schema).context("failed to render schema")?;
    match &args.out {
        Some(path) => fs::write(path, format!("{text}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{text}"),
    }
    Ok(())
}
