use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::cmd::{self, inspect::InspectArgs, replay::ReplayArgs, schema::SchemaArgs};
use crate::logging;
use crate::session;

#[derive(Parser, Debug)]
#[command(
    name = "intake",
    about = "Replay and inspect patient intake layouts",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine settings (messages, overview id) as TOML
    #[arg(long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive a scripted session against a layout
    Replay(ReplayArgs),
    /// Print the tree of a freshly initialized visit
    Inspect(InspectArgs),
    /// Print the JSON Schema of the layout document
    Schema(SchemaArgs),
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = session::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Replay(args) => cmd::replay::run(&args, config),
        Commands::Inspect(args) => cmd::inspect::run(&args, config),
        Commands::Schema(args) => cmd::schema::run(&args),
    }
}
