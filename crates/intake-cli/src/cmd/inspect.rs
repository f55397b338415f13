use anyhow::Result;
use clap::Args;
use intake_lib::intake_spec::EngineConfig;

use crate::session::{self, VisitArgs};

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub visit: VisitArgs,
}

pub fn run(args: &InspectArgs, config: EngineConfig) -> Result<()> {
    let (manager, _log) = session::open_visit(&args.visit, config)?;
    print!("{}", manager.dump()?);
    Ok(())
}
