mod cli;
mod cmd;
mod logging;
mod session;

fn main() -> anyhow::Result<()> {
    cli::main()
}
