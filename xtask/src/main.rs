mod ci;

use anyhow::Result;
use call_context::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development task runner for the process-runner workspace")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run CI checks
    Ci(ci::CiArgs),
    /// Run tests
    Test(test::TestArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let ctx = process_runner::with_local(&Context::background());

    smol::block_on(async {
        match args.cmd {
            Command::Ci(args) => ci::run(&ctx, args).await,
            Command::Test(args) => test::run(&ctx, args).await,
        }
    })
}
