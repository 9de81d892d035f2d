mod cli;
mod logging;
mod options;
mod run;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::initialize(cli.log);
    run::execute(cli).await
}
