use clap::Parser;

use teledent::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    teledent::init_tracing();
    teledent::run(Cli::parse()).await
}
