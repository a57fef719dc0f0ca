use anyhow::Result;
use clap::Parser;

use oci_context::cli::{self, Cli};
use oci_context::logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    cli::run(cli).await
}
