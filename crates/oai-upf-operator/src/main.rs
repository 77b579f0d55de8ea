use anyhow::Result;
use clap::Parser;

use oai_upf_operator::cli::Cli;

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    Cli::parse().process()
}
