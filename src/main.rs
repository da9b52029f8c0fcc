use anyhow::Result;
use clap::Parser;
use exam_paper_generator::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    Cli::parse().run().await
}
