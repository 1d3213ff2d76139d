use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

mod client;
mod config;
mod driver;
mod logging;
mod models;
mod output;
mod runner;
mod suite;

use crate::client::AzureCompletionClient;
use crate::config::Config;
use crate::driver::SuiteDriver;
use crate::output::OutputFormat;
use crate::suite::TestSuite;

/// Prompt sampler - send each prompt repeatedly and keep every distinct response
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON test suite
    #[arg(default_value = "tests.json")]
    suite: PathBuf,

    /// Settings file in dotenv format; environment variables override it
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Directory that receives one subdirectory per test group
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Summary format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - log every prompt and response
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = Config::load(&args.env_file).context("Failed to load configuration")?;
    let suite = TestSuite::from_file(&args.suite).context("Failed to load test suite")?;
    info!(
        endpoint = %config.endpoint(),
        groups = suite.tests.len(),
        iterations = config.iterations,
        "starting run"
    );

    let client = AzureCompletionClient::new(config.clone())?;
    let driver = SuiteDriver::new(client, config, &args.output_dir);
    let summary = driver.run_all(&suite).await?;

    output::print_summary(&summary, args.output);

    Ok(())
}
