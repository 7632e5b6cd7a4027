use allclient::cli::{self, Cli, CliError};
use allclient::config::ClientOptions;
use allclient::IntrospectionCache;
use clap::Parser;
use std::process::ExitCode;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let outcome = match ClientOptions::load_default() {
        Ok(file_options) => cli::run(&cli, file_options).await,
        Err(e) => Err(CliError::Config(format!("{:#}", e))),
    };

    let result = outcome.unwrap_or_else(|err| {
        debug!("Command failed: {}", err);
        err.to_result()
    });

    if cli.verbose {
        eprint!("{}", IntrospectionCache::shared().stats().display());
    }

    match result.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to render result: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
