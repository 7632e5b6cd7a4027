//! CLI orchestration module
//!
//! Argument definitions and the command runner live here so they can be
//! tested without the binary entry point.

use crate::client::ClientFactory;
use crate::config::ClientOptions;
use crate::error::ClientError;
use crate::result::CallResult;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "allclient")]
#[command(about = "Call remote procedures through any registered transport", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Remote endpoint URI
    #[arg(value_name = "URI")]
    pub uri: String,

    /// Skip introspection and send calls straight to the transport
    #[arg(long, global = true)]
    pub no_introspect: bool,

    /// Fail with the underlying error instead of a normalized result
    #[arg(long, global = true)]
    pub throw: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List advertised procedures
    List,

    /// Call a procedure
    Call {
        /// Procedure name
        #[arg(value_name = "PROCEDURE")]
        procedure: String,

        /// JSON argument
        #[arg(long)]
        json: Option<String>,
    },
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl CliError {
    /// Machine-readable code for the error envelope
    pub fn code(&self) -> String {
        match self {
            CliError::InvalidArguments(_) => "INVALID_ARGUMENT".to_string(),
            CliError::Config(_) => "CONFIG_ERROR".to_string(),
            CliError::Client(err) => match err {
                ClientError::MissingDestination => "MISSING_DESTINATION".to_string(),
                ClientError::UnsupportedScheme(_) => "UNSUPPORTED_SCHEME".to_string(),
                ClientError::InvalidUri(_) => "INVALID_URI".to_string(),
                ClientError::ProcedureNotFound(_) => "PROCEDURE_NOT_FOUND".to_string(),
                ClientError::Rpc(_) => err.code().unwrap_or("RPC_ERROR").to_string(),
            },
        }
    }

    /// Render as a failure result so stdout is always a result object
    pub fn to_result(&self) -> CallResult {
        CallResult::failure(self.code(), self.to_string())
    }
}

impl Cli {
    /// Overrides requested on the command line
    pub fn options(&self) -> ClientOptions {
        let mut options = ClientOptions::new();
        if self.no_introspect {
            options = options.with_auto_introspect(false);
        }
        if self.throw {
            options = options.with_never_throw(false);
        }
        options
    }
}

pub fn parse_json_arg(json: Option<&str>) -> CliResult<Value> {
    match json {
        None => Ok(Value::Object(Default::default())),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| CliError::InvalidArguments(format!("--json is not valid JSON: {}", e))),
    }
}

/// Execute the parsed command. File options are layered under CLI flags.
pub async fn run(cli: &Cli, file_options: ClientOptions) -> CliResult<CallResult> {
    let factory = ClientFactory::new().defaults(file_options.merge(cli.options()));
    let client = factory.connect(&cli.uri)?;

    info!("Connected to {}", client.uri());

    let result = match &cli.command {
        Commands::List => client.discover().await?,
        Commands::Call { procedure, json } => {
            let arg = parse_json_arg(json.as_deref())?;
            client.call(procedure, arg).await?
        }
    };

    Ok(result)
}
