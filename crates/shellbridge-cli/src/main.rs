// crates/shellbridge-cli/src/main.rs
// ============================================================================
// Module: Shellbridge CLI Entry Point
// Description: Command dispatcher for the shellbridge tool server.
// Purpose: Start the server and inspect its registry and artifacts offline.
// Dependencies: clap, shellbridge-core, shellbridge-server, shellbridge-tools
// ============================================================================

//! ## Overview
//! The shellbridge CLI starts the bridge server over the built-in automation
//! catalog and offers offline inspection commands: listing registered tools,
//! rendering the OpenAPI document, and bootstrapping the bearer token file.
//! All output goes through explicit stream helpers so failures surface as
//! exit codes instead of panics.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

use shellbridge_core::ToolRegistry;
use shellbridge_server::BridgeServer;
use shellbridge_server::ServerConfig;
use shellbridge_server::openapi_document;
use shellbridge_server::token_fingerprint;
use shellbridge_tools::SimulatedHost;
use shellbridge_tools::register_catalog;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the bearer token file under the home directory.
const TOKEN_FILE_NAME: &str = ".shellbridge-token";

/// Number of random bytes in a generated bearer token.
const TOKEN_BYTES: usize = 32;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "shellbridge", version, about = "Shell automation tool server")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bridge server.
    Serve(ServeCommand),
    /// Print the registered tool listing as JSON.
    Tools,
    /// Print the generated OpenAPI document as JSON.
    Openapi(OpenapiCommand),
    /// Create or inspect the bearer token file.
    Token(TokenCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the bind address from the config file.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

/// Configuration for the `openapi` command.
#[derive(Args, Debug)]
struct OpenapiCommand {
    /// Optional config file path for title and server URL settings.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration for the `token` command.
#[derive(Args, Debug)]
struct TokenCommand {
    /// Token file path (defaults to `~/.shellbridge-token`).
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Tools => command_tools(),
        Commands::Openapi(command) => command_openapi(command),
        Commands::Token(command) => command_token(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let mut config = load_config(command.config.as_deref())?;
    if let Some(bind) = command.bind {
        config.bind = bind;
    }
    let server = BridgeServer::new(config, catalog_registry()?)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads the server configuration, falling back to defaults without a path.
fn load_config(path: Option<&std::path::Path>) -> CliResult<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .map_err(|err| CliError::new(format!("config load failed: {err}"))),
        None => Ok(ServerConfig::default()),
    }
}

/// Builds the tool registry over the built-in automation host.
fn catalog_registry() -> CliResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_catalog(&mut registry, Arc::new(SimulatedHost::new()))
        .map_err(|err| CliError::new(format!("catalog registration failed: {err}")))?;
    Ok(registry)
}

// ============================================================================
// SECTION: Inspection Commands
// ============================================================================

/// Executes the `tools` command.
fn command_tools() -> CliResult<ExitCode> {
    let registry = catalog_registry()?;
    let listing = serde_json::json!({ "tools": registry.list() });
    write_stdout_json(&listing)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `openapi` command.
fn command_openapi(command: OpenapiCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let registry = catalog_registry()?;
    let document = openapi_document(&registry, &config.openapi, &config.advertised_url());
    write_stdout_json(&document)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Token Command
// ============================================================================

/// Executes the `token` command.
///
/// Prints the token on first creation; afterwards only the fingerprint is
/// shown so the secret does not leak into shell history by accident.
fn command_token(command: TokenCommand) -> CliResult<ExitCode> {
    let path = match command.path {
        Some(path) => path,
        None => default_token_path()?,
    };
    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|err| CliError::new(format!("token file unreadable: {err}")))?;
        let token = content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| CliError::new(format!("token file is empty: {}", path.display())))?;
        write_stdout_line(&format!(
            "token file: {} (sha256:{})",
            path.display(),
            token_fingerprint(token)
        ))?;
        return Ok(ExitCode::SUCCESS);
    }
    let token = generate_token();
    write_token_file(&path, &token)?;
    write_stdout_line(&format!("created token file: {}", path.display()))?;
    write_stdout_line(&token)?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves the default token file path under the home directory.
fn default_token_path() -> CliResult<PathBuf> {
    let home = std::env::var_os("HOME")
        .ok_or_else(|| CliError::new("HOME is not set; pass --path explicitly"))?;
    Ok(PathBuf::from(home).join(TOKEN_FILE_NAME))
}

/// Generates a random lowercase-hex bearer token.
fn generate_token() -> String {
    let mut bytes = [0_u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut token = String::with_capacity(TOKEN_BYTES * 2);
    for byte in bytes {
        let _ = write!(token, "{byte:02x}");
    }
    token
}

/// Writes the token file, restricting permissions where the platform allows.
fn write_token_file(path: &std::path::Path, token: &str) -> CliResult<()> {
    std::fs::write(path, format!("{token}\n"))
        .map_err(|err| CliError::new(format!("token file write failed: {err}")))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|err| CliError::new(format!("token file chmod failed: {err}")))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))
}

/// Writes a pretty-printed JSON value to stdout.
fn write_stdout_json(value: &serde_json::Value) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("JSON render failed: {err}")))?;
    write_stdout_line(&rendered)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}
