// awsgate - AWS MCP Gateway - Main Entry Point
//
// This binary wires the gateway together:
// - CLI interface
// - Security policy loading
// - Command validation and execution
// - The stdio MCP server
//
// Logs go to stderr; stdout is reserved for the MCP protocol stream.

use anyhow::{Context, Result};
use awsgate::config::Config;
use awsgate::exec::{CommandError, CommandExecutor};
use awsgate::mcp::GatewayServer;
use awsgate::metrics;
use awsgate::security::{CommandValidator, PolicyStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// awsgate: security-validated AWS CLI execution gateway
#[derive(Parser, Debug)]
#[command(name = "awsgate")]
#[command(author = "awsgate Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Security-validated AWS CLI execution gateway for MCP clients", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the configuration file (defaults to the XDG config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the MCP gateway over stdio (the default)
    Serve,
    /// Validate and execute a single command, printing the result
    Run {
        /// Complete AWS CLI command to execute
        command: String,

        /// Timeout in seconds (overrides the configured default)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Classify a command against the security policy without executing it
    Validate {
        /// Complete AWS CLI command to check
        command: String,
    },
    /// Check whether the AWS CLI is installed and runnable
    CheckCli,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing; stdout carries the protocol, so log to stderr
    let filter = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(filter.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    metrics::register_metrics();

    // Build the validation and execution pipeline
    let policy = Arc::new(PolicyStore::open(config.security.policy_file.clone()));
    let validator = CommandValidator::new(Arc::clone(&policy), config.security.mode);
    let executor = Arc::new(CommandExecutor::new(
        validator.clone(),
        &config.execution,
        &config.aws,
    ));

    match args.command {
        None | Some(Commands::Serve) => serve(policy, executor).await,
        Some(Commands::Run { command, timeout }) => run_once(&executor, &command, timeout).await,
        Some(Commands::Validate { command }) => validate_once(&validator, &command),
        Some(Commands::CheckCli) => check_cli(&executor).await,
    }
}

/// Serve the MCP gateway over stdio until the client disconnects.
async fn serve(policy: Arc<PolicyStore>, executor: Arc<CommandExecutor>) -> Result<()> {
    info!("awsgate v{} starting...", env!("CARGO_PKG_VERSION"));

    // Liveness probe, not a security control: serving continues either way.
    if !executor.is_installed().await {
        warn!("AWS CLI is not installed or not in PATH; execution requests will fail");
    }

    #[cfg(unix)]
    spawn_policy_reload_handler(policy);
    #[cfg(not(unix))]
    drop(policy);

    let server = GatewayServer::new(executor);
    server.serve_stdio().await
}

/// SIGHUP reloads the security policy without restarting the server.
#[cfg(unix)]
fn spawn_policy_reload_handler(policy: Arc<PolicyStore>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                warn!("Failed to install SIGHUP handler: {}", e);
                return;
            }
        };
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading security policy");
            policy.reload();
        }
    });
}

/// Execute one command and print the outcome.
async fn run_once(
    executor: &CommandExecutor,
    command: &str,
    timeout: Option<u64>,
) -> Result<()> {
    match executor.run(command, timeout).await {
        Ok(result) => {
            if result.is_success() {
                println!("{}", awsgate::output::format_output(&result.output));
            } else {
                println!("error: {}", result.output);
            }
            Ok(())
        }
        Err(CommandError::Validation(e)) => {
            println!("Command validation error: {e}");
            Ok(())
        }
        Err(CommandError::Execution(e)) => Err(e.into()),
    }
}

/// Print the validation verdict for a command.
fn validate_once(validator: &CommandValidator, command: &str) -> Result<()> {
    match validator.validate(command) {
        Ok(()) => println!("allowed"),
        Err(e) => println!("denied: {e}"),
    }
    Ok(())
}

/// Report whether the AWS CLI can be started.
async fn check_cli(executor: &CommandExecutor) -> Result<()> {
    if executor.is_installed().await {
        println!("AWS CLI is installed");
        Ok(())
    } else {
        println!("AWS CLI is not installed or not in PATH");
        std::process::exit(1);
    }
}
