//! Thoughtline CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Answer a question with the reasoning loop
//! - `tools`   — List the built-in tools
//! - `prompt`  — Print the rendered system prompt
//! - `config`  — Show the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "thoughtline",
    about = "Thoughtline — a Thought → Action → Observation reasoning executor",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question, using tools as needed
    Run {
        /// The question to answer
        query: String,

        /// Override the iteration cap
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Override the wall-clock budget, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Accept unlabelled model output as the final answer
        #[arg(long)]
        permissive: bool,

        /// Stream model output to stderr as it arrives
        #[arg(long)]
        stream: bool,

        /// Print the Thought/Action/Observation transcript
        #[arg(long)]
        trace: bool,
    },

    /// List the built-in tools
    Tools,

    /// Print the system prompt sent to the model
    Prompt,

    /// Show the effective configuration (API key redacted)
    Config {
        /// Print only the config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            query,
            max_iterations,
            timeout_ms,
            permissive,
            stream,
            trace,
        } => {
            commands::run::run(commands::run::RunOptions {
                query,
                max_iterations,
                timeout_ms,
                permissive,
                stream,
                trace,
            })
            .await?
        }
        Commands::Tools => commands::tools::run()?,
        Commands::Prompt => commands::prompt::run()?,
        Commands::Config { path } => {
            if path {
                commands::config_cmd::path()
            } else {
                commands::config_cmd::show()?
            }
        }
    }

    Ok(())
}
