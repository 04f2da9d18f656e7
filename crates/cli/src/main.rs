//! RustedScout CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write a default config file
//! - `research`: Run a research query on a thread
//! - `resume`: Continue an interrupted run from its last checkpoint
//! - `thread`: List, show or delete stored threads

use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod commands;

#[derive(Parser)]
#[command(
    name = "rustedscout",
    about = "RustedScout: checkpointed autonomous research assistant",
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
    /// Initialize the configuration file
    Onboard,

    /// Research a question and print a cited answer
    Research {
        /// The question to research
        query: String,

        /// Thread to continue (defaults to the configured thread)
        #[arg(short, long)]
        thread: Option<String>,

        /// Override the maximum number of reasoning passes
        #[arg(long)]
        max_turns: Option<u32>,

        /// Print progress events as JSON lines on stderr
        #[arg(long)]
        stream: bool,
    },

    /// Resume an interrupted run
    Resume {
        /// Thread to resume
        thread: String,

        /// Print progress events as JSON lines on stderr
        #[arg(long)]
        stream: bool,
    },

    /// Inspect and manage stored threads
    Thread {
        #[command(subcommand)]
        command: ThreadCommand,
    },
}

#[derive(Subcommand)]
enum ThreadCommand {
    /// List all threads with a checkpoint
    List,
    /// Print a thread's checkpoint as JSON
    Show { thread: String },
    /// Delete a thread's checkpoint
    Delete { thread: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the answer.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Onboard => commands::onboard::run().await,
        Commands::Research {
            query,
            thread,
            max_turns,
            stream,
        } => commands::research::run(query, thread, max_turns, stream).await,
        Commands::Resume { thread, stream } => commands::research::resume(thread, stream).await,
        Commands::Thread { command } => match command {
            ThreadCommand::List => commands::thread::list().await,
            ThreadCommand::Show { thread } => commands::thread::show(thread).await,
            ThreadCommand::Delete { thread } => commands::thread::delete(thread).await,
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", commands::describe_error(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}
