use anyhow::Result;
use clap::{Parser, Subcommand};
use fremen_core::loader::ScriptLoader;
use fremen_core::workflow::WorkflowRunner;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

mod commands;
mod config;

use config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "fremen")]
#[command(about = "Run node-graph workflows built from stored behaviors", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "FREMEN_CONFIG", default_value = "fremen.toml")]
    config: PathBuf,

    /// Data directory holding workflow and behavior definitions
    #[arg(short, long, env = "FREMEN_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one or more workflows and print their reports
    Run {
        /// Workflow ids
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Print each report on a single line
        #[arg(long)]
        compact: bool,
    },
    /// Validate a workflow and print its execution order
    Check {
        /// Workflow id
        id: i64,
    },
    /// List stored workflows and behaviors
    List,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr; stdout carries JSON only
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fremen=info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("Data directory: {}", args.data_dir.display());

    let config = CliConfig::load(&args.config, args.data_dir)?;
    let store = Arc::new(config.open_store()?);
    let runner = WorkflowRunner::new(
        store.clone(),
        store.clone(),
        Arc::new(ScriptLoader::new(&config.engine)),
    );

    let mut stdout = std::io::stdout().lock();
    let ok = match args.command {
        Command::Run { ids, compact } => commands::run(&runner, &ids, compact, &mut stdout).await?,
        Command::Check { id } => commands::check(&runner, id, &mut stdout)?,
        Command::List => {
            commands::list(store.as_ref(), &mut stdout)?;
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
