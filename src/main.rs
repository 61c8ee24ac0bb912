use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(version, about = "Scraper pipeline supervisor")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory the stages run in and artifacts are written to.
    /// Defaults to the current directory.
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Path to the config file. Defaults to harvest.toml in the work directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the supervisor: run the pipeline now, then on a timer
    Run {
        /// Execute exactly one cycle and exit instead of looping
        #[arg(long)]
        once: bool,
    },
    /// Show the most recently published pipeline status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let work_dir = match cli.work_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Run { once } => {
            cmd::cmd_run(&work_dir, cli.config.as_deref(), *once, cli.verbose).await?;
        }
        Commands::Status => {
            cmd::cmd_status(&work_dir, cli.config.as_deref())?;
        }
    }

    Ok(())
}
