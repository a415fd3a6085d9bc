use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::global;
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "chunkvault")]
#[command(about = "Chunked meeting-recording ingestion and finalization", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Print the config file and recordings directory locations
    Paths,
}

pub fn handle_paths_command() -> Result<()> {
    let config = Config::load()?;
    println!("config file:    {}", global::config_file()?.display());
    println!(
        "recordings dir: {}",
        config.storage.recordings_dir()?.display()
    );
    Ok(())
}
