use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ReportKind;

#[derive(Parser)]
#[command(name = "repopulse")]
#[command(about = "GitHub activity reports: commits and issues across repositories")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, default_value = "config", help = "Directory holding settings.json and repos.json")]
    pub config_dir: PathBuf,

    #[arg(long, default_value_t = 4, help = "Maximum concurrent repository fetches")]
    pub concurrency: usize,

    #[arg(long, default_value = "30s", value_parser = parse_duration, help = "Per-request timeout (e.g. 30s, 2m)")]
    pub timeout: Duration,

    #[arg(long, help = "Print the report to stdout instead of delivering it")]
    pub print_only: bool,
}

fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    humantime::parse_duration(input).map_err(|e| e.to_string())
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Generate the report for the previous day")]
    Daily,
    #[command(about = "Generate the report for the previous seven days")]
    Weekly,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Daily => crate::stats::exec(self.common, ReportKind::Daily),
            Commands::Weekly => crate::stats::exec(self.common, ReportKind::Weekly),
        }
    }
}
