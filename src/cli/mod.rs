mod compare;
mod enhance;
mod summary;

use clap::{Parser, Subcommand};
use mri_enhance::logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "mri-enhance")]
#[command(about = "U-Net enhancement and image-quality comparison for accelerated MRI.")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Log level; `RUST_LOG` overrides it.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.command {
            Commands::Compare(v) => v.run(),
            Commands::Summary(v) => v.run(),
            Commands::Enhance(v) => v.run(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate the precomputed metrics, test significance and draw the bar charts.
    Compare(compare::Compare),
    /// Build the enhancement network and print its layer table.
    Summary(summary::Summary),
    /// Run the enhancement network on a field stored as `.npy`.
    Enhance(enhance::Enhance),
}
