use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use mri_enhance::metrics::{run_compare, CompareConfig};

#[derive(Args, Debug)]
pub struct Compare {
    /// JSON config; flags below override its fields.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory holding `metrics_{condition}_{R}.npy`.
    #[arg(long = "metrics-dir", short = 'm')]
    metrics_dir: Option<PathBuf>,

    /// Directory the charts are written to.
    #[arg(long = "figures-dir", short = 'f')]
    figures_dir: Option<PathBuf>,

    /// Write the full report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip chart rendering.
    #[arg(long = "no-charts")]
    no_charts: bool,
}

impl Compare {
    pub fn run(&self) -> anyhow::Result<()> {
        let mut config = match &self.config {
            Some(path) => CompareConfig::load_json(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => CompareConfig::default(),
        };
        if let Some(dir) = &self.metrics_dir {
            config.metrics_dir = dir.clone();
        }
        if let Some(dir) = &self.figures_dir {
            config.figures_dir = dir.clone();
        }
        if self.report.is_some() {
            config.report_path = self.report.clone();
        }
        if self.no_charts {
            config.render_charts = false;
        }

        run_compare(&config).with_context(|| {
            format!("comparing metrics in {}", config.metrics_dir.display())
        })?;
        Ok(())
    }
}
