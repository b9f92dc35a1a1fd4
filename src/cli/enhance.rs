use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use mri_enhance::io::{read_tensor, save_preview, write_tensor};
use mri_enhance::network::{EnhancementNet, UnetSpec};
use mri_enhance::quality::{psnr, ssim};
use tracing::info;

#[derive(Args, Debug)]
pub struct Enhance {
    /// Saved network (JSON). Without it a freshly initialised network is used.
    #[arg(long)]
    model: Option<PathBuf>,

    /// `H × W × 2` field to enhance.
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// `H × W` (or `H × W × 1`) field the correction is added to.
    #[arg(long, short = 'r')]
    reference: PathBuf,

    /// Where to write the `H × W × 1` result.
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Also write channel 0 of the result as a grayscale PNG.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Fully sampled target to score the result against.
    #[arg(long)]
    target: Option<PathBuf>,

    /// Padding of a fresh network; a saved model carries its own.
    #[arg(long, default_value_t = 3, conflicts_with = "model")]
    hpad: usize,

    #[arg(long, default_value_t = 3, conflicts_with = "model")]
    wpad: usize,

    #[arg(long, conflicts_with = "model")]
    seed: Option<u64>,
}

impl Enhance {
    pub fn run(&self) -> anyhow::Result<()> {
        let field = read_tensor(&self.input)
            .with_context(|| format!("reading input {}", self.input.display()))?;
        let reference = read_tensor(&self.reference)
            .with_context(|| format!("reading reference {}", self.reference.display()))?;

        let net = match &self.model {
            Some(path) => EnhancementNet::load_json(&path.to_string_lossy())
                .with_context(|| format!("loading model {}", path.display()))?,
            None => {
                let mut spec = UnetSpec::new(field.height, field.width, self.hpad, self.wpad);
                spec.seed = self.seed;
                EnhancementNet::new(spec).context("building enhancement network")?
            }
        };

        let result = net.forward(&field, &reference)?;
        write_tensor(&self.output, &result)
            .with_context(|| format!("writing output {}", self.output.display()))?;
        info!(path = %self.output.display(), "wrote enhanced field");

        if let Some(path) = &self.preview {
            save_preview(&result, path)
                .with_context(|| format!("writing preview {}", path.display()))?;
        }

        if let Some(path) = &self.target {
            let target = read_tensor(path)
                .with_context(|| format!("reading target {}", path.display()))?;
            if target.channels != 1 {
                bail!("target must have a single channel, got {}", target.channels);
            }
            let before = (psnr(&target, &reference, None)?, ssim(&target, &reference, None)?);
            let after = (psnr(&target, &result, None)?, ssim(&target, &result, None)?);
            println!("reference: pSNR {:.3} dB, SSIM {:.4}", before.0, before.1);
            println!("enhanced:  pSNR {:.3} dB, SSIM {:.4}", after.0, after.1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::cli::Cli;

    fn parse(extra: &[&str]) -> Result<Cli, clap::Error> {
        let base = ["mri-enhance", "enhance", "-i", "f.npy", "-r", "r.npy", "-o", "o.npy"];
        Cli::try_parse_from(base.iter().chain(extra))
    }

    #[test]
    fn fresh_network_options_conflict_with_a_saved_model() {
        assert!(parse(&["--model", "m.json"]).is_ok());
        assert!(parse(&["--hpad", "0", "--wpad", "0", "--seed", "1"]).is_ok());
        for flag in [["--hpad", "0"], ["--wpad", "0"], ["--seed", "1"]] {
            let err = parse(&["--model", "m.json", flag[0], flag[1]]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        }
    }
}
