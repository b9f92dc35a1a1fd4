use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use mri_enhance::network::{EnhancementNet, UnetSpec};

#[derive(Args, Debug)]
pub struct Summary {
    /// Network spec as JSON; overrides the dimension flags.
    #[arg(long)]
    spec: Option<PathBuf>,

    #[arg(long = "height", short = 'H', default_value_t = 218)]
    height: usize,

    #[arg(long = "width", short = 'W', default_value_t = 170)]
    width: usize,

    #[arg(long, default_value_t = 3)]
    hpad: usize,

    #[arg(long, default_value_t = 3)]
    wpad: usize,

    /// Save the spec that was built as JSON.
    #[arg(long = "save-spec")]
    save_spec: Option<PathBuf>,

    /// Save the freshly initialised weights as JSON.
    #[arg(long = "save-model")]
    save_model: Option<PathBuf>,

    /// Seed for weight initialisation.
    #[arg(long)]
    seed: Option<u64>,
}

impl Summary {
    pub fn run(&self) -> anyhow::Result<()> {
        let mut spec = match &self.spec {
            Some(path) => UnetSpec::load_json(&path.to_string_lossy())
                .with_context(|| format!("reading spec {}", path.display()))?,
            None => UnetSpec::new(self.height, self.width, self.hpad, self.wpad),
        };
        if self.seed.is_some() {
            spec.seed = self.seed;
        }

        let net = EnhancementNet::new(spec).context("building enhancement network")?;

        println!("{:<20} {:>18} {:>10}", "layer", "output shape", "params");
        for row in net.summary() {
            let (h, w, c) = row.output_shape;
            println!("{:<20} {:>18} {:>10}", row.name, format!("({h}, {w}, {c})"), row.params);
        }
        println!("total params: {}", net.param_count());

        if let Some(path) = &self.save_spec {
            net.spec.save_json(&path.to_string_lossy())
                .with_context(|| format!("writing spec {}", path.display()))?;
        }
        if let Some(path) = &self.save_model {
            net.save_json(&path.to_string_lossy())
                .with_context(|| format!("writing model {}", path.display()))?;
        }
        Ok(())
    }
}
