mod cli;

use clap::Parser;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    mri_enhance::logging::init_logging(cli.log_level);
    cli.run()
}
