use pcadmix::process::{run, Args};

use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    Builder::new().filter_level(level).parse_default_env().init();

    info!("PC admixture estimation");
    info!("Input file: {}", args.filename.display());
    info!("Populations: {}", args.populations);
    if let Some(outfile) = args.outfile.as_ref() {
        info!("Plot output: {}", outfile.display());
    }

    run(&args).with_context(|| {
        format!(
            "admixture estimation failed for {}",
            args.filename.display()
        )
    })?;

    Ok(())
}
