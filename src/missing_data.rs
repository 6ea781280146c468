use pcadmix::missing::{corrupt_file, MissingDataConfig, OutputTarget};

use anyhow::Context;
use clap::{ArgGroup, Parser};
use colored::Colorize;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::path::PathBuf;

/// Replace values in a dataset with missing data randomly.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("target").required(true).args(["outfile", "in_place"])))]
struct Args {
    /// Ratio of SNPs to convert to missing data
    #[arg(short = 'r', long = "ratio")]
    ratio: f64,

    /// File to convert, must be in EIGENSTRAT genotype format
    #[arg(short = 'f', long = "file")]
    filename: PathBuf,

    /// Target filename for the conversion
    #[arg(short = 'o', long = "outfile")]
    outfile: Option<PathBuf>,

    /// Convert the input file in place
    #[arg(short = 'i', long = "in-place")]
    in_place: bool,

    /// Model ancient DNA by creating pseudo-diploid calls
    #[arg(short = 'a', long = "ancient")]
    ancient: bool,

    /// Random seed
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = MissingDataConfig::new(args.ratio, args.ancient)?;
    info!(
        "Missing-data ratio: {}, pseudo-diploid: {}",
        config.ratio(),
        config.pseudo_diploid()
    );
    let target = match args.outfile {
        Some(path) if !args.in_place => OutputTarget::File(path),
        _ => OutputTarget::InPlace,
    };

    let markers = corrupt_file(&args.filename, &target, &config, args.seed)
        .with_context(|| format!("failed to convert {}", args.filename.display()))?;

    info!(
        "{}",
        format!("Converted {} markers", markers).green()
    );
    Ok(())
}
