use crate::parse::{
    load_eigenvectors, parse_partition, EigenAxisMeta, EigenvectorListing, PopulationPartition,
};
use crate::plot::render_scatter;
use crate::report::{display_group_summary, render_report};
use crate::stats::{
    compute_moments, estimate_ratio, Axis, AxisSample, Moments, RatioEstimate, RatioInputs,
};

use clap::Parser;
use colored::*;
use log::{info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

// Define command-line arguments using clap
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Naive estimation of the admixture ratio from the first principal component, \
             with a Delta-method standard error"
)]
pub struct Args {
    /// Eigenvector listing produced by smartpca
    #[arg(short = 'f', long = "file")]
    pub filename: PathBuf,

    /// Populations to process, formatted as 'Admixed;Ref1,Ref2'
    #[arg(short = 'p', long = "populations")]
    pub populations: String,

    /// If given, write a scatter plot of the three populations to this path (.svg or .png)
    #[arg(short = 'o', long = "outfile")]
    pub outfile: Option<PathBuf>,

    /// Fail instead of warning when the standard error linearization is unreliable
    #[arg(long = "strict")]
    pub strict: bool,

    /// Log intermediate statistics
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum AdmixError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing header line in {path}")]
    MissingHeader { path: String },
    #[error("Malformed line {line}: expected at least 3 fields, found {tokens}: '{content}'")]
    MalformedInputLine {
        line: usize,
        tokens: usize,
        content: String,
    },
    #[error("Invalid coordinate '{value}' for population '{label}' on line {line}")]
    InvalidCoordinate {
        label: String,
        line: usize,
        value: String,
    },
    #[error("Invalid population spec '{spec}': {reason} (format is 'Admixed;Ref1,Ref2')")]
    InvalidPartitionSpec { spec: String, reason: String },
    #[error("Population '{0}' not found in eigenvector listing")]
    UnknownLabel(String),
    #[error("Population '{0}' has no members")]
    EmptyGroup(String),
    #[error("Reference populations share the same PC1 mean ({mean}); the ratio denominator is zero")]
    DegenerateDenominator { mean: f64 },
    #[error("Propagated ratio variance is negative ({0})")]
    NegativeVariance(f64),
    #[error("Relative spread {relative_spread:.3} of the mean differences is too large for a first-order standard error")]
    UnreliableLinearization { relative_spread: f64 },
    #[error("Plot error: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, AdmixError>;

/// The numbers reported for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmixtureAnalysis {
    pub partition: PopulationPartition,
    pub meta: EigenAxisMeta,
    pub group_sizes: [usize; 3],
    pub admixed_pc1: Moments,
    pub admixed_pc2: Moments,
    pub inputs: RatioInputs,
    pub estimate: RatioEstimate,
}

/// Selects the three configured populations and runs the estimator on them.
///
/// PC1 drives the ratio. PC2 moments of the admixed population are reported
/// for reference only and are computed from the PC2 values themselves.
pub fn analyze(
    listing: &EigenvectorListing,
    partition: &PopulationPartition,
) -> Result<AdmixtureAnalysis> {
    let admixed_group = listing.groups.get(&partition.admixed)?;
    let ref_a_group = listing.groups.get(&partition.reference_a)?;
    let ref_b_group = listing.groups.get(&partition.reference_b)?;

    let admixed = AxisSample::from_group(admixed_group, Axis::Pc1)?;
    let reference_a = AxisSample::from_group(ref_a_group, Axis::Pc1)?;
    let reference_b = AxisSample::from_group(ref_b_group, Axis::Pc1)?;

    let admixed_pc1 = compute_moments(&admixed)?;
    let admixed_pc2 = compute_moments(&AxisSample::from_group(admixed_group, Axis::Pc2)?)?;

    let inputs = RatioInputs::from_samples(&admixed, &reference_a, &reference_b)?;
    let estimate = estimate_ratio(&inputs)?;

    Ok(AdmixtureAnalysis {
        partition: partition.clone(),
        meta: listing.meta.clone(),
        group_sizes: [admixed.len(), reference_a.len(), reference_b.len()],
        admixed_pc1,
        admixed_pc2,
        inputs,
        estimate,
    })
}

/// Runs one full pass: load, partition, estimate, report, optionally plot.
pub fn run(args: &Args) -> Result<AdmixtureAnalysis> {
    let partition = parse_partition(&args.populations)?;
    info!(
        "Admixed population: {}, references: {} and {}",
        partition.admixed, partition.reference_a, partition.reference_b
    );

    let listing = load_eigenvectors(&args.filename)?;
    let ignored: Vec<&str> = listing
        .groups
        .labels()
        .filter(|label| !partition.labels().iter().any(|selected| selected == label))
        .collect();
    if !ignored.is_empty() {
        info!("Ignoring populations outside the partition: {}", ignored.join(", "));
    }

    let analysis = analyze(&listing, &partition)?;

    if args.strict && !analysis.estimate.linearization_is_reliable() {
        return Err(AdmixError::UnreliableLinearization {
            relative_spread: analysis.estimate.max_relative_spread(),
        });
    }

    if let Some(outfile) = args.outfile.as_deref() {
        write_plot(&listing, &partition, outfile)?;
    }

    display_group_summary(&listing, &partition)?;
    println!("\n{}", "Results:".green().bold());
    print!("{}", render_report(&analysis));

    if !analysis.estimate.linearization_is_reliable() {
        warn!("See --strict to reject estimates outside the linearization regime");
    }

    Ok(analysis)
}

fn write_plot(
    listing: &EigenvectorListing,
    partition: &PopulationPartition,
    outfile: &Path,
) -> Result<()> {
    render_scatter(listing, partition, outfile)?;
    info!("Plot written to {}", outfile.display());
    Ok(())
}
