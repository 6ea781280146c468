// Random corruption of EIGENSTRAT genotype matrices.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Genotype call written in place of a dropped call.
pub const MISSING_MARKER: char = '9';
pub const HETEROZYGOUS: char = '1';
pub const HOMOZYGOUS_REF: char = '0';
pub const HOMOZYGOUS_ALT: char = '2';

#[derive(Debug, Error)]
pub enum MissingDataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing-data ratio must lie within [0, 1], got {0}")]
    InvalidRatio(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissingDataConfig {
    ratio: f64,
    pseudo_diploid: bool,
}

impl MissingDataConfig {
    pub fn new(ratio: f64, pseudo_diploid: bool) -> Result<Self, MissingDataError> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(MissingDataError::InvalidRatio(ratio));
        }
        Ok(MissingDataConfig {
            ratio,
            pseudo_diploid,
        })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn pseudo_diploid(&self) -> bool {
        self.pseudo_diploid
    }
}

/// Where the corrupted matrix goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    InPlace,
    File(PathBuf),
}

impl OutputTarget {
    pub fn resolve<'a>(&'a self, input: &'a Path) -> &'a Path {
        match self {
            OutputTarget::InPlace => input,
            OutputTarget::File(path) => path.as_path(),
        }
    }
}

/// Seeded generator when `seed` is given, otherwise one drawn from OS entropy.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Decides the fate of a single genotype call.
///
/// With probability `ratio` the call becomes missing. Otherwise, in
/// pseudo-diploid mode, a heterozygous call collapses to one of the two
/// homozygous calls with equal probability. Anything else is returned as is.
pub fn replace<R: Rng>(c: char, config: &MissingDataConfig, rng: &mut R) -> char {
    if rng.gen::<f64>() < config.ratio {
        return MISSING_MARKER;
    }
    if config.pseudo_diploid && c == HETEROZYGOUS {
        return if rng.gen::<f64>() > 0.5 {
            HOMOZYGOUS_REF
        } else {
            HOMOZYGOUS_ALT
        };
    }
    c
}

pub fn corrupt_line<R: Rng>(line: &str, config: &MissingDataConfig, rng: &mut R) -> String {
    line.chars().map(|c| replace(c, config, rng)).collect()
}

/// Corrupts every line after trimming surrounding whitespace.
pub fn corrupt_lines<R: Rng>(
    lines: &[String],
    config: &MissingDataConfig,
    rng: &mut R,
) -> Vec<String> {
    lines
        .iter()
        .map(|line| corrupt_line(line.trim(), config, rng))
        .collect()
}

fn read_lines(path: &Path) -> Result<Vec<String>, MissingDataError> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
    Ok(lines)
}

/// Reads `input` fully, corrupts it, and writes the result to `target`.
///
/// The whole input is read before the output is opened, so `OutputTarget::InPlace`
/// rewrites the file safely.
pub fn corrupt_file(
    input: &Path,
    target: &OutputTarget,
    config: &MissingDataConfig,
    seed: Option<u64>,
) -> Result<usize, MissingDataError> {
    let lines = read_lines(input)?;
    info!("Read {} markers from {}", lines.len(), input.display());
    debug!(
        "Missing-data ratio {}, pseudo-diploid {}, seed {:?}",
        config.ratio, config.pseudo_diploid, seed
    );

    let mut rng = make_rng(seed);
    let corrupted = corrupt_lines(&lines, config, &mut rng);

    let output = target.resolve(input);
    let mut writer = BufWriter::new(File::create(output)?);
    for line in &corrupted {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;

    info!("Wrote {} markers to {}", corrupted.len(), output.display());
    Ok(corrupted.len())
}
