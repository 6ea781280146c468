use crate::parse::{Coordinate, PopulationGroup};
use crate::process::{AdmixError, Result};

use itertools::Itertools;
use log::{debug, warn};

/// Relative spread of either difference above which the first-order
/// linearization of the ratio variance is reported as unreliable.
pub const LINEARIZATION_WARN_THRESHOLD: f64 = 0.2;

/// Reference means closer than this many machine epsilons (relative to their
/// magnitude) are treated as equal.
const DENOMINATOR_ULPS: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Pc1,
    Pc2,
}

impl Axis {
    fn select(self, coordinate: &Coordinate) -> f64 {
        match self {
            Axis::Pc1 => coordinate.pc1,
            Axis::Pc2 => coordinate.pc2,
        }
    }
}

/// One population's values along a single principal component.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSample {
    pub label: String,
    pub values: Vec<f64>,
}

impl AxisSample {
    pub fn new(label: &str, values: Vec<f64>) -> Self {
        AxisSample {
            label: label.to_string(),
            values,
        }
    }

    /// Parses the group's coordinates and keeps the requested axis.
    pub fn from_group(group: &PopulationGroup, axis: Axis) -> Result<Self> {
        let values = group
            .numeric_coordinates()?
            .iter()
            .map(|c| axis.select(c))
            .collect();
        Ok(AxisSample::new(&group.label, values))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn mean(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(AdmixError::EmptyGroup(self.label.clone()));
        }
        Ok(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }
}

/// Mean and population variance (divisor n) of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub mean: f64,
    pub variance: f64,
}

impl Moments {
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Computes the mean and population variance of a sample.
///
/// The variance divides by n, not n - 1. The ratio variance propagation
/// assumes n-divisor variances throughout, matching the cross-covariances.
///
/// # Arguments
/// * `sample` - Values of one population along one axis
///
/// # Returns
/// * `Moments` or `EmptyGroup` if the sample has no members
pub fn compute_moments(sample: &AxisSample) -> Result<Moments> {
    let mean = sample.mean()?;
    let n = sample.len() as f64;
    let variance = sample
        .values
        .iter()
        .map(|x| (x - mean).powi(2))
        .sum::<f64>()
        / n;
    Ok(Moments { mean, variance })
}

/// Empirical covariance over the full cross-product of two unpaired samples.
///
/// Every x in `x` is paired with every y in `y`; the accumulated products of
/// deviations are divided by |X|·|Y|. Swapping the arguments gives the same
/// value.
pub fn compute_cross_covariance(x: &AxisSample, y: &AxisSample) -> Result<f64> {
    let mean_x = x.mean()?;
    let mean_y = y.mean()?;
    let total: f64 = x
        .values
        .iter()
        .cartesian_product(y.values.iter())
        .map(|(xi, yj)| (xi - mean_x) * (yj - mean_y))
        .sum();
    Ok(total / (x.len() * y.len()) as f64)
}

/// Everything the ratio estimator needs: per-group moments on PC1 plus the
/// three cross-covariances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioInputs {
    pub admixed: Moments,
    pub reference_a: Moments,
    pub reference_b: Moments,
    pub cov_admixed_ref_b: f64,
    pub cov_admixed_ref_a: f64,
    pub cov_ref_a_ref_b: f64,
}

impl RatioInputs {
    pub fn from_samples(
        admixed: &AxisSample,
        reference_a: &AxisSample,
        reference_b: &AxisSample,
    ) -> Result<Self> {
        let inputs = RatioInputs {
            admixed: compute_moments(admixed)?,
            reference_a: compute_moments(reference_a)?,
            reference_b: compute_moments(reference_b)?,
            cov_admixed_ref_b: compute_cross_covariance(admixed, reference_b)?,
            cov_admixed_ref_a: compute_cross_covariance(admixed, reference_a)?,
            cov_ref_a_ref_b: compute_cross_covariance(reference_a, reference_b)?,
        };
        debug!(
            "PC1 moments: {} {:?}, {} {:?}, {} {:?}",
            admixed.label, inputs.admixed,
            reference_a.label, inputs.reference_a,
            reference_b.label, inputs.reference_b
        );
        debug!(
            "Cross-covariances: admixed/refB {}, admixed/refA {}, refA/refB {}",
            inputs.cov_admixed_ref_b, inputs.cov_admixed_ref_a, inputs.cov_ref_a_ref_b
        );
        Ok(inputs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioEstimate {
    pub ratio: f64,
    pub standard_error: f64,
    /// D1 = mean_refB - mean_admixed
    pub diff_admixed: f64,
    /// D2 = mean_refB - mean_refA
    pub diff_reference: f64,
    pub var_diff_admixed: f64,
    pub var_diff_reference: f64,
    pub cov_diffs: f64,
}

impl RatioEstimate {
    /// sqrt(var(D1)) / |D1|, or None when D1 is zero.
    pub fn relative_spread_admixed(&self) -> Option<f64> {
        if self.diff_admixed == 0.0 {
            None
        } else {
            Some(self.var_diff_admixed.sqrt() / self.diff_admixed.abs())
        }
    }

    /// sqrt(var(D2)) / |D2|. D2 is never zero for a constructed estimate.
    pub fn relative_spread_reference(&self) -> f64 {
        self.var_diff_reference.sqrt() / self.diff_reference.abs()
    }

    pub fn max_relative_spread(&self) -> f64 {
        self.relative_spread_admixed()
            .unwrap_or(0.0)
            .max(self.relative_spread_reference())
    }

    /// Whether both differences are small enough relative to their spread for
    /// the first-order propagation to be meaningful.
    pub fn linearization_is_reliable(&self) -> bool {
        self.max_relative_spread() <= LINEARIZATION_WARN_THRESHOLD
    }
}

/// Estimates the admixture ratio along PC1 and its Delta-method standard error.
///
/// ratio = (mean_refB - mean_admixed) / (mean_refB - mean_refA)
///
/// With D1 = refB - admixed and D2 = refB - refA:
///   var(D1)     = var_refB + var_admixed - 2 cov(admixed, refB)
///   var(D2)     = var_refB + var_refA - 2 cov(refA, refB)
///   cov(D1, D2) = var_refB - cov(admixed, refB) - cov(refA, refB) + cov(admixed, refA)
///   var(ratio)  = ratio² (var(D1)/D1² + var(D2)/D2² - 2 cov(D1, D2)/(D1 D2))
///
/// The last line is evaluated as (var(D1) - 2 ratio cov(D1, D2) + ratio² var(D2)) / D2²,
/// which is the same quantity and stays finite when D1 is zero.
pub fn estimate_ratio(inputs: &RatioInputs) -> Result<RatioEstimate> {
    let mean_admixed = inputs.admixed.mean;
    let mean_f = inputs.reference_a.mean;
    let mean_y = inputs.reference_b.mean;

    // Means that agree up to summation-order rounding count as equal.
    let diff_reference = mean_y - mean_f;
    let denominator_tolerance = DENOMINATOR_ULPS * f64::EPSILON * mean_y.abs().max(mean_f.abs());
    if diff_reference.abs() <= denominator_tolerance {
        return Err(AdmixError::DegenerateDenominator { mean: mean_y });
    }
    let diff_admixed = mean_y - mean_admixed;
    let ratio = diff_admixed / diff_reference;

    let var_y = inputs.reference_b.variance;
    let var_diff_admixed = var_y + inputs.admixed.variance - 2.0 * inputs.cov_admixed_ref_b;
    let var_diff_reference = var_y + inputs.reference_a.variance - 2.0 * inputs.cov_ref_a_ref_b;
    let cov_diffs =
        var_y - inputs.cov_admixed_ref_b - inputs.cov_ref_a_ref_b + inputs.cov_admixed_ref_a;
    debug!(
        "var(D1) = {}, var(D2) = {}, cov(D1, D2) = {}",
        var_diff_admixed, var_diff_reference, cov_diffs
    );

    let numerator =
        var_diff_admixed - 2.0 * ratio * cov_diffs + ratio * ratio * var_diff_reference;
    let mut var_ratio = numerator / (diff_reference * diff_reference);

    if var_ratio < 0.0 {
        // Rounding in the terms of the numerator can leave a tiny negative residue.
        let magnitude = var_diff_admixed.abs()
            + (2.0 * ratio * cov_diffs).abs()
            + (ratio * ratio * var_diff_reference).abs();
        let tolerance = 16.0 * f64::EPSILON * magnitude / (diff_reference * diff_reference);
        if var_ratio < -tolerance {
            return Err(AdmixError::NegativeVariance(var_ratio));
        }
        var_ratio = 0.0;
    }

    let estimate = RatioEstimate {
        ratio,
        standard_error: var_ratio.sqrt(),
        diff_admixed,
        diff_reference,
        var_diff_admixed,
        var_diff_reference,
        cov_diffs,
    };

    if !estimate.linearization_is_reliable() {
        warn!(
            "Relative spread {:.3} of the mean differences exceeds {}; \
             the first-order standard error is unreliable",
            estimate.max_relative_spread(),
            LINEARIZATION_WARN_THRESHOLD
        );
    }

    Ok(estimate)
}
