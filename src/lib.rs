//! Naive admixture-ratio estimation from principal-component projections.
//!
//! The estimator reads a smartpca eigenvector listing, selects one admixed
//! population and two references, and places the admixed PC1 mean on the
//! line between the reference means. The standard error is propagated through
//! the ratio with a first-order (Delta-method) linearization.
//!
//! The `missing` module backs the separate `missing_data` binary, which
//! corrupts EIGENSTRAT genotype matrices for simulation studies. It shares no
//! types with the estimator.

// Module declarations
pub mod missing;
pub mod parse;
pub mod plot;
pub mod process;
pub mod report;
pub mod stats;

#[cfg(test)]
mod tests;
