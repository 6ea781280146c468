use crate::parse::{EigenvectorListing, PopulationPartition};
use crate::process::{AdmixtureAnalysis, Result};
use crate::stats::{compute_moments, Axis, AxisSample, LINEARIZATION_WARN_THRESHOLD};

use colored::*;
use prettytable::{row, Table};

const ROLES: [&str; 3] = ["Admixed", "Reference A", "Reference B"];

/// Plain-text report in fixed order: admixed PC1 moments, admixed PC2 moments,
/// then the ratio with its standard error.
pub fn render_report(analysis: &AdmixtureAnalysis) -> String {
    let admixed = &analysis.partition.admixed;
    let pc1 = &analysis.admixed_pc1;
    let pc2 = &analysis.admixed_pc2;
    let estimate = &analysis.estimate;

    let mut out = format!(
        "Estimated mean and deviation of {admixed} on the first principal component:\n\
         {} +/- {}\n\
         \n\
         Estimated mean and deviation of {admixed} on the second principal component:\n\
         {} +/- {}\n\
         \n\
         Naive estimation of admixture ratio based on principal component analysis:\n\
         {} +/- {}\n",
        pc1.mean,
        pc1.std_dev(),
        pc2.mean,
        pc2.std_dev(),
        estimate.ratio,
        estimate.standard_error
    );

    if !estimate.linearization_is_reliable() {
        out.push_str(&format!(
            "\nNote: relative spread {:.3} exceeds {}; \
             the standard error above is a poor approximation.\n",
            estimate.max_relative_spread(),
            LINEARIZATION_WARN_THRESHOLD
        ));
    }
    out
}

/// Tabulates size and per-axis moments of the three selected populations.
pub fn group_summary_table(
    listing: &EigenvectorListing,
    partition: &PopulationPartition,
) -> Result<String> {
    let mut table = Table::new();
    table.add_row(row!["Role", "Population", "N", "PC1 mean", "PC1 sd", "PC2 mean", "PC2 sd"]);

    for (role, label) in ROLES.iter().zip(partition.labels()) {
        let group = listing.groups.get(label)?;
        let pc1 = compute_moments(&AxisSample::from_group(group, Axis::Pc1)?)?;
        let pc2 = compute_moments(&AxisSample::from_group(group, Axis::Pc2)?)?;
        table.add_row(row![
            role,
            label,
            group.len(),
            format!("{:.6}", pc1.mean),
            format!("{:.6}", pc1.std_dev()),
            format!("{:.6}", pc2.mean),
            format!("{:.6}", pc2.std_dev())
        ]);
    }

    let mut output = Vec::new();
    table.print(&mut output)?;
    Ok(String::from_utf8_lossy(&output).into_owned())
}

pub fn display_group_summary(
    listing: &EigenvectorListing,
    partition: &PopulationPartition,
) -> Result<()> {
    let table_string = group_summary_table(listing, partition)?;
    print!(
        "\n{}\n{}",
        "Selected Populations:".green().bold(),
        table_string
    );
    Ok(())
}
