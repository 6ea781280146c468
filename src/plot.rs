use crate::parse::{Coordinate, EigenvectorListing, PopulationPartition};
use crate::process::{AdmixError, Result};

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const PLOT_SIZE: (u32, u32) = (1000, 800);

/// The three-population assumption is fixed here as in the estimator: the
/// admixed group is green, the first reference red, the second blue.
fn population_colors() -> [RGBColor; 3] {
    [GREEN, RED, BLUE]
}

struct ScatterSeries<'a> {
    label: &'a str,
    color: RGBColor,
    points: Vec<Coordinate>,
}

fn plot_err<E: std::fmt::Display>(e: E) -> AdmixError {
    AdmixError::Plot(e.to_string())
}

/// Axis range covering `values` padded by 10%; a zero-width range is widened by 1
/// on each side.
fn padded_range<I: Iterator<Item = f64>>(values: I) -> std::ops::Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return -1.0..1.0;
    }
    let span = max - min;
    if span == 0.0 {
        return (min - 1.0)..(max + 1.0);
    }
    (min - span * 0.1)..(max + span * 0.1)
}

/// Renders a PC1/PC2 scatter of the admixed population and its two references.
///
/// A `.svg` extension selects the SVG backend; any other path is written as a
/// bitmap whose format follows the extension.
pub fn render_scatter(
    listing: &EigenvectorListing,
    partition: &PopulationPartition,
    output_path: &Path,
) -> Result<()> {
    let mut series = Vec::with_capacity(3);
    for (label, color) in partition.labels().into_iter().zip(population_colors()) {
        let group = listing.groups.get(label)?;
        series.push(ScatterSeries {
            label,
            color,
            points: group.numeric_coordinates()?,
        });
    }

    let is_svg = output_path
        .extension()
        .and_then(|s| s.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        let root = SVGBackend::new(output_path, PLOT_SIZE).into_drawing_area();
        draw_scatter(root, &series, &listing.meta.eig1, &listing.meta.eig2)
    } else {
        let root = BitMapBackend::new(output_path, PLOT_SIZE).into_drawing_area();
        draw_scatter(root, &series, &listing.meta.eig1, &listing.meta.eig2)
    }
}

fn draw_scatter<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    series: &[ScatterSeries],
    eig1: &str,
    eig2: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let x_range = padded_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.pc1)));
    let y_range = padded_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.pc2)));

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Simulation data compared against ancestor populations in PC",
            ("sans-serif", 24),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(format!("Principal Component 1, eigenvalue: {}", eig1))
        .y_desc(format!("Principal Component 2, eigenvalue: {}", eig2))
        .draw()
        .map_err(plot_err)?;

    for s in series {
        let color = s.color;
        chart
            .draw_series(
                s.points
                    .iter()
                    .map(move |p| Circle::new((p.pc1, p.pc2), 4, color.filled())),
            )
            .map_err(plot_err)?
            .label(s.label)
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
