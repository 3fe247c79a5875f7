//! Chart construction and HTML export.
//!
//! One method per figure in the dashboard, each writing a standalone HTML
//! file into the output directory and returning its path. The figures keep
//! the source pipeline's column names, filters, and export settings (PNG
//! button, 1200x600 canvas, per-chart scale factor).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use plotly::common::color::{Rgb, Rgba};
use plotly::common::{Anchor, DashType, Font, Line, Marker, Mode, Orientation, Title};
use plotly::configuration::{Configuration, ImageButtonFormats, ToImageButtonOptions};
use plotly::layout::{Axis, AxisType, BarMode, Legend};
use plotly::{Bar, Layout, Plot, Scatter};
use thiserror::Error;

use crate::collapse::CollapsedTable;
use crate::table::{SampleTable, TableError};
use crate::visualization::sunburst;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Largest marker drawn on size-mapped scatters, in pixels.
const MAX_MARKER_PX: usize = 60;
const MIN_MARKER_PX: usize = 4;

/// Stacked bar colors for plasmid-positive/negative sample counts. Also the
/// endpoints of the continuous marker color ramp.
const POSITIVE_COLOR: (u8, u8, u8) = (0x29, 0x78, 0xA0);
const NEGATIVE_COLOR: (u8, u8, u8) = (0xF1, 0x73, 0x00);

/// Qualitative palette for categorical traces (plotly's default cycle).
const CATEGORY_PALETTE: [(u8, u8, u8); 10] = [
    (0x1F, 0x77, 0xB4),
    (0xFF, 0x7F, 0x0E),
    (0x2C, 0xA0, 0x2C),
    (0xD6, 0x27, 0x28),
    (0x94, 0x67, 0xBD),
    (0x8C, 0x56, 0x4B),
    (0xE3, 0x77, 0xC2),
    (0x7F, 0x7F, 0x7F),
    (0xBC, 0xBD, 0x22),
    (0x17, 0xBE, 0xCF),
];

/// Writes the dashboard's figures into one output directory.
pub struct Plotter {
    output_dir: PathBuf,
}

impl Plotter {
    /// Creates a plotter, creating the output directory if needed.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, PlotError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }
        Ok(Plotter { output_dir })
    }

    /// Sunburst of resistance genes nested under drug classes, sized by
    /// `total` and colored by the chromosomal proportion.
    pub fn resistance_gene_sunburst(&self, table: &SampleTable) -> Result<PathBuf, PlotError> {
        let html = sunburst::build_html(table)?;
        let output_file = self.output_dir.join("resistance_gene_sunburst.html");
        fs::write(&output_file, html)?;
        Ok(output_file)
    }

    /// Per-gene entropy scatter over genes observed on more than
    /// `min_plasmid` plasmids: plasmid entropy vs serovar entropy, marker
    /// size from `total`, marker color from the human-host proportion.
    pub fn resistance_gene_scatter(
        &self,
        table: &SampleTable,
        min_plasmid: f64,
    ) -> Result<PathBuf, PlotError> {
        let table = table.filter_f64("plasmid", |v| v > min_plasmid)?;
        let x = table.column_f64("plasmid entropy")?;
        let y = table.column_f64("serovar entropy")?;
        let totals = table.column_f64("total")?;
        let human = table.column_f64("human proportion")?;
        let genes: Vec<String> = table
            .column_str("gene_id")?
            .into_iter()
            .map(str::to_string)
            .collect();

        let trace = Scatter::new(x, y)
            .mode(Mode::Markers)
            .text_array(genes)
            .marker(
                Marker::new()
                    .size_array(marker_sizes(&totals))
                    .color_array(color_ramp(&human)),
            );

        let mut plot = Plot::new();
        plot.add_trace(trace);
        plot.set_layout(
            Layout::new()
                .font(Font::new().size(14))
                .x_axis(Axis::new().title(Title::from("Plasmid entropy")))
                .y_axis(Axis::new().title(Title::from("Serovar entropy"))),
        );
        plot.set_configuration(export_config("resistance_gene_scatter", 3));

        let output_file = self.output_dir.join("resistance_gene_scatter.html");
        plot.write_html(&output_file);
        Ok(output_file)
    }

    /// Plasmid mobility scatter: serovar entropy vs total cluster members
    /// (log axis), one trace per mobility category.
    pub fn plasmid_mobility_scatter(&self, table: &SampleTable) -> Result<PathBuf, PlotError> {
        let table = table.filter_f64("serovar_entropy", |v| v >= 0.0)?;
        let entropy = table.column_f64("serovar_entropy")?;
        let samples = table.column_f64("total_samples")?;
        let mobility = table.column_str("overall_mobility")?;
        let plasmids = table.column_str("plasmid_id")?;

        let mut plot = Plot::new();
        add_category_traces(&mut plot, &entropy, &samples, &mobility, &plasmids, None);
        plot.set_layout(
            Layout::new()
                .font(Font::new().size(14))
                .x_axis(Axis::new().title(Title::from("Serovar entropy")))
                .y_axis(
                    Axis::new()
                        .title(Title::from("log(10) Total cluster members"))
                        .type_(AxisType::Log),
                )
                .legend(horizontal_legend().title(Title::from("Overall mobility"))),
        );
        plot.set_configuration(export_config("plasmid_mobility", 3));

        let output_file = self.output_dir.join("plasmid_mobility_scatter.html");
        plot.write_html(&output_file);
        Ok(output_file)
    }

    /// Resistance vs entropy per plasmid cluster, marker size from the
    /// cluster's sample count, one trace per mobility category.
    pub fn plasmid_resistance_scatter(&self, table: &SampleTable) -> Result<PathBuf, PlotError> {
        let resistant = table.column_f64("proportion_resistant")?;
        let entropy = table.column_f64("serovar_entropy")?;
        let samples = table.column_f64("total_samples")?;
        let mobility = table.column_str("overall_mobility")?;
        let plasmids = table.column_str("plasmid_id")?;

        let sizes = marker_sizes(&samples);
        let mut plot = Plot::new();
        add_category_traces(
            &mut plot,
            &resistant,
            &entropy,
            &mobility,
            &plasmids,
            Some(&sizes),
        );
        plot.set_layout(
            Layout::new()
                .font(Font::new().size(14))
                .x_axis(Axis::new().title(Title::from("Proportion resistant")))
                .y_axis(Axis::new().title(Title::from("Serovar entropy")))
                .legend(horizontal_legend().title(Title::from("Overall mobility"))),
        );
        plot.set_configuration(export_config("plasmid_resistance", 1));

        let output_file = self.output_dir.join("plasmid_resistance_scatter.html");
        plot.write_html(&output_file);
        Ok(output_file)
    }

    /// Chao1 richness estimate vs sample count per serovar, colored by the
    /// resistant proportion, with a least-squares trend line.
    pub fn serovar_richness_scatter(&self, table: &SampleTable) -> Result<PathBuf, PlotError> {
        let table = table.filter_f64("plasmid_chao1", |v| v >= 0.0)?;
        let x = table.column_f64("total_samples")?;
        let y = table.column_f64("plasmid_chao1")?;
        let resistant = table.column_f64("proportion_resistant")?;
        let serovars: Vec<String> = table
            .column_str("serovar")?
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut plot = Plot::new();

        if let Some((slope, intercept)) = ols_fit(&x, &y) {
            let (min_x, max_x) = bounds(&x);
            let line_x = vec![min_x, max_x];
            let line_y: Vec<f64> = line_x.iter().map(|v| intercept + slope * v).collect();
            plot.add_trace(
                Scatter::new(line_x, line_y)
                    .mode(Mode::Lines)
                    .line(
                        Line::new()
                            .color(Rgb::new(0x7F, 0x7F, 0x7F))
                            .dash(DashType::Dash)
                            .width(2.0),
                    )
                    .name("OLS trend")
                    .show_legend(false),
            );
        }

        plot.add_trace(
            Scatter::new(x, y)
                .mode(Mode::Markers)
                .text_array(serovars)
                .marker(Marker::new().size(9).color_array(color_ramp(&resistant))),
        );
        plot.set_layout(
            Layout::new()
                .font(Font::new().size(14))
                .x_axis(Axis::new().title(Title::from("Total samples")))
                .y_axis(Axis::new().title(Title::from("Plasmid Chao1 richness"))),
        );
        plot.set_configuration(export_config("serovar_richness", 3));

        let output_file = self.output_dir.join("serovar_richness_scatter.html");
        plot.write_html(&output_file);
        Ok(output_file)
    }

    /// Stacked bar of plasmid-positive/negative sample counts per serovar
    /// over a collapsed table, log-10 y axis.
    pub fn serovar_plasmid_bar(&self, collapsed: &CollapsedTable) -> Result<PathBuf, PlotError> {
        let labels = collapsed.labels();
        let (pr, pg, pb) = POSITIVE_COLOR;
        let (nr, ng, nb) = NEGATIVE_COLOR;

        let positive = Bar::new(labels.clone(), collapsed.positives())
            .name("positive")
            .marker(Marker::new().color(Rgb::new(pr, pg, pb)));
        let negative = Bar::new(labels, collapsed.negatives())
            .name("negative")
            .marker(Marker::new().color(Rgb::new(nr, ng, nb)));

        let mut plot = Plot::new();
        plot.add_trace(positive);
        plot.add_trace(negative);
        plot.set_layout(
            Layout::new()
                .bar_mode(BarMode::Stack)
                .paper_background_color(Rgba::new(0, 0, 0, 0.0))
                .x_axis(Axis::new().title(Title::from("Serovar")))
                .y_axis(
                    Axis::new()
                        .title(Title::from("log(10) Sample count"))
                        .type_(AxisType::Log),
                )
                .legend(Legend::new().title(Title::from("Plasmid presence"))),
        );
        plot.set_configuration(export_config("serovar_plasmid_frac", 2));

        let output_file = self.output_dir.join("serovar_plasmid_frac.html");
        plot.write_html(&output_file);
        Ok(output_file)
    }
}

/// One marker trace per category value, colored from the qualitative
/// palette, with the row labels as hover text.
fn add_category_traces(
    plot: &mut Plot,
    x: &[f64],
    y: &[f64],
    categories: &[&str],
    hover: &[&str],
    sizes: Option<&[usize]>,
) {
    let distinct: Vec<&str> = categories.iter().copied().unique().collect();

    for (ci, category) in distinct.iter().enumerate() {
        let idx: Vec<usize> = categories.iter().positions(|c| c == category).collect();
        let (r, g, b) = CATEGORY_PALETTE[ci % CATEGORY_PALETTE.len()];

        let mut marker = Marker::new().color(Rgb::new(r, g, b));
        marker = match sizes {
            Some(sizes) => marker.size_array(idx.iter().map(|&i| sizes[i]).collect()),
            None => marker.size(9),
        };

        let trace = Scatter::new(
            idx.iter().map(|&i| x[i]).collect::<Vec<_>>(),
            idx.iter().map(|&i| y[i]).collect::<Vec<_>>(),
        )
        .mode(Mode::Markers)
        .name(*category)
        .text_array(idx.iter().map(|&i| hover[i].to_string()).collect::<Vec<_>>())
        .marker(marker);

        plot.add_trace(trace);
    }
}

/// Legend across the top of the plot area, anchored above the top-right
/// corner so it never overlaps the traces.
fn horizontal_legend() -> Legend {
    Legend::new()
        .orientation(Orientation::Horizontal)
        .y(1.02)
        .y_anchor(Anchor::Bottom)
        .x(1.0)
        .x_anchor(Anchor::Right)
}

/// PNG export button settings shared by all figures.
fn export_config(filename: &str, scale: usize) -> Configuration {
    Configuration::new().to_image_button_options(
        ToImageButtonOptions::new()
            .format(ImageButtonFormats::Png)
            .filename(filename)
            .width(1200)
            .height(600)
            .scale(scale),
    )
}

/// Scales raw magnitudes to marker pixel sizes with the largest value at
/// [`MAX_MARKER_PX`]. Square root keeps marker *area* proportional.
fn marker_sizes(values: &[f64]) -> Vec<usize> {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return vec![MIN_MARKER_PX; values.len()];
    }
    values
        .iter()
        .map(|v| {
            let px = (v.max(0.0) / max).sqrt() * MAX_MARKER_PX as f64;
            px.round().max(MIN_MARKER_PX as f64) as usize
        })
        .collect()
}

/// Maps a continuous column onto marker colors by interpolating between the
/// dashboard's two brand colors (low = blue, high = orange).
fn color_ramp(values: &[f64]) -> Vec<Rgb> {
    let (min, max) = bounds(values);
    let span = max - min;

    values
        .iter()
        .map(|v| {
            let t = if span > 0.0 { (v - min) / span } else { 0.5 };
            Rgb::new(
                lerp_channel(POSITIVE_COLOR.0, NEGATIVE_COLOR.0, t),
                lerp_channel(POSITIVE_COLOR.1, NEGATIVE_COLOR.1, t),
                lerp_channel(POSITIVE_COLOR.2, NEGATIVE_COLOR.2, t),
            )
        })
        .collect()
}

fn lerp_channel(low: u8, high: u8, t: f64) -> u8 {
    (low as f64 + (high as f64 - low as f64) * t).round() as u8
}

fn bounds(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

/// Ordinary least squares fit. Returns `(slope, intercept)`, or `None` when
/// the points cannot determine a line.
fn ols_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|v| (v - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mean_x) * (b - mean_y)).sum();
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collapse::{collapse_top_n, CountRow};
    use approx::assert_relative_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_marker_sizes_scale_to_max() {
        let sizes = marker_sizes(&[100.0, 25.0, 0.0]);
        assert_eq!(sizes, vec![60, 30, MIN_MARKER_PX]);
    }

    #[test]
    fn test_marker_sizes_all_zero() {
        assert_eq!(marker_sizes(&[0.0, 0.0]), vec![MIN_MARKER_PX; 2]);
    }

    #[test]
    fn test_color_ramp_endpoints() {
        let colors = color_ramp(&[0.0, 1.0]);
        assert_eq!(format!("{:?}", colors[0]), format!("{:?}", Rgb::new(0x29, 0x78, 0xA0)));
        assert_eq!(format!("{:?}", colors[1]), format!("{:?}", Rgb::new(0xF1, 0x73, 0x00)));
    }

    #[test]
    fn test_ols_fit_recovers_line() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.5 * v - 1.0).collect();
        let (slope, intercept) = ols_fit(&x, &y).unwrap();
        assert_relative_eq!(slope, 2.5, epsilon = 1e-12);
        assert_relative_eq!(intercept, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ols_fit_degenerate_input() {
        assert!(ols_fit(&[1.0], &[2.0]).is_none());
        assert!(ols_fit(&[3.0, 3.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_serovar_bar_written_to_disk() {
        let rows = vec![
            CountRow {
                label: "Enteritidis".to_string(),
                rank: 120.0,
                positive: 80,
                negative: 40,
            },
            CountRow {
                label: "Typhimurium".to_string(),
                rank: 95.0,
                positive: 40,
                negative: 55,
            },
            CountRow {
                label: "Infantis".to_string(),
                rank: 12.0,
                positive: 7,
                negative: 5,
            },
        ];
        let collapsed = collapse_top_n(&rows, 2);

        let dir = tempdir().unwrap();
        let plotter = Plotter::new(dir.path().join("charts")).unwrap();
        let path = plotter.serovar_plasmid_bar(&collapsed).unwrap();

        assert!(path.exists());
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("1_others"));
    }

    #[test]
    fn test_mobility_scatter_written_to_disk() {
        let dir = tempdir().unwrap();
        let table_path = dir.path().join("plasmids.txt");
        let mut file = File::create(&table_path).unwrap();
        writeln!(
            file,
            "plasmid_id\tserovar_entropy\ttotal_samples\toverall_mobility\tproportion_resistant\n\
             AA474\t1.2\t300\tconjugative\t0.4\n\
             AB550\t0.3\t80\tmobilizable\t0.9\n\
             AC001\t-1\t10\tnon-mobilizable\t0.1"
        )
        .unwrap();

        let table = crate::table::SampleTable::from_tsv(&table_path).unwrap();
        let plotter = Plotter::new(dir.path().join("charts")).unwrap();
        let path = plotter.plasmid_mobility_scatter(&table).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        // the serovar_entropy < 0 row is filtered out
        assert!(html.contains("AA474"));
        assert!(!html.contains("AC001"));
        // legend sits above the top-right corner of the plot area
        assert!(html.contains("\"yanchor\":\"bottom\""));
        assert!(html.contains("\"xanchor\":\"right\""));
    }
}
