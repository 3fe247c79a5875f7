//! Command-line interface.
//!
//! One subcommand per result table, plus `all` to reproduce the full
//! dashboard in a single run. Table paths and the output directory are
//! always arguments; nothing is hardcoded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use crate::collapse::{self, CountColumns};
use crate::table::SampleTable;
use crate::visualization::Plotter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Exploratory charts over plasmid/serovar/resistance-gene pipeline tables", long_about = None)]
pub struct Cli {
    /// Directory the chart HTML files are written to.
    #[arg(short, long, default_value = "dashboard")]
    pub output: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serovar plasmid-fraction bar chart from a serovar count table.
    Serovars {
        /// Serovar count table (TSV), e.g. serovar.txt.
        table: PathBuf,

        /// Number of top-ranked serovars kept before the rest fold into an
        /// "others" bucket. 0 folds everything.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Column used to rank serovars before folding.
        #[arg(long, default_value = "total_samples")]
        rank_by: String,

        /// Also render the Chao1 richness scatter from the same table.
        #[arg(long)]
        richness: bool,
    },

    /// Resistance-gene sunburst from a gene summary table.
    Genes {
        /// Gene summary table (TSV), e.g. genes.txt.
        table: PathBuf,
    },

    /// Per-gene entropy scatter from a resistance-gene table.
    ResistanceGenes {
        /// Resistance-gene table (TSV), e.g. salmonella_res_genes.txt.
        table: PathBuf,

        /// Only plot genes observed on more than this many plasmids.
        #[arg(long, default_value_t = 10.0)]
        min_plasmid: f64,
    },

    /// Mobility and resistance scatters from a plasmid entropy table.
    Plasmids {
        /// Plasmid entropy table (TSV), e.g. plasmid_serovar_entropy.txt.
        table: PathBuf,
    },

    /// Render every chart in one run.
    All {
        /// Serovar count table (TSV).
        #[arg(long)]
        serovar_table: PathBuf,

        /// Gene summary table (TSV).
        #[arg(long)]
        gene_table: PathBuf,

        /// Resistance-gene table (TSV).
        #[arg(long)]
        resistance_gene_table: PathBuf,

        /// Plasmid entropy table (TSV).
        #[arg(long)]
        plasmid_table: PathBuf,

        /// Number of top-ranked serovars kept unfolded.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Column used to rank serovars before folding.
        #[arg(long, default_value = "total_samples")]
        rank_by: String,

        /// Also render the Chao1 richness scatter from the serovar table.
        #[arg(long)]
        richness: bool,

        /// Plasmid-count filter for the resistance-gene scatter.
        #[arg(long, default_value_t = 10.0)]
        min_plasmid: f64,
    },
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> Result<()> {
    let plotter = Plotter::new(&cli.output)
        .with_context(|| format!("creating output directory '{}'", cli.output.display()))?;
    info!("Writing charts to {}", cli.output.display());

    match cli.command {
        Commands::Serovars {
            table,
            top,
            rank_by,
            richness,
        } => {
            serovar_charts(&plotter, &table, top, &rank_by, richness)?;
        }
        Commands::Genes { table } => {
            gene_sunburst(&plotter, &table)?;
        }
        Commands::ResistanceGenes { table, min_plasmid } => {
            resistance_gene_charts(&plotter, &table, min_plasmid)?;
        }
        Commands::Plasmids { table } => {
            plasmid_charts(&plotter, &table)?;
        }
        Commands::All {
            serovar_table,
            gene_table,
            resistance_gene_table,
            plasmid_table,
            top,
            rank_by,
            richness,
            min_plasmid,
        } => {
            plasmid_charts(&plotter, &plasmid_table)?;
            gene_sunburst(&plotter, &gene_table)?;
            resistance_gene_charts(&plotter, &resistance_gene_table, min_plasmid)?;
            serovar_charts(&plotter, &serovar_table, top, &rank_by, richness)?;
        }
    }

    Ok(())
}

fn load_table(path: &Path) -> Result<SampleTable> {
    info!("Loading table {}", path.display());
    SampleTable::from_tsv(path).with_context(|| format!("loading table '{}'", path.display()))
}

fn serovar_charts(
    plotter: &Plotter,
    path: &Path,
    top: usize,
    rank_by: &str,
    richness: bool,
) -> Result<()> {
    let table = load_table(path)?;

    let columns = CountColumns {
        rank: rank_by.to_string(),
        ..CountColumns::default()
    };
    let rows = collapse::extract_rows(&table, &columns)?;
    let collapsed = collapse::collapse_top_n(&rows, top);
    info!(
        "Collapsed {} serovars to {} bar groups ({} folded)",
        rows.len(),
        collapsed.len(),
        collapsed.folded
    );

    let chart = plotter.serovar_plasmid_bar(&collapsed)?;
    println!("Generated serovar abundance chart: {}", chart.display());

    if richness {
        let chart = plotter.serovar_richness_scatter(&table)?;
        println!("Generated serovar richness chart: {}", chart.display());
    }

    Ok(())
}

fn gene_sunburst(plotter: &Plotter, path: &Path) -> Result<()> {
    let table = load_table(path)?;
    let chart = plotter.resistance_gene_sunburst(&table)?;
    println!("Generated resistance gene sunburst: {}", chart.display());
    Ok(())
}

fn resistance_gene_charts(plotter: &Plotter, path: &Path, min_plasmid: f64) -> Result<()> {
    let table = load_table(path)?;
    let chart = plotter.resistance_gene_scatter(&table, min_plasmid)?;
    println!("Generated resistance gene scatter: {}", chart.display());
    Ok(())
}

fn plasmid_charts(plotter: &Plotter, path: &Path) -> Result<()> {
    let table = load_table(path)?;
    let chart = plotter.plasmid_mobility_scatter(&table)?;
    println!("Generated plasmid mobility chart: {}", chart.display());
    let chart = plotter.plasmid_resistance_scatter(&table)?;
    println!("Generated plasmid resistance chart: {}", chart.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exposes_the_serovar_flags() {
        let cli = Cli::try_parse_from([
            "plasmid_dashboard",
            "all",
            "--serovar-table",
            "serovar.txt",
            "--gene-table",
            "genes.txt",
            "--resistance-gene-table",
            "res_genes.txt",
            "--plasmid-table",
            "plasmids.txt",
        ])
        .unwrap();

        match cli.command {
            Commands::All {
                top,
                rank_by,
                richness,
                ..
            } => {
                // defaults match the serovars subcommand
                assert_eq!(top, 10);
                assert_eq!(rank_by, "total_samples");
                assert!(!richness);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_all_accepts_rank_and_richness_overrides() {
        let cli = Cli::try_parse_from([
            "plasmid_dashboard",
            "all",
            "--serovar-table",
            "serovar.txt",
            "--gene-table",
            "genes.txt",
            "--resistance-gene-table",
            "res_genes.txt",
            "--plasmid-table",
            "plasmids.txt",
            "--top",
            "5",
            "--rank-by",
            "count_plasmid_positive_samples",
            "--richness",
        ])
        .unwrap();

        match cli.command {
            Commands::All {
                top,
                rank_by,
                richness,
                ..
            } => {
                assert_eq!(top, 5);
                assert_eq!(rank_by, "count_plasmid_positive_samples");
                assert!(richness);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
