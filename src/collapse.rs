//! Folding of long-tail serovar rows into a single "others" bucket.
//!
//! Serovar count tables have a handful of dominant serovars and a long tail
//! of rare ones; plotting every row makes the bar chart unreadable. The
//! collapser keeps the top-ranked rows and folds the remainder into one
//! synthetic row whose counts are the sums of everything it absorbed.

use itertools::izip;
use serde::Serialize;

use crate::table::{SampleTable, TableError};

/// Column binding for a serovar count table.
///
/// The ranking column and the summed count columns are deliberately
/// independent: the pipeline ranks serovars by `total_samples` but the bar
/// chart stacks the plasmid-positive/negative split.
#[derive(Debug, Clone)]
pub struct CountColumns {
    pub label: String,
    pub rank: String,
    pub positive: String,
    pub negative: String,
}

impl Default for CountColumns {
    fn default() -> Self {
        CountColumns {
            label: "serovar".to_string(),
            rank: "total_samples".to_string(),
            positive: "count_plasmid_positive_samples".to_string(),
            negative: "count_plasmid_negative_samples".to_string(),
        }
    }
}

/// One labeled input row: a rank used for ordering and two summable counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRow {
    pub label: String,
    pub rank: f64,
    pub positive: u64,
    pub negative: u64,
}

/// One output row. The synthetic bucket's label records how many input rows
/// it absorbed, e.g. `"37_others"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollapsedRow {
    pub label: String,
    pub positive: u64,
    pub negative: u64,
}

/// Result of [`collapse_top_n`]: kept rows in rank order, then the synthetic
/// bucket last if any rows were folded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollapsedTable {
    pub rows: Vec<CollapsedRow>,
    /// Number of input rows folded into the synthetic bucket.
    pub folded: usize,
}

impl CollapsedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.label.clone()).collect()
    }

    pub fn positives(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.positive).collect()
    }

    pub fn negatives(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.negative).collect()
    }
}

/// Pulls the collapser's input rows out of a loaded table.
///
/// Fails on the first missing column, unparseable cell, or negative count;
/// no partial row set is ever returned.
pub fn extract_rows(
    table: &SampleTable,
    columns: &CountColumns,
) -> Result<Vec<CountRow>, TableError> {
    let labels = table.column_str(&columns.label)?;
    let ranks = table.column_f64(&columns.rank)?;
    let positives = table.column_u64(&columns.positive)?;
    let negatives = table.column_u64(&columns.negative)?;

    Ok(izip!(labels, ranks, positives, negatives)
        .map(|(label, rank, positive, negative)| CountRow {
            label: label.to_string(),
            rank,
            positive,
            negative,
        })
        .collect())
}

/// Keeps the `keep` highest-ranked rows and folds the rest into one
/// synthetic `"{k}_others"` row.
///
/// Rows are ordered by rank, descending; ties keep their input order.
/// `keep == 0` folds the entire table into a single bucket, and
/// `keep >= rows.len()` returns the sorted rows with no bucket at all.
/// Positive and negative totals are conserved in every case.
pub fn collapse_top_n(rows: &[CountRow], keep: usize) -> CollapsedTable {
    let mut sorted: Vec<&CountRow> = rows.iter().collect();
    // sort_by is stable, so equal ranks preserve input order
    sorted.sort_by(|a, b| b.rank.total_cmp(&a.rank));

    let (kept, tail) = sorted.split_at(keep.min(sorted.len()));

    let mut out: Vec<CollapsedRow> = kept
        .iter()
        .map(|r| CollapsedRow {
            label: r.label.clone(),
            positive: r.positive,
            negative: r.negative,
        })
        .collect();

    if !tail.is_empty() {
        out.push(CollapsedRow {
            label: format!("{}_others", tail.len()),
            positive: tail.iter().map(|r| r.positive).sum(),
            negative: tail.iter().map(|r| r.negative).sum(),
        });
    }

    CollapsedTable {
        folded: tail.len(),
        rows: out,
    }
}
