//! Loading of the pipeline's tab-separated result tables.
//!
//! Every chart in the dashboard consumes one of the analysis pipeline's
//! TSV outputs (serovar counts, plasmid entropy summaries, resistance-gene
//! statistics). The tables share no fixed schema, so rows are kept as
//! strings and columns are extracted by name with the type the consumer
//! needs.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("failed to read table: {0}")]
    Csv(#[from] csv::Error),

    #[error("table has no '{0}' column")]
    MissingColumn(String),

    #[error("row {row}, column '{column}': cannot parse '{value}' as a number")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}, column '{column}': count is negative ({value})")]
    NegativeCount {
        row: usize,
        column: String,
        value: i64,
    },

    #[error("table '{0}' contains no data rows")]
    Empty(String),
}

/// An in-memory copy of one TSV result table.
#[derive(Debug, Clone)]
pub struct SampleTable {
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl SampleTable {
    /// Loads a tab-separated table with a header row.
    pub fn from_tsv(path: &Path) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(false)
            .from_path(path)?;

        let index: HashMap<String, usize> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(|f| f.trim().to_string()).collect());
        }

        if rows.is_empty() {
            return Err(TableError::Empty(path.display().to_string()));
        }

        Ok(SampleTable { index, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    fn cell(&self, row: usize, col: usize) -> &str {
        self.rows[row].get(col).map(String::as_str).unwrap_or("")
    }

    /// Returns a column as raw strings.
    pub fn column_str(&self, name: &str) -> Result<Vec<&str>, TableError> {
        let col = self.column_index(name)?;
        Ok((0..self.rows.len()).map(|r| self.cell(r, col)).collect())
    }

    /// Returns a column parsed as floats. Row numbers in errors are 1-based
    /// data rows, matching what a user sees in the file below the header.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>, TableError> {
        let col = self.column_index(name)?;
        (0..self.rows.len())
            .map(|r| {
                let raw = self.cell(r, col);
                raw.parse::<f64>().map_err(|_| TableError::InvalidValue {
                    row: r + 1,
                    column: name.to_string(),
                    value: raw.to_string(),
                })
            })
            .collect()
    }

    /// Returns a column parsed as non-negative integer counts.
    pub fn column_u64(&self, name: &str) -> Result<Vec<u64>, TableError> {
        let col = self.column_index(name)?;
        (0..self.rows.len())
            .map(|r| {
                let raw = self.cell(r, col);
                let value = raw.parse::<i64>().map_err(|_| TableError::InvalidValue {
                    row: r + 1,
                    column: name.to_string(),
                    value: raw.to_string(),
                })?;
                if value < 0 {
                    return Err(TableError::NegativeCount {
                        row: r + 1,
                        column: name.to_string(),
                        value,
                    });
                }
                Ok(value as u64)
            })
            .collect()
    }

    /// Returns a fresh table containing only the rows whose value in
    /// `column` satisfies the predicate. The charts use this for the
    /// source's row filters (e.g. `plasmid > 10`).
    pub fn filter_f64<F>(&self, column: &str, keep: F) -> Result<SampleTable, TableError>
    where
        F: Fn(f64) -> bool,
    {
        let values = self.column_f64(column)?;
        let rows = self
            .rows
            .iter()
            .zip(&values)
            .filter(|(_, &v)| keep(v))
            .map(|(row, _)| row.clone())
            .collect();

        Ok(SampleTable {
            index: self.index.clone(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_table(path: &std::path::Path, content: &str) {
        let mut file = File::create(path).unwrap();
        writeln!(file, "{}", content).unwrap();
    }

    #[test]
    fn test_load_basic_table() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("serovar.txt");
        write_table(
            &file_path,
            "serovar\ttotal_samples\tcount_plasmid_positive_samples\n\
             Enteritidis\t120\t80\n\
             Typhimurium\t95\t40",
        );

        let table = SampleTable::from_tsv(&file_path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column_str("serovar").unwrap(),
            vec!["Enteritidis", "Typhimurium"]
        );
        assert_eq!(table.column_f64("total_samples").unwrap(), vec![120.0, 95.0]);
        assert_eq!(
            table.column_u64("count_plasmid_positive_samples").unwrap(),
            vec![80, 40]
        );
    }

    #[test]
    fn test_missing_column() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("t.txt");
        write_table(&file_path, "serovar\ttotal\nA\t1");

        let table = SampleTable::from_tsv(&file_path).unwrap();
        let err = table.column_f64("total_samples").unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(c) if c == "total_samples"));
    }

    #[test]
    fn test_bad_value_reports_row_and_column() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("t.txt");
        write_table(&file_path, "serovar\ttotal\nA\t10\nB\tnot_a_number");

        let table = SampleTable::from_tsv(&file_path).unwrap();
        match table.column_f64("total").unwrap_err() {
            TableError::InvalidValue { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "total");
                assert_eq!(value, "not_a_number");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_count_rejected() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("t.txt");
        write_table(&file_path, "serovar\tpositive\nA\t-3");

        let table = SampleTable::from_tsv(&file_path).unwrap();
        let err = table.column_u64("positive").unwrap_err();
        assert!(matches!(err, TableError::NegativeCount { value: -3, .. }));
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("empty.txt");
        write_table(&file_path, "serovar\ttotal");

        assert!(matches!(
            SampleTable::from_tsv(&file_path),
            Err(TableError::Empty(_))
        ));
    }

    #[test]
    fn test_filter_keeps_matching_rows() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("genes.txt");
        write_table(
            &file_path,
            "gene_id\tplasmid\nblaTEM-1\t50\naph(6)-Id\t3\ntet(A)\t11",
        );

        let table = SampleTable::from_tsv(&file_path).unwrap();
        let filtered = table.filter_f64("plasmid", |v| v > 10.0).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(
            filtered.column_str("gene_id").unwrap(),
            vec!["blaTEM-1", "tet(A)"]
        );
        // original table untouched
        assert_eq!(table.len(), 3);
    }
}
