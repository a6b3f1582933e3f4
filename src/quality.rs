//! Lightweight data quality checks
//!
//! Diagnostics only: checks never fail and never touch the rows they inspect.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use rusqlite::types::Value;
use tracing::{info, warn};

use crate::metrics::PipelineMetrics;
use crate::models::TableRow;
use crate::schema::{attachments, messages};

/// Rows flagged by the checks.
#[derive(Debug, Clone)]
pub struct QualityReport<R> {
    /// Nulls per checked column, zero counts included
    pub null_counts: BTreeMap<&'static str, usize>,
    /// Rows with a null in at least one checked column
    pub null_rows: Vec<R>,
    /// Every row whose key is shared with another row
    pub duplicate_rows: Vec<R>,
    /// Union of `null_rows` and `duplicate_rows` without repeats
    pub issues: Vec<R>,
}

impl<R> Default for QualityReport<R> {
    fn default() -> Self {
        Self {
            null_counts: BTreeMap::new(),
            null_rows: Vec::new(),
            duplicate_rows: Vec::new(),
            issues: Vec::new(),
        }
    }
}

impl<R> QualityReport<R> {
    /// True when no anomaly was found
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Null and duplicate-key scanner.
#[derive(Debug, Clone)]
pub struct QualityChecker {
    exclude: Vec<String>,
    key: Vec<String>,
}

impl Default for QualityChecker {
    fn default() -> Self {
        Self {
            exclude: vec![attachments::CONTENT_ID.to_string()],
            key: vec![
                messages::EMAIL_ID.to_string(),
                messages::MESSAGE_ID.to_string(),
            ],
        }
    }
}

impl QualityChecker {
    /// Checker that ignores `content_id` nulls and keys on `(email_id, message_id)`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns left out of the null scan
    #[must_use]
    pub fn with_excluded<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Columns forming the duplicate key
    #[must_use]
    pub fn with_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Count nulls per checked column and return rows holding any.
    pub fn check_nulls<R>(&self, rows: &[R]) -> (BTreeMap<&'static str, usize>, Vec<R>)
    where
        R: TableRow + Clone,
    {
        let checked: Vec<(usize, &'static str)> = R::COLUMNS
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, column)| !self.exclude.iter().any(|e| e == column))
            .collect();

        let mut counts: BTreeMap<&'static str, usize> =
            checked.iter().map(|(_, column)| (*column, 0)).collect();
        let mut flagged = Vec::new();

        for row in rows {
            let values = row.sql_values();
            let mut has_null = false;
            for (index, column) in &checked {
                if matches!(values.get(*index), Some(Value::Null)) {
                    *counts.entry(*column).or_default() += 1;
                    has_null = true;
                }
            }
            if has_null {
                flagged.push(row.clone());
            }
        }

        info!("Null counts per column: {counts:?}");
        info!("Total rows with nulls: {}", flagged.len());
        (counts, flagged)
    }

    /// Every row sharing its key with at least one other row (all copies kept).
    pub fn check_duplicates<R>(&self, rows: &[R]) -> Vec<R>
    where
        R: TableRow + Clone,
    {
        let key_indices: Vec<usize> = self
            .key
            .iter()
            .filter_map(|k| R::COLUMNS.iter().position(|c| c == k))
            .collect();
        if key_indices.is_empty() {
            return Vec::new();
        }

        let keys: Vec<Vec<Option<String>>> = rows
            .iter()
            .map(|row| {
                let values = row.sql_values();
                key_indices
                    .iter()
                    .map(|&i| values.get(i).and_then(key_part))
                    .collect()
            })
            .collect();

        let mut occurrences: HashMap<&Vec<Option<String>>, usize> = HashMap::new();
        for key in &keys {
            *occurrences.entry(key).or_default() += 1;
        }

        let duplicates: Vec<R> = rows
            .iter()
            .zip(&keys)
            .filter(|(_, key)| occurrences.get(key).copied().unwrap_or(0) > 1)
            .map(|(row, _)| row.clone())
            .collect();

        info!("Found {} duplicate rows based on {:?}", duplicates.len(), self.key);
        duplicates
    }

    /// Run both checks over `rows`; `name` only labels the logs.
    pub fn run<R>(&self, rows: &[R], name: &str) -> QualityReport<R>
    where
        R: TableRow + Clone + Eq + Hash,
    {
        if rows.is_empty() {
            warn!("{name} is empty, skipping data quality checks.");
            return QualityReport::default();
        }

        info!(
            "Running DQ checks on {name} with shape ({}, {})",
            rows.len(),
            R::COLUMNS.len()
        );

        let (null_counts, null_rows) = self.check_nulls(rows);
        let duplicate_rows = self.check_duplicates(rows);

        let mut seen: HashSet<&R> = HashSet::new();
        let issues: Vec<R> = null_rows
            .iter()
            .chain(&duplicate_rows)
            .filter(|row| seen.insert(*row))
            .cloned()
            .collect();

        info!("Total rows with issues in {name}: {}", issues.len());
        PipelineMetrics::record_quality_issues(name, issues.len());

        QualityReport {
            null_counts,
            null_rows,
            duplicate_rows,
            issues,
        }
    }
}

fn key_part(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Text(t) => Some(t.clone()),
        Value::Blob(b) => Some(format!("{b:?}")),
    }
}
