//! Pipe-delimited row format used by data files and object store uploads.
//!
//! One row per line, fields separated by `|`, `\N` for NULL.

use errors::{FixtureError, FixtureResult};
use fixture_core::{Row, RowIter, TableDataSource, TableStatistics};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub const FIELD_SEPARATOR: char = '|';
pub const NULL_MARKER: &str = "\\N";

pub fn parse_row(line: &str) -> Row {
    line.split(FIELD_SEPARATOR)
        .map(|field| {
            if field == NULL_MARKER {
                Value::Null
            } else {
                Value::String(field.to_string())
            }
        })
        .collect()
}

pub fn format_row(row: &[Value]) -> String {
    row.iter()
        .map(|value| match value {
            Value::Null => NULL_MARKER.to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string()
        })
        .collect::<Vec<_>>()
        .join(&FIELD_SEPARATOR.to_string())
}

/// Serializes every row of `source`, one per line.
pub fn render(source: &dyn TableDataSource) -> FixtureResult<Vec<u8>> {
    let mut out = String::new();
    for row in source.rows()? {
        out.push_str(&format_row(&row?));
        out.push('\n');
    }
    Ok(out.into_bytes())
}

/// Rows read lazily from a delimited file. Blank lines and lines starting
/// with `--` are skipped.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    path: PathBuf,
    path_suffix: String,
    statistics: Option<TableStatistics>
}

impl FileDataSource {
    pub fn new(path: impl Into<PathBuf>, path_suffix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            path_suffix: path_suffix.into(),
            statistics: None
        }
    }

    pub fn with_statistics(mut self, statistics: TableStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableDataSource for FileDataSource {
    fn path_suffix(&self) -> &str {
        &self.path_suffix
    }

    fn rows(&self) -> FixtureResult<RowIter<'_>> {
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(Box::new(reader.lines().filter_map(|line| match line {
            Ok(line) if line.trim().is_empty() || line.starts_with("--") => None,
            Ok(line) => Some(Ok(parse_row(&line))),
            Err(e) => Some(Err(FixtureError::Io(e)))
        })))
    }

    fn statistics(&self) -> Option<TableStatistics> {
        self.statistics.clone()
    }

    fn revision(&self) -> FixtureResult<String> {
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(utils::compute_content_hash(&contents))
    }
}
