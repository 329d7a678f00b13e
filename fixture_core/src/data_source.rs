//! Table data sources. Rows are produced lazily so large fixtures are
//! streamed to the backend instead of materialized up front.

use crate::table::TableStatistics;
use errors::FixtureResult;
use std::fmt;

/// One table row; columns are positional.
pub type Row = Vec<serde_json::Value>;

pub type RowIter<'a> = Box<dyn Iterator<Item = FixtureResult<Row>> + Send + 'a>;

pub trait TableDataSource: Send + Sync + fmt::Debug {
    /// Relative location of the data below a manager's base path.
    fn path_suffix(&self) -> &str;

    fn rows(&self) -> FixtureResult<RowIter<'_>>;

    fn has_data(&self) -> bool {
        true
    }

    fn statistics(&self) -> Option<TableStatistics> {
        None
    }

    /// Content revision; unchanged data keeps its revision across runs.
    fn revision(&self) -> FixtureResult<String>;
}

/// Rows held in memory, mostly for built-in and test definitions.
#[derive(Debug, Clone)]
pub struct InlineDataSource {
    path_suffix: String,
    rows: Vec<Row>,
    statistics: Option<TableStatistics>
}

impl InlineDataSource {
    pub fn new(path_suffix: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            path_suffix: path_suffix.into(),
            rows,
            statistics: None
        }
    }

    pub fn with_statistics(mut self, statistics: TableStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }
}

impl TableDataSource for InlineDataSource {
    fn path_suffix(&self) -> &str {
        &self.path_suffix
    }

    fn rows(&self) -> FixtureResult<RowIter<'_>> {
        Ok(Box::new(self.rows.iter().cloned().map(Ok)))
    }

    fn statistics(&self) -> Option<TableStatistics> {
        self.statistics.clone()
    }

    fn revision(&self) -> FixtureResult<String> {
        Ok(utils::compute_rows_revision(self.rows.iter().map(Vec::as_slice)))
    }
}

#[derive(Debug, Clone)]
pub struct EmptyDataSource {
    path_suffix: String
}

impl EmptyDataSource {
    pub fn new(path_suffix: impl Into<String>) -> Self {
        Self {
            path_suffix: path_suffix.into()
        }
    }
}

impl TableDataSource for EmptyDataSource {
    fn path_suffix(&self) -> &str {
        &self.path_suffix
    }

    fn rows(&self) -> FixtureResult<RowIter<'_>> {
        Ok(Box::new(std::iter::empty()))
    }

    fn has_data(&self) -> bool {
        false
    }

    fn revision(&self) -> FixtureResult<String> {
        Ok("empty".to_string())
    }
}
