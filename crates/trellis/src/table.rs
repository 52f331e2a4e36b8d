//! Tabular data and the pagination state machine.

#![allow(missing_docs)]

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::ConfigError;

/// Request parameter carrying the requested page number.
pub const PAGE_NUMBER_PARAM: &str = "page_number";
/// Request parameter carrying the requested page size.
pub const PAGE_SIZE_PARAM: &str = "page_size";

pub type Cell = Option<String>;

/// Page boundaries for a table of `total_row_count` rows.
///
/// An out-of-range request never fails. Both a page below 1 and a page past
/// the last one resolve to page 1; the high case in particular does not
/// resolve to the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub total_row_count: usize,
    pub page_size: usize,
}

impl Pagination {
    /// A page size of 0 is treated as 1.
    #[must_use]
    pub fn new(total_row_count: usize, page_size: usize) -> Self {
        Self {
            total_row_count,
            page_size: page_size.max(1),
        }
    }

    /// `ceil(total / size)`, and never below 1 even for an empty table.
    #[must_use]
    pub fn last_page_number(&self) -> usize {
        self.total_row_count.div_ceil(self.page_size).max(1)
    }

    #[must_use]
    pub fn resolve(&self, requested: i64) -> usize {
        match usize::try_from(requested) {
            Ok(page) if (1..=self.last_page_number()).contains(&page) => page,
            _ => 1,
        }
    }

    /// Item numbers saturate, so counts read off the wire never overflow.
    #[must_use]
    pub fn window(&self, requested: i64) -> PageWindow {
        let page_number = self.resolve(requested);
        PageWindow {
            page_number,
            page_size: self.page_size,
            total_row_count: self.total_row_count,
            first_item_number: (page_number - 1)
                .saturating_mul(self.page_size)
                .saturating_add(1),
            last_item_number: page_number
                .saturating_mul(self.page_size)
                .min(self.total_row_count),
            last_page_number: self.last_page_number(),
        }
    }
}

/// Resolved page with the metadata a table displays under its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page_number: usize,
    pub page_size: usize,
    pub total_row_count: usize,
    pub first_item_number: usize,
    pub last_item_number: usize,
    pub last_page_number: usize,
}

impl PageWindow {
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.total_row_count, self.page_size)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page_number < self.last_page_number
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    /// Zero-based row range of this page inside the full table.
    #[must_use]
    pub fn row_range(&self) -> std::ops::Range<usize> {
        let start = self
            .page_number
            .saturating_sub(1)
            .saturating_mul(self.page_size);
        start.min(self.total_row_count)..self.last_item_number.max(start)
    }
}

/// Columns and rows of a table, possibly a single page of a larger one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableData {
    columns: Vec<SmolStr>,
    rows: Vec<Vec<Cell>>,
    total_row_count: usize,
    page: Option<PageWindow>,
}

impl TableData {
    pub fn new<I, S>(columns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let mut unique = Vec::new();
        for column in columns {
            let column = column.into();
            if unique.contains(&column) {
                return Err(ConfigError::DuplicateColumn(column));
            }
            unique.push(column);
        }
        Ok(Self {
            columns: unique,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn columns(&self) -> &[SmolStr] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Rows held by this instance; for a page, the rows of that page only.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row count of the whole table this data was cut from.
    #[must_use]
    pub fn total_row_count(&self) -> usize {
        self.total_row_count
    }

    #[must_use]
    pub fn page(&self) -> Option<&PageWindow> {
        self.page.as_ref()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), ConfigError> {
        if row.len() != self.columns.len() {
            return Err(ConfigError::RowWidth {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        self.total_row_count += 1;
        Ok(())
    }

    /// Appends a row given by column name. Missing columns become null cells
    /// and keys that match no column are ignored.
    pub fn append<K, V>(&mut self, values: &IndexMap<K, V>)
    where
        K: std::borrow::Borrow<str> + std::hash::Hash + Eq,
        V: AsRef<str>,
    {
        let row = self
            .columns
            .iter()
            .map(|column| values.get(column.as_str()).map(|v| v.as_ref().to_owned()))
            .collect();
        self.rows.push(row);
        self.total_row_count += 1;
    }

    /// Cuts one page out of the full table. Out-of-range page numbers resolve
    /// to page 1.
    #[must_use]
    pub fn page_of(&self, requested: i64, page_size: usize) -> TableData {
        let window = Pagination::new(self.rows.len(), page_size).window(requested);
        TableData {
            columns: self.columns.clone(),
            rows: self.rows[window.row_range()].to_vec(),
            total_row_count: self.rows.len(),
            page: Some(window),
        }
    }

    /// Cells of one row keyed by column. Null cells become empty strings.
    #[must_use]
    pub fn row_map(&self, index: usize) -> Option<IndexMap<String, String>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .zip(row)
                .map(|(column, cell)| (column.to_string(), cell.clone().unwrap_or_default()))
                .collect(),
        )
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let column = self.column_index(column)?;
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// Rebuilds decoded data. Callers validate widths before.
    pub(crate) fn from_parts(
        columns: Vec<SmolStr>,
        rows: Vec<Vec<Cell>>,
        total_row_count: usize,
        page: Option<PageWindow>,
    ) -> Self {
        Self {
            columns,
            rows,
            total_row_count,
            page,
        }
    }
}
