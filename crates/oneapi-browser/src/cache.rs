//! Incremental page cache
//!
//! Rows are keyed by their absolute position in the result list, so a page
//! fetched out of order leaves unwritten positions empty instead of
//! shifting its neighbours.

use std::collections::BTreeMap;

use oneapi_core::LogEntry;

/// Fetched log rows keyed by absolute offset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageCache {
    rows: BTreeMap<usize, LogEntry>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything and store `rows` at positions `0..rows.len()`
    pub fn replace(&mut self, rows: Vec<LogEntry>) {
        self.rows = rows.into_iter().enumerate().collect();
    }

    /// Overwrite `[page·page_size, page·page_size + rows.len())`.
    ///
    /// Every other position is left as it was.
    pub fn write_page(&mut self, page: usize, page_size: usize, rows: Vec<LogEntry>) {
        let start = page * page_size;
        for (i, row) in rows.into_iter().enumerate() {
            self.rows.insert(start + i, row);
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows actually stored
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// One past the highest written position
    pub fn extent(&self) -> usize {
        self.rows
            .keys()
            .next_back()
            .map(|last| last + 1)
            .unwrap_or(0)
    }

    pub fn get(&self, position: usize) -> Option<&LogEntry> {
        self.rows.get(&position)
    }

    /// Pages covered completely by the cached extent
    pub fn full_pages(&self, page_size: usize) -> usize {
        self.extent() / page_size.max(1)
    }

    /// Pages the pager offers: every cached page plus one more when the
    /// extent ends exactly on a page boundary
    pub fn page_count(&self, page_size: usize) -> usize {
        let page_size = page_size.max(1);
        let extent = self.extent();
        let pages = extent.div_ceil(page_size);
        if extent % page_size == 0 {
            pages + 1
        } else {
            pages
        }
    }

    /// Borrowed view of one page
    pub fn page(&self, page: usize, page_size: usize) -> PageSlice<'_> {
        let start = page * page_size;
        let rows = self
            .rows
            .range(start..start + page_size)
            .map(|(position, row)| (*position, row))
            .collect();
        PageSlice {
            page,
            start,
            page_size,
            rows,
        }
    }
}

/// Read-only view of the rows of one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice<'a> {
    page: usize,
    start: usize,
    page_size: usize,
    rows: Vec<(usize, &'a LogEntry)>,
}

impl<'a> PageSlice<'a> {
    pub fn page(&self) -> usize {
        self.page
    }

    /// Absolute position of the first slot of this page
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stored rows with their absolute positions, in order
    pub fn rows(&self) -> impl Iterator<Item = (usize, &'a LogEntry)> + '_ {
        self.rows.iter().copied()
    }

    /// Stored rows without positions
    pub fn entries(&self) -> impl Iterator<Item = &'a LogEntry> + '_ {
        self.rows.iter().map(|(_, row)| *row)
    }

    /// Whether some slot inside the page was never written
    pub fn has_holes(&self) -> bool {
        match self.rows.last() {
            Some((last, _)) => last + 1 - self.start != self.rows.len(),
            None => false,
        }
    }
}
