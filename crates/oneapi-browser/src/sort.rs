//! Column sort state

use oneapi_core::{SortColumn, SortOrder};

/// Active sort column and direction. Unset means server default order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    column: Option<SortColumn>,
    order: SortOrder,
}

impl SortState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `column` already active in `order`
    pub fn sorted(column: SortColumn, order: SortOrder) -> Self {
        Self {
            column: Some(column),
            order,
        }
    }

    pub fn column(&self) -> Option<SortColumn> {
        self.column
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// `(column, order)` to send with a query, if a column is active
    pub fn active(&self) -> Option<(SortColumn, SortOrder)> {
        self.column.map(|c| (c, self.order))
    }

    /// Clicking the active column flips the direction; any other column
    /// becomes active, descending.
    pub fn toggle(&mut self, column: SortColumn) -> (SortColumn, SortOrder) {
        if self.column == Some(column) {
            self.order = self.order.flipped();
        } else {
            self.column = Some(column);
            self.order = SortOrder::Desc;
        }
        (column, self.order)
    }

    /// Arrow to show next to a column header, empty for inactive columns
    pub fn indicator(&self, column: SortColumn) -> &'static str {
        if self.column == Some(column) {
            self.order.arrow()
        } else {
            ""
        }
    }
}
