//! Native select query and write statements handed to the `Store`.

use crate::expr::{Expr, OrderExpr};
use crate::value::Value;

/// A select over one table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    pub table: String,
    /// Explicit column list; empty selects every column.
    pub columns: Vec<String>,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectQuery {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Restrict the selected columns.
    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a condition, AND-combined with any existing filter.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Append an order-by term.
    pub fn order_by(mut self, order: OrderExpr) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Same table and filter without ordering or paging, for counting.
    pub fn for_count(&self) -> Self {
        Self {
            table: self.table.clone(),
            columns: Vec::new(),
            filter: self.filter.clone(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

/// Conflict behaviour for an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnConflict {
    /// Ignore the conflicting row.
    DoNothing,
    /// Overwrite `columns` of the existing row matched on `target`.
    DoUpdate {
        columns: Vec<String>,
        target: Vec<String>,
    },
}

/// Insert of one or more rows into a table.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    /// One entry per row, each an ordered list of (column, value).
    pub rows: Vec<Vec<(String, Value)>>,
    pub on_conflict: Option<OnConflict>,
}

impl InsertStatement {
    /// Number of rows carried.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Update of rows matching a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub sets: Vec<(String, Value)>,
    pub filter: Option<Expr>,
}

/// Delete of rows matching a filter. No filter deletes every row.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub filter: Option<Expr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_combines_with_and() {
        let q = SelectQuery::from("users")
            .filter(Expr::col("a").eq(1))
            .filter(Expr::col("b").eq(2));
        assert_eq!(
            q.filter,
            Some(Expr::And(vec![Expr::col("a").eq(1), Expr::col("b").eq(2)]))
        );
    }

    #[test]
    fn test_for_count_drops_paging() {
        let q = SelectQuery::from("users")
            .filter(Expr::col("a").eq(1))
            .order_by(OrderExpr::asc("a"))
            .limit(10)
            .offset(20);
        let c = q.for_count();
        assert_eq!(c.filter, q.filter);
        assert!(c.order_by.is_empty());
        assert_eq!(c.limit, None);
        assert_eq!(c.offset, None);
    }
}
