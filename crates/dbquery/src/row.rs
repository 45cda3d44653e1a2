//! Row mapping traits and utilities

use crate::error::{QueryError, QueryResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust type.
///
/// Implement this by hand (or via a derive in a model layer) for every type
/// fetched through [`SqlQb::fetch_all`](crate::SqlQb::fetch_all) and friends.
pub trait FromRow: Sized {
    /// Convert a row into Self.
    fn from_row(row: &Row) -> QueryResult<Self>;
}

/// Extension trait for Row to provide convenient column access.
pub trait RowExt {
    /// Get a column value by name, mapping failures to [`QueryError::Decode`].
    fn try_get_column<'a, T>(&'a self, column: &str) -> QueryResult<T>
    where
        T: FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<'a, T>(&'a self, column: &str) -> QueryResult<T>
    where
        T: FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| QueryError::decode(column, e.to_string()))
    }
}

/// Single-column rows decode into the column's value.
macro_rules! impl_from_row_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &Row) -> QueryResult<Self> {
                    row.try_get(0).map_err(|e| QueryError::decode("0", e.to_string()))
                }
            }
        )*
    };
}

impl_from_row_scalar!(
    i32,
    i64,
    f64,
    bool,
    String,
    uuid::Uuid,
    chrono::DateTime<chrono::Utc>,
    serde_json::Value,
);
