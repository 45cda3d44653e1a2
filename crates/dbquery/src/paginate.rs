//! Offset pagination over a [`SelectQb`].
//!
//! The count query and the row query run concurrently; either failing fails
//! the page.

use crate::client::Executor;
use crate::error::QueryResult;
use crate::qb::{Aggregate, SelectQb, SqlQb};
use crate::row::FromRow;
use serde::{Deserialize, Serialize};

/// Page size policy.
///
/// # Example
/// ```ignore
/// let config = PaginationConfig::new().with_default_per(20).with_max_per(50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when the request names none.
    pub default_per: i64,
    /// Upper bound for the page size.
    pub max_per: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per: 100,
            max_per: 100,
        }
    }
}

impl PaginationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_per(mut self, per: i64) -> Self {
        self.default_per = per;
        self
    }

    pub fn with_max_per(mut self, per: i64) -> Self {
        self.max_per = per;
        self
    }
}

/// Requested page, typically deserialized from a query string (`?page=2&per=10`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub per: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, per: i64) -> Self {
        Self {
            page: Some(page),
            per: Some(per),
        }
    }

    /// 1-based page number, at least 1.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `[1, max_per]`.
    pub fn per(&self, config: &PaginationConfig) -> i64 {
        self.per
            .unwrap_or(config.default_per)
            .clamp(1, config.max_per.max(1))
    }

    pub fn offset(&self, config: &PaginationConfig) -> i64 {
        (self.page() - 1).saturating_mul(self.per(config))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub page: i64,
    pub per: i64,
    pub total: i64,
}

impl PageMetadata {
    /// Number of pages, never less than 1.
    pub fn page_count(&self) -> i64 {
        let per = self.per.max(1);
        ((self.total + per - 1) / per).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub metadata: PageMetadata,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            metadata: self.metadata,
        }
    }
}

impl SelectQb {
    /// Fetch one page using the default [`PaginationConfig`].
    pub async fn paginate<T: FromRow>(
        &self,
        conn: &impl Executor,
        request: PageRequest,
    ) -> QueryResult<Page<T>> {
        self.paginate_with(conn, request, &PaginationConfig::default())
            .await
    }

    pub async fn paginate_with<T: FromRow>(
        &self,
        conn: &impl Executor,
        request: PageRequest,
        config: &PaginationConfig,
    ) -> QueryResult<Page<T>> {
        let page = request.page();
        let per = request.per(config);
        let offset = request.offset(config);

        let count_qb = self.count_query();
        let rows_qb = self.clone().limit(per).offset(offset);

        tracing::debug!(target: "dbquery.sql", page, per, offset, "fetching page");

        let (total, items) = tokio::try_join!(
            count_qb.aggregate_value::<i64>(conn, Aggregate::Count, &[]),
            rows_qb.fetch_all::<T>(conn),
        )?;

        Ok(Page {
            items,
            metadata: PageMetadata { page, per, total },
        })
    }
}
