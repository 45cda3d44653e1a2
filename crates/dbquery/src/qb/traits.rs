//! Trait definitions for statement builders.

use crate::client::Executor;
use crate::condition::Condition;
use crate::error::QueryResult;
use crate::predicate::{Conjunction, PredicateSet};
use crate::raw::{RawFragment, Statement};
use crate::row::FromRow;
use tokio_postgres::Row;

/// Default statement terminator.
pub const END: &str = ";";

fn log_execute(kind: &'static str, stmt: &Statement) {
    tracing::debug!(
        target: "dbquery.sql",
        query_type = kind,
        binds = stmt.binds.len(),
        sql = %stmt.sql,
        "executing statement"
    );
}

/// Base trait for all statement builders.
///
/// Provides serialization and row-returning execution.
pub trait SqlQb: Sync {
    /// Serialize with `end` appended instead of `;`.
    ///
    /// Pass `""` when the statement is embedded elsewhere (a CTE, a subquery).
    fn serialize_with_end(&self, end: &str) -> QueryResult<Statement>;

    /// Serialize to a `;`-terminated statement.
    fn serialize(&self) -> QueryResult<Statement> {
        self.serialize_with_end(END)
    }

    /// Debug helper: the SQL text, or the error message.
    fn to_sql(&self) -> String {
        match self.serialize() {
            Ok(stmt) => stmt.sql,
            Err(e) => format!("<invalid: {e}>"),
        }
    }

    /// Execute query and return all rows.
    fn query(
        &self,
        conn: &impl Executor,
    ) -> impl std::future::Future<Output = QueryResult<Vec<Row>>> + Send {
        async move {
            let stmt = self.serialize()?;
            log_execute("query", &stmt);
            conn.query(&stmt.sql, &stmt.params_ref()).await
        }
    }

    /// Execute query and return at most one row.
    fn query_opt(
        &self,
        conn: &impl Executor,
    ) -> impl std::future::Future<Output = QueryResult<Option<Row>>> + Send {
        async move {
            let stmt = self.serialize()?;
            log_execute("query_opt", &stmt);
            conn.query_opt(&stmt.sql, &stmt.params_ref()).await
        }
    }

    /// Execute query and return exactly one row.
    fn query_one(
        &self,
        conn: &impl Executor,
    ) -> impl std::future::Future<Output = QueryResult<Row>> + Send {
        async move {
            let stmt = self.serialize()?;
            log_execute("query_one", &stmt);
            conn.query_one(&stmt.sql, &stmt.params_ref()).await
        }
    }

    /// Execute query and map all rows to `T`.
    fn fetch_all<T: FromRow>(
        &self,
        conn: &impl Executor,
    ) -> impl std::future::Future<Output = QueryResult<Vec<T>>> + Send {
        async move {
            let rows = self.query(conn).await?;
            rows.iter().map(T::from_row).collect()
        }
    }

    /// Execute query and map at most one row to `T`.
    fn fetch_opt<T: FromRow>(
        &self,
        conn: &impl Executor,
    ) -> impl std::future::Future<Output = QueryResult<Option<T>>> + Send {
        async move {
            let row = self.query_opt(conn).await?;
            row.as_ref().map(T::from_row).transpose()
        }
    }

    /// Execute query and map exactly one row to `T`.
    fn fetch_one<T: FromRow>(
        &self,
        conn: &impl Executor,
    ) -> impl std::future::Future<Output = QueryResult<T>> + Send {
        async move {
            let row = self.query_one(conn).await?;
            T::from_row(&row)
        }
    }
}

/// Trait for mutation builders (INSERT/UPDATE/DELETE).
pub trait MutationQb: SqlQb {
    /// Execute and return affected row count.
    fn execute(
        &self,
        conn: &impl Executor,
    ) -> impl std::future::Future<Output = QueryResult<u64>> + Send {
        async move {
            let stmt = self.serialize()?;
            log_execute("execute", &stmt);
            conn.execute(&stmt.sql, &stmt.params_ref()).await
        }
    }
}

/// WHERE-clause methods shared by SELECT, UPDATE and DELETE.
pub trait WhereQb: Sized {
    #[doc(hidden)]
    fn where_set(&mut self) -> &mut PredicateSet;

    /// Table name applied to bare columns in conditions.
    #[doc(hidden)]
    fn qualifier(&self) -> Option<String> {
        None
    }

    /// Add an `AND` condition.
    fn filter(mut self, cond: Condition) -> Self {
        let fragment = cond.to_fragment(self.qualifier().as_deref());
        self.where_set().and(fragment);
        self
    }

    /// Add an `OR` condition.
    fn or_filter(mut self, cond: Condition) -> Self {
        let fragment = cond.to_fragment(self.qualifier().as_deref());
        self.where_set().or(fragment);
        self
    }

    /// Add a verbatim sub-expression; its `$1..$n` refer to its own binds.
    fn filter_raw(mut self, fragment: RawFragment) -> Self {
        self.where_set().raw(fragment);
        self
    }

    /// Open a group joined with `AND`.
    fn open_bracket(mut self) -> Self {
        self.where_set().open_bracket(Conjunction::And);
        self
    }

    /// Open a group joined with `OR`.
    fn or_open_bracket(mut self) -> Self {
        self.where_set().open_bracket(Conjunction::Or);
        self
    }

    fn close_bracket(mut self) -> Self {
        self.where_set().close_bracket();
        self
    }
}
