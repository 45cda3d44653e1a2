//! Transaction statements and macros.
//!
//! The statements are fixed literals with no binds. [`transaction!`] and
//! [`savepoint!`] run them through any [`Executor`](crate::Executor), so the
//! same code works on a plain client or a pooled one.
//!
//! # Example
//!
//! ```ignore
//! use dbquery::prelude::*;
//! use dbquery::transaction::IsolationLevel;
//!
//! dbquery::transaction!(&client, IsolationLevel::Serializable, {
//!     qb::update(Ident::table("accounts"))
//!         .set_minus(Ident::column("balance"), 100_i64)
//!         .filter(Ident::column("id").eq(1_i64))
//!         .execute(&client)
//!         .await?;
//!     Ok::<_, QueryError>(())
//! })?;
//! ```

use crate::ident::quote;
use crate::raw::RawFragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Server default
    #[default]
    Default,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn as_sql(self) -> Option<&'static str> {
        match self {
            IsolationLevel::Default => None,
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

/// `BEGIN;`
pub fn begin() -> RawFragment {
    begin_with(IsolationLevel::Default)
}

/// `BEGIN ISOLATION LEVEL <level>;`
pub fn begin_with(level: IsolationLevel) -> RawFragment {
    match level.as_sql() {
        Some(level) => RawFragment::new(format!("BEGIN ISOLATION LEVEL {level};")),
        None => RawFragment::new("BEGIN;"),
    }
}

/// `SAVEPOINT "name";`
pub fn savepoint(name: &str) -> RawFragment {
    RawFragment::new(format!("SAVEPOINT {};", quote(name)))
}

/// `RELEASE SAVEPOINT "name";`
pub fn release(name: &str) -> RawFragment {
    RawFragment::new(format!("RELEASE SAVEPOINT {};", quote(name)))
}

/// `ROLLBACK;`
pub fn rollback() -> RawFragment {
    RawFragment::new("ROLLBACK;")
}

/// `ROLLBACK TO "name";`
pub fn rollback_to(name: &str) -> RawFragment {
    RawFragment::new(format!("ROLLBACK TO {};", quote(name)))
}

/// `COMMIT;`
pub fn commit() -> RawFragment {
    RawFragment::new("COMMIT;")
}

/// `END;`
pub fn end() -> RawFragment {
    RawFragment::new("END;")
}

/// Runs the given block inside a transaction on `$conn`.
///
/// - Issues `BEGIN` with the given isolation level.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `Result<T, E>` where `E: From<QueryError>`;
/// the macro evaluates to the same type.
#[macro_export]
macro_rules! transaction {
    ($conn:expr, { $($body:tt)* }) => {
        $crate::transaction!($conn, $crate::transaction::IsolationLevel::Default, { $($body)* })
    };
    ($conn:expr, $level:expr, { $($body:tt)* }) => {{
        let __dbquery_tx = $crate::transaction::__run(
            $conn,
            $crate::transaction::begin_with($level),
            $crate::transaction::commit(),
            $crate::transaction::rollback(),
        );
        match __dbquery_tx.begin().await {
            Ok(()) => {
                let __dbquery_result = async { $($body)* }.await;
                __dbquery_tx.finish(__dbquery_result).await
            }
            Err(e) => Err(e.into()),
        }
    }};
}

/// Runs the given block inside a savepoint of an open transaction.
///
/// - Issues `SAVEPOINT name`.
/// - Releases on `Ok(_)`.
/// - Rolls back to the savepoint on `Err(_)`.
#[macro_export]
macro_rules! savepoint {
    ($conn:expr, $name:expr, { $($body:tt)* }) => {{
        let __dbquery_name: &str = $name;
        let __dbquery_sp = $crate::transaction::__run(
            $conn,
            $crate::transaction::savepoint(__dbquery_name),
            $crate::transaction::release(__dbquery_name),
            $crate::transaction::rollback_to(__dbquery_name),
        );
        match __dbquery_sp.begin().await {
            Ok(()) => {
                let __dbquery_result = async { $($body)* }.await;
                __dbquery_sp.finish(__dbquery_result).await
            }
            Err(e) => Err(e.into()),
        }
    }};
}

#[doc(hidden)]
pub fn __run<E: crate::Executor>(
    conn: &E,
    open: RawFragment,
    ok: RawFragment,
    undo: RawFragment,
) -> Boundary<'_, E> {
    Boundary {
        conn,
        open,
        ok,
        undo,
    }
}

/// The three statements around one transaction or savepoint.
#[doc(hidden)]
pub struct Boundary<'a, E> {
    conn: &'a E,
    open: RawFragment,
    ok: RawFragment,
    undo: RawFragment,
}

impl<E: crate::Executor> Boundary<'_, E> {
    pub async fn begin(&self) -> crate::QueryResult<()> {
        tracing::debug!(target: "dbquery.sql", sql = %self.open.text, "transaction boundary");
        self.conn.execute(&self.open.text, &[]).await?;
        Ok(())
    }

    /// Commit (or release) on `Ok`, roll back on `Err`.
    pub async fn finish<T, Err>(&self, result: Result<T, Err>) -> Result<T, Err>
    where
        Err: From<crate::QueryError> + std::fmt::Display,
    {
        match result {
            Ok(value) => {
                tracing::debug!(target: "dbquery.sql", sql = %self.ok.text, "transaction boundary");
                self.conn.execute(&self.ok.text, &[]).await?;
                Ok(value)
            }
            Err(error) => {
                tracing::debug!(target: "dbquery.sql", sql = %self.undo.text, "transaction boundary");
                if let Err(rollback_err) = self.conn.execute(&self.undo.text, &[]).await {
                    tracing::warn!(
                        target: "dbquery.sql",
                        error = %rollback_err,
                        "rollback failed"
                    );
                    return Err(crate::QueryError::Other(format!(
                        "{error} (rollback failed: {rollback_err})"
                    ))
                    .into());
                }
                Err(error)
            }
        }
    }
}
