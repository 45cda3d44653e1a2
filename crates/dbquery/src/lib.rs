//! # dbquery
//!
//! Parameterized Postgres statement construction.
//!
//! ## Features
//!
//! - **Placeholder alignment**: `$N` always refers to `binds[N - 1]`, however
//!   the statement was composed (CTEs, joins, raw fragments, brackets)
//! - **Predicate engine**: AND/OR members and bracket groups merged into one
//!   clause; empty `IN` lists drop out without leaving a dangling conjunction
//! - **Literal passthrough**: a value that arrives pre-quoted (`'open'`) is
//!   inlined instead of bound
//! - **Typed misuse**: an ON without a join, a BETWEEN without two values or
//!   an unbalanced bracket surface as [`BuildError`] from `serialize()`
//! - **Execution**: any [`Executor`] (tokio-postgres client, transaction,
//!   deadpool client) runs the finished statement
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use dbquery::prelude::*;
//!
//! // SELECT
//! let users = qb::select(Ident::table("users"))
//!     .filter(Ident::column("status").eq("active"))
//!     .sort(&[Ident::column("created_at")], Direction::Desc)
//!     .limit(10)
//!     .fetch_all::<User>(&client)
//!     .await?;
//!
//! // INSERT
//! qb::insert(Ident::table("users"))
//!     .fields(&[Ident::column("username"), Ident::column("email")])
//!     .values([bind("alice"), bind("alice@example.com")])
//!     .execute(&client)
//!     .await?;
//!
//! // UPDATE
//! qb::update(Ident::table("users"))
//!     .set(Ident::column("status"), "inactive")
//!     .filter(Ident::column("id").eq(user_id))
//!     .execute(&client)
//!     .await?;
//!
//! // DELETE
//! qb::delete(Ident::table("users"))
//!     .filter(Ident::column("id").eq(user_id))
//!     .execute(&client)
//!     .await?;
//! ```

pub mod client;
pub mod condition;
pub mod error;
pub mod ident;
pub mod join;
pub mod paginate;
pub mod predicate;
pub mod prelude;
pub mod qb;
pub mod raw;
pub mod row;
pub mod transaction;
pub mod value;

pub use client::Executor;
pub use condition::Condition;
pub use error::{BuildError, QueryError, QueryResult};
pub use ident::Ident;
pub use join::{Join, JoinMethod};
pub use paginate::{Page, PageMetadata, PageRequest, PaginationConfig};
pub use predicate::{Conjunction, PredicateFragment, PredicateSet, Role};
pub use raw::{RawFragment, Statement};
pub use row::{FromRow, RowExt};
pub use transaction::IsolationLevel;
pub use value::{BindValue, Value, bind};

// Re-export qb module for easy access
pub use qb::{
    Aggregate, DeleteQb, Direction, InsertQb, MutationQb, RowLock, SelectQb, SqlQb, UpdateQb,
    WhereQb, delete, insert, select, update,
};
