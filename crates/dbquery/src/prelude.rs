//! Convenient imports for typical `dbquery` usage.
//!
//! ```ignore
//! use dbquery::prelude::*;
//! ```

pub use crate::qb::{self, Aggregate, Direction, MutationQb, RowLock, SqlQb, WhereQb};
pub use crate::{
    BuildError, Condition, Executor, FromRow, Ident, JoinMethod, Page, PageRequest, QueryError,
    QueryResult, RawFragment, RowExt, Value, bind,
};
