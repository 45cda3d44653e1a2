//! Statement builders.
//!
//! Each builder accumulates fragments through chained calls and walks them
//! once in `serialize()`, numbering `$N` placeholders in the order their
//! values are emitted.
//!
//! # Usage
//!
//! ```ignore
//! use dbquery::prelude::*;
//!
//! let planets = qb::select(Ident::table("planets").alias("p"))
//!     .filter(Ident::column("name").of("p").eq("Earth"))
//!     .limit(10)
//!     .fetch_all::<Planet>(&client)
//!     .await?;
//!
//! qb::insert(Ident::table("users"))
//!     .fields(&[Ident::column("email"), Ident::column("name")])
//!     .values([bind("a@example.com"), bind("Alice")])
//!     .on_conflict(&[Ident::column("email")])
//!     .set(Ident::column("name"), "Alice")
//!     .execute(&client)
//!     .await?;
//! ```

mod delete;
mod insert;
mod select;
mod traits;
mod update;


pub use delete::DeleteQb;
pub use insert::InsertQb;
pub use select::{Aggregate, Direction, RowLock, SelectQb};
pub use traits::{END, MutationQb, SqlQb, WhereQb};
pub use update::UpdateQb;

use crate::ident::Ident;
use crate::raw::RawFragment;

/// Create a SELECT builder for the given table.
pub fn select(table: Ident) -> SelectQb {
    SelectQb::new(table)
}

/// Create an INSERT builder for the given table.
pub fn insert(table: Ident) -> InsertQb {
    InsertQb::new(table)
}

/// Create an UPDATE builder for the given table.
pub fn update(table: Ident) -> UpdateQb {
    UpdateQb::new(table)
}

/// Create a DELETE builder for the given table.
pub fn delete(table: Ident) -> DeleteQb {
    DeleteQb::new(table)
}

/// `WITH a, b ` prefix. Each CTE's placeholders continue the running count.
pub(crate) fn write_ctes(out: &mut RawFragment, ctes: &[RawFragment]) {
    if ctes.is_empty() {
        return;
    }
    out.text.push_str("WITH ");
    for (i, cte) in ctes.iter().enumerate() {
        if i > 0 {
            out.text.push_str(", ");
        }
        out.push_embedded(cte);
    }
    out.text.push(' ');
}

/// ` RETURNING a, b`
pub(crate) fn write_returning(out: &mut RawFragment, columns: &[Ident]) {
    if columns.is_empty() {
        return;
    }
    out.text.push_str(" RETURNING ");
    crate::ident::write_path_list(&mut out.text, columns);
}

/// ` WHERE CURRENT OF cursor` when a cursor is set, else ` WHERE <predicate>`.
///
/// Misuse recorded on `predicates` is reported in both modes.
pub(crate) fn write_where(
    out: &mut RawFragment,
    cursor: Option<&str>,
    predicates: &crate::predicate::PredicateSet,
) -> Result<(), crate::error::BuildError> {
    if let Some(cursor) = cursor {
        predicates.check()?;
        out.text.push_str(" WHERE CURRENT OF ");
        write_cursor(&mut out.text, cursor);
        return Ok(());
    }
    let clause = predicates.serialize(out.placeholder_count())?;
    if !clause.text.is_empty() {
        out.text.push_str(" WHERE ");
        out.push_rendered(clause);
    }
    Ok(())
}

/// Plain names are written bare so they fold to lower case like the
/// `DECLARE` that opened them; anything else is quoted.
fn write_cursor(out: &mut String, name: &str) {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if plain {
        out.push_str(name);
    } else {
        crate::ident::write_quoted(out, name);
    }
}
