//! UPDATE statement builder.

use crate::error::{BuildError, QueryResult};
use crate::ident::{Ident, write_quoted};
use crate::predicate::{PredicateFragment, PredicateSet, render_assignments};
use crate::qb::traits::{MutationQb, SqlQb, WhereQb};
use crate::qb::{write_ctes, write_returning, write_where};
use crate::raw::{RawFragment, Statement};
use crate::value::{BindValue, Value};

/// UPDATE statement builder.
#[derive(Clone, Debug)]
pub struct UpdateQb {
    ctes: Vec<RawFragment>,
    table: Ident,
    /// SET assignments
    sets: Vec<PredicateFragment>,
    /// Additional FROM targets
    from: Vec<Ident>,
    where_set: PredicateSet,
    /// `WHERE CURRENT OF`, wins over `where_set`
    cursor: Option<String>,
    returning: Vec<Ident>,
}

impl UpdateQb {
    /// Create a new UPDATE builder for `table`.
    pub fn new(table: Ident) -> Self {
        Self {
            ctes: Vec::new(),
            table,
            sets: Vec::new(),
            from: Vec::new(),
            where_set: PredicateSet::new(),
            cursor: None,
            returning: Vec::new(),
        }
    }

    pub fn with(mut self, cte: RawFragment) -> Self {
        self.ctes.push(cte);
        self
    }

    // ==================== SET ====================

    /// `"col" = $N`
    pub fn set(mut self, column: Ident, value: impl Into<Value>) -> Self {
        self.sets.push(assignment(&column, "", BindValue::new(value)));
        self
    }

    /// `"col" = $N::ty`
    pub fn set_cast(mut self, column: Ident, value: impl Into<Value>, ty: &str) -> Self {
        self.sets
            .push(assignment(&column, "", BindValue::new(value).cast(ty)));
        self
    }

    /// `"col" = "col" + $N`
    pub fn set_plus(mut self, column: Ident, value: impl Into<Value>) -> Self {
        self.sets.push(assignment(&column, "+", BindValue::new(value)));
        self
    }

    /// `"col" = "col" - $N`
    pub fn set_minus(mut self, column: Ident, value: impl Into<Value>) -> Self {
        self.sets.push(assignment(&column, "-", BindValue::new(value)));
        self
    }

    /// `"col" = <expr>`; the expression numbers its own placeholders.
    pub fn set_raw(mut self, column: Ident, expr: RawFragment) -> Self {
        let mut text = String::new();
        write_quoted(&mut text, column.name());
        text.push_str(" = ");
        let mut fragment = RawFragment::new(text);
        fragment.push_embedded(&expr);
        self.sets.push(PredicateFragment::raw(fragment));
        self
    }

    // ==================== FROM / CURSOR / RETURNING ====================

    pub fn from(mut self, table: Ident) -> Self {
        self.from.push(table);
        self
    }

    /// `WHERE CURRENT OF cursor`, replacing any filters.
    pub fn cursor(mut self, name: impl Into<String>) -> Self {
        self.cursor = Some(name.into());
        self
    }

    pub fn returning(mut self, columns: &[Ident]) -> Self {
        self.returning.extend_from_slice(columns);
        self
    }
}

/// `"col" = [ "col" <op> ] ` with one bind.
fn assignment(column: &Ident, op: &str, value: BindValue) -> PredicateFragment {
    let mut text = String::new();
    write_quoted(&mut text, column.name());
    text.push_str(" = ");
    if !op.is_empty() {
        write_quoted(&mut text, column.name());
        text.push(' ');
        text.push_str(op);
        text.push(' ');
    }
    PredicateFragment::member(RawFragment::with_binds(text, [value]))
}

impl WhereQb for UpdateQb {
    fn where_set(&mut self) -> &mut PredicateSet {
        &mut self.where_set
    }
}

impl SqlQb for UpdateQb {
    fn serialize_with_end(&self, end: &str) -> QueryResult<Statement> {
        let mut out = RawFragment::default();
        write_ctes(&mut out, &self.ctes);

        out.text.push_str("UPDATE ");
        self.table.write_sql(&mut out.text);

        let sets = render_assignments(&self.sets, out.placeholder_count())?;
        if sets.text.is_empty() {
            return Err(BuildError::EmptySet.into());
        }
        out.text.push_str(" SET ");
        out.push_rendered(sets);

        if !self.from.is_empty() {
            out.text.push_str(" FROM ");
            for (i, table) in self.from.iter().enumerate() {
                if i > 0 {
                    out.text.push_str(", ");
                }
                table.write_sql(&mut out.text);
            }
        }

        write_where(&mut out, self.cursor.as_deref(), &self.where_set)?;
        write_returning(&mut out, &self.returning);

        Ok(Statement::finish(out, end))
    }
}

impl MutationQb for UpdateQb {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::bind;

    #[test]
    fn test_update_basic() {
        let stmt = UpdateQb::new(Ident::table("users"))
            .set(Ident::column("status"), "inactive")
            .filter(Ident::column("id").eq(1_i64))
            .serialize()
            .unwrap();
        assert_eq!(
            stmt.sql,
            r#"UPDATE "users" SET "status" = $1 WHERE "id" = $2;"#
        );
        assert_eq!(stmt.binds, vec![bind("inactive"), bind(1_i64)]);
    }

    #[test]
    fn test_update_arith_from_and_returning() {
        let stmt = UpdateQb::new(Ident::table("accounts"))
            .set_plus(Ident::column("balance"), 100_i64)
            .set_minus(Ident::column("credits"), 1_i32)
            .set_cast(Ident::column("ref"), "abc", "uuid")
            .from(Ident::table("transfers").alias("t"))
            .filter(Ident::column("id").eq_col(&Ident::column("account_id").of("t")))
            .returning(&[Ident::column("balance")])
            .serialize()
            .unwrap();
        assert_eq!(
            stmt.sql,
            concat!(
                r#"UPDATE "accounts" SET "balance" = "balance" + $1, "credits" = "credits" - $2, "#,
                r#""ref" = $3::uuid FROM "transfers" AS "t" WHERE "id" = "t"."account_id" RETURNING "balance";"#
            )
        );
    }

    #[test]
    fn test_update_set_target_is_unqualified() {
        let sql = UpdateQb::new(Ident::table("users").alias("u"))
            .set(Ident::column("status").of("u"), "x")
            .set_plus(Ident::column("visits").of("u"), 1_i64)
            .to_sql();
        assert_eq!(
            sql,
            r#"UPDATE "users" AS "u" SET "status" = $1, "visits" = "visits" + $2;"#
        );
    }

    #[test]
    fn test_update_literal_set() {
        let stmt = UpdateQb::new(Ident::table("users"))
            .set(Ident::column("status"), "'archived'")
            .set(Ident::column("age"), 3_i32)
            .serialize()
            .unwrap();
        assert_eq!(
            stmt.sql,
            r#"UPDATE "users" SET "status" = 'archived', "age" = $1;"#
        );
        assert_eq!(stmt.binds.len(), 1);
    }

    #[test]
    fn test_update_cursor_wins() {
        let sql = UpdateQb::new(Ident::table("users"))
            .set(Ident::column("seen"), true)
            .filter(Ident::column("id").eq(1_i64))
            .cursor("c1")
            .to_sql();
        assert_eq!(
            sql,
            r#"UPDATE "users" SET "seen" = $1 WHERE CURRENT OF c1;"#
        );
    }

    #[test]
    fn test_update_requires_set() {
        let err = UpdateQb::new(Ident::table("users"))
            .filter(Ident::column("id").eq(1_i64))
            .serialize()
            .unwrap_err();
        assert!(err.is_build());
    }

    #[test]
    fn test_update_set_raw_and_cte() {
        let stmt = UpdateQb::new(Ident::table("users"))
            .with(RawFragment::with_binds(
                r#""src" AS (SELECT $1::int AS "n")"#,
                [bind(5_i32)],
            ))
            .set_raw(
                Ident::column("score"),
                RawFragment::with_binds("greatest($1, \"score\")", [bind(7_i32)]),
            )
            .serialize()
            .unwrap();
        assert_eq!(
            stmt.sql,
            r#"WITH "src" AS (SELECT $1::int AS "n") UPDATE "users" SET "score" = greatest($2, "score");"#
        );
    }
}
