//! INSERT statement builder with multi-row VALUES and ON CONFLICT.

use crate::condition::Condition;
use crate::error::{BuildError, QueryResult};
use crate::ident::{Ident, write_quoted};
use crate::predicate::{PredicateFragment, PredicateSet, render_assignments};
use crate::qb::traits::{MutationQb, SqlQb};
use crate::qb::{write_ctes, write_returning};
use crate::raw::{RawFragment, Statement};
use crate::value::{BindValue, Value};

/// INSERT statement builder.
#[derive(Clone, Debug)]
pub struct InsertQb {
    /// WITH fragments
    ctes: Vec<RawFragment>,
    /// Target table
    table: Ident,
    /// Column list
    columns: Vec<Ident>,
    /// VALUES rows
    rows: Vec<Vec<BindValue>>,
    /// ON CONFLICT (columns)
    conflict_target: Option<Vec<Ident>>,
    do_nothing: bool,
    /// DO UPDATE SET assignments
    conflict_sets: Vec<PredicateFragment>,
    /// DO UPDATE ... WHERE
    conflict_where: PredicateSet,
    returning: Vec<Ident>,
    /// Build error
    build_error: Option<BuildError>,
}

impl InsertQb {
    /// Create a new INSERT builder for `table`.
    pub fn new(table: Ident) -> Self {
        Self {
            ctes: Vec::new(),
            table,
            columns: Vec::new(),
            rows: Vec::new(),
            conflict_target: None,
            do_nothing: false,
            conflict_sets: Vec::new(),
            conflict_where: PredicateSet::new(),
            returning: Vec::new(),
            build_error: None,
        }
    }

    fn fail(&mut self, err: BuildError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    pub fn with(mut self, cte: RawFragment) -> Self {
        self.ctes.push(cte);
        self
    }

    pub fn fields(mut self, columns: &[Ident]) -> Self {
        self.columns.extend_from_slice(columns);
        self
    }

    /// Append one row. Its length must match the column list when one is given.
    pub fn values(mut self, row: impl IntoIterator<Item = BindValue>) -> Self {
        let row: Vec<BindValue> = row.into_iter().collect();
        if !self.columns.is_empty() && row.len() != self.columns.len() {
            self.fail(BuildError::RowArity {
                expected: self.columns.len(),
                got: row.len(),
            });
            return self;
        }
        self.rows.push(row);
        self
    }

    pub fn reset_values(mut self) -> Self {
        self.rows.clear();
        self
    }

    pub fn returning(mut self, columns: &[Ident]) -> Self {
        self.returning.extend_from_slice(columns);
        self
    }

    // ==================== ON CONFLICT ====================

    /// `ON CONFLICT (columns)`; without further calls the action is `DO NOTHING`.
    pub fn on_conflict(mut self, columns: &[Ident]) -> Self {
        self.conflict_target = Some(columns.to_vec());
        self
    }

    pub fn do_nothing(mut self) -> Self {
        self.do_nothing = true;
        self
    }

    /// `DO UPDATE SET "col" = $N`
    pub fn set(mut self, column: Ident, value: impl Into<Value>) -> Self {
        self.conflict_sets
            .push(PredicateFragment::member(column.eq(value).to_assignment()));
        self
    }

    /// `DO UPDATE SET "col" = "<table>"."col" + $N`
    pub fn set_plus(self, column: Ident, value: impl Into<Value>) -> Self {
        self.set_arith(column, "+", value)
    }

    /// `DO UPDATE SET "col" = "<table>"."col" - $N`
    pub fn set_minus(self, column: Ident, value: impl Into<Value>) -> Self {
        self.set_arith(column, "-", value)
    }

    fn set_arith(mut self, column: Ident, op: &str, value: impl Into<Value>) -> Self {
        let mut text = String::new();
        write_quoted(&mut text, column.name());
        text.push_str(" = ");
        column
            .qualified_or(Some(self.table.reference()))
            .write_path(&mut text);
        text.push(' ');
        text.push_str(op);
        text.push(' ');
        self.conflict_sets
            .push(PredicateFragment::member(RawFragment::new(text).bind(value)));
        self
    }

    /// `DO UPDATE SET "col" = "excluded"."col"`
    pub fn set_excluded(mut self, column: Ident) -> Self {
        let excluded = Ident::column(column.name()).of("excluded");
        let fragment = column.eq_col(&excluded).to_assignment();
        self.conflict_sets.push(PredicateFragment::member(fragment));
        self
    }

    /// Assignment given as a condition, e.g. `Ident::column("name").eq("X")`.
    ///
    /// The target column is written without its qualifier.
    pub fn do_update_set(mut self, assignment: Condition) -> Self {
        self.conflict_sets
            .push(PredicateFragment::member(assignment.to_assignment()));
        self
    }

    /// `DO UPDATE ... WHERE <cond>`
    pub fn do_update_filter(mut self, cond: Condition) -> Self {
        self.conflict_where.and(cond.to_fragment(None));
        self
    }

    fn write_conflict(&self, out: &mut RawFragment) -> Result<(), BuildError> {
        if self.conflict_target.is_none() && !self.do_nothing && self.conflict_sets.is_empty() {
            return Ok(());
        }

        out.text.push_str(" ON CONFLICT");
        if let Some(target) = self.conflict_target.as_deref().filter(|t| !t.is_empty()) {
            out.text.push('(');
            for (i, column) in target.iter().enumerate() {
                if i > 0 {
                    out.text.push_str(", ");
                }
                write_quoted(&mut out.text, column.name());
            }
            out.text.push(')');
        }

        if self.do_nothing || self.conflict_sets.is_empty() {
            out.text.push_str(" DO NOTHING");
            return Ok(());
        }

        out.text.push_str(" DO UPDATE SET ");
        let sets = render_assignments(&self.conflict_sets, out.placeholder_count())?;
        if sets.text.is_empty() {
            return Err(BuildError::EmptySet);
        }
        out.push_rendered(sets);

        let filter = self.conflict_where.serialize(out.placeholder_count())?;
        if !filter.text.is_empty() {
            out.text.push_str(" WHERE ");
            out.push_rendered(filter);
        }
        Ok(())
    }
}

impl SqlQb for InsertQb {
    fn serialize_with_end(&self, end: &str) -> QueryResult<Statement> {
        if let Some(err) = &self.build_error {
            return Err(err.clone().into());
        }
        if self.rows.is_empty() && !self.columns.is_empty() {
            return Err(BuildError::RowArity {
                expected: self.columns.len(),
                got: 0,
            }
            .into());
        }

        let mut out = RawFragment::default();
        write_ctes(&mut out, &self.ctes);

        out.text.push_str("INSERT INTO ");
        self.table.write_sql(&mut out.text);

        if !self.columns.is_empty() {
            out.text.push_str(" (");
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    out.text.push_str(", ");
                }
                write_quoted(&mut out.text, column.name());
            }
            out.text.push(')');
        }

        if self.rows.is_empty() {
            out.text.push_str(" DEFAULT VALUES");
        } else {
            out.text.push_str(" VALUES ");
            for (r, row) in self.rows.iter().enumerate() {
                if r > 0 {
                    out.text.push_str(", ");
                }
                out.text.push('(');
                for (i, value) in row.iter().enumerate() {
                    if i > 0 {
                        out.text.push_str(", ");
                    }
                    out.push_value(value, None);
                }
                out.text.push(')');
            }
        }

        self.write_conflict(&mut out)?;
        write_returning(&mut out, &self.returning);

        Ok(Statement::finish(out, end))
    }
}

impl MutationQb for InsertQb {}
