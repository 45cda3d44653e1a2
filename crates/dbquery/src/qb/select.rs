//! SELECT statement builder.

use crate::client::Executor;
use crate::condition::Condition;
use crate::error::{BuildError, QueryError, QueryResult};
use crate::ident::{Ident, write_path_list};
use crate::join::{Join, JoinMethod};
use crate::predicate::{Conjunction, PredicateSet};
use crate::qb::traits::{SqlQb, WhereQb};
use crate::qb::write_ctes;
use crate::raw::{RawFragment, Statement};
use tokio_postgres::types::FromSql;

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
    NullsFirst,
    NullsLast,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
            Direction::NullsFirst => " NULLS FIRST",
            Direction::NullsLast => " NULLS LAST",
        }
    }
}

/// Aggregate function replacing the select list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl Aggregate {
    pub fn as_sql(self) -> &'static str {
        match self {
            Aggregate::Avg => "avg",
            Aggregate::Count => "count",
            Aggregate::Max => "max",
            Aggregate::Min => "min",
            Aggregate::Sum => "sum",
        }
    }
}

/// Row-level lock strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

impl RowLock {
    fn as_sql(self) -> &'static str {
        match self {
            RowLock::Update => " FOR UPDATE",
            RowLock::NoKeyUpdate => " FOR NO KEY UPDATE",
            RowLock::Share => " FOR SHARE",
            RowLock::KeyShare => " FOR KEY SHARE",
        }
    }
}

/// SELECT statement builder.
///
/// `Clone` gives an independent deep copy; pagination relies on it to derive
/// a count query without touching the original.
#[derive(Clone, Debug)]
pub struct SelectQb {
    /// WITH fragments
    ctes: Vec<RawFragment>,
    /// FROM targets
    from: Vec<Ident>,
    /// Select list; empty means `"<first target>".*`
    columns: Vec<RawFragment>,
    /// DISTINCT (empty list) or DISTINCT ON (columns)
    distinct: Option<Vec<Ident>>,
    aggregate: Option<Aggregate>,
    joins: Vec<Join>,
    /// Index of the join targeted by `on` / `or_on`
    current_join: Option<usize>,
    /// WHERE conditions
    where_set: PredicateSet,
    group_by: Vec<Ident>,
    /// HAVING conditions
    having_set: PredicateSet,
    /// ORDER BY items, rendered
    order: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    lock: Option<RowLock>,
    no_wait: bool,
    /// Build error
    build_error: Option<BuildError>,
}

impl SelectQb {
    /// Create a new SELECT builder reading from `table`.
    pub fn new(table: Ident) -> Self {
        Self {
            ctes: Vec::new(),
            from: vec![table],
            columns: Vec::new(),
            distinct: None,
            aggregate: None,
            joins: Vec::new(),
            current_join: None,
            where_set: PredicateSet::new(),
            group_by: Vec::new(),
            having_set: PredicateSet::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
            no_wait: false,
            build_error: None,
        }
    }

    fn fail(&mut self, err: BuildError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    /// Add a CTE fragment (see [`RawFragment::cte`]).
    pub fn with(mut self, cte: RawFragment) -> Self {
        self.ctes.push(cte);
        self
    }

    /// Add another FROM target.
    pub fn from(mut self, table: Ident) -> Self {
        self.from.push(table);
        self
    }

    // ==================== SELECT columns ====================

    /// Append a column (rendered with its alias, if any).
    pub fn field(mut self, column: Ident) -> Self {
        self.columns.push(RawFragment::new(column.to_sql()));
        self
    }

    pub fn fields(mut self, columns: &[Ident]) -> Self {
        self.columns
            .extend(columns.iter().map(|c| RawFragment::new(c.to_sql())));
        self
    }

    /// Append an expression; its `$1..$n` refer to its own binds.
    pub fn field_raw(mut self, expr: RawFragment) -> Self {
        self.columns.push(expr);
        self
    }

    /// Append `"<table>".*` for the given table or alias.
    pub fn all_fields(mut self, table: &Ident) -> Self {
        self.columns.push(RawFragment::new(table.all_columns_sql()));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = Some(Vec::new());
        self
    }

    pub fn distinct_on(mut self, columns: &[Ident]) -> Self {
        self.distinct = Some(columns.to_vec());
        self
    }

    /// Replace the select list with `fn(columns)`; `LIMIT`/`OFFSET` are cleared.
    ///
    /// With no columns the argument is `"<first target>".*`.
    pub fn aggregate(mut self, function: Aggregate, columns: &[Ident]) -> Self {
        self.columns = columns
            .iter()
            .map(|c| RawFragment::new(c.path_sql()))
            .collect();
        self.aggregate = Some(function);
        self.limit = None;
        self.offset = None;
        self
    }

    // ==================== JOIN ====================

    /// Declare a join; following `on` / `or_on` calls target it.
    pub fn join(mut self, table: Ident, method: JoinMethod) -> Self {
        self.joins.push(Join::new(&table, method));
        self.current_join = Some(self.joins.len() - 1);
        self
    }

    pub fn inner_join(self, table: Ident) -> Self {
        self.join(table, JoinMethod::Inner)
    }

    pub fn left_join(self, table: Ident) -> Self {
        self.join(table, JoinMethod::Left)
    }

    pub fn right_join(self, table: Ident) -> Self {
        self.join(table, JoinMethod::Right)
    }

    pub fn full_join(self, table: Ident) -> Self {
        self.join(table, JoinMethod::Full)
    }

    pub fn cross_join(self, table: Ident) -> Self {
        self.join(table, JoinMethod::Cross)
    }

    fn with_current_join(mut self, f: impl FnOnce(&mut Join)) -> Self {
        match self.current_join.and_then(|i| self.joins.get_mut(i)) {
            Some(join) => f(join),
            None => self.fail(BuildError::NoJoin),
        }
        self
    }

    /// `AND` condition on the last declared join.
    pub fn on(self, cond: Condition) -> Self {
        self.with_current_join(|j| j.on(&cond))
    }

    /// `OR` condition on the last declared join.
    pub fn or_on(self, cond: Condition) -> Self {
        self.with_current_join(|j| j.or_on(&cond))
    }

    pub fn on_raw(self, fragment: RawFragment) -> Self {
        self.with_current_join(|j| j.on_raw(fragment))
    }

    pub fn on_open_bracket(self) -> Self {
        self.with_current_join(|j| j.open_bracket(Conjunction::And))
    }

    pub fn on_close_bracket(self) -> Self {
        self.with_current_join(|j| j.close_bracket())
    }

    // ==================== GROUP / HAVING / ORDER ====================

    pub fn group_by(mut self, columns: &[Ident]) -> Self {
        self.group_by.extend_from_slice(columns);
        self
    }

    pub fn having(mut self, cond: Condition) -> Self {
        self.having_set.and(cond.to_fragment(None));
        self
    }

    pub fn or_having(mut self, cond: Condition) -> Self {
        self.having_set.or(cond.to_fragment(None));
        self
    }

    /// ORDER BY each column in `direction`.
    pub fn sort(mut self, columns: &[Ident], direction: Direction) -> Self {
        for column in columns {
            let mut item = column.path_sql();
            item.push_str(direction.as_sql());
            self.order.push(item);
        }
        self
    }

    // ==================== LIMIT / OFFSET / LOCK ====================

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn lock(mut self, lock: RowLock) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn no_wait(mut self) -> Self {
        self.no_wait = true;
        self
    }

    /// Count-only copy: no ORDER BY, inner joins only, no LIMIT/OFFSET.
    pub(crate) fn count_query(&self) -> SelectQb {
        let mut qb = self.clone();
        qb.order.clear();
        qb.joins.retain(|j| j.method() == JoinMethod::Inner);
        qb.current_join = None;
        qb.aggregate(Aggregate::Count, &[])
    }

    // ==================== Aggregates (executing) ====================

    /// `count(...)` of the current query. No row decodes to 0.
    pub async fn count(&self, conn: &impl Executor, columns: &[Ident]) -> QueryResult<i64> {
        self.aggregate_value(conn, Aggregate::Count, columns).await
    }

    pub async fn avg<T>(&self, conn: &impl Executor, columns: &[Ident]) -> QueryResult<T>
    where
        T: for<'a> FromSql<'a> + Default,
    {
        self.aggregate_value(conn, Aggregate::Avg, columns).await
    }

    pub async fn max<T>(&self, conn: &impl Executor, columns: &[Ident]) -> QueryResult<T>
    where
        T: for<'a> FromSql<'a> + Default,
    {
        self.aggregate_value(conn, Aggregate::Max, columns).await
    }

    pub async fn min<T>(&self, conn: &impl Executor, columns: &[Ident]) -> QueryResult<T>
    where
        T: for<'a> FromSql<'a> + Default,
    {
        self.aggregate_value(conn, Aggregate::Min, columns).await
    }

    pub async fn sum<T>(&self, conn: &impl Executor, columns: &[Ident]) -> QueryResult<T>
    where
        T: for<'a> FromSql<'a> + Default,
    {
        self.aggregate_value(conn, Aggregate::Sum, columns).await
    }

    /// Run `function(columns)`; a missing row or a NULL result yields `T::default()`.
    pub(crate) async fn aggregate_value<T>(
        &self,
        conn: &impl Executor,
        function: Aggregate,
        columns: &[Ident],
    ) -> QueryResult<T>
    where
        T: for<'a> FromSql<'a> + Default,
    {
        let qb = self.clone().aggregate(function, columns);
        let Some(row) = qb.query_opt(conn).await? else {
            return Ok(T::default());
        };
        let value: Option<T> = row
            .try_get(0)
            .map_err(|e| QueryError::decode(function.as_sql(), e.to_string()))?;
        Ok(value.unwrap_or_default())
    }

    fn write_columns(&self, out: &mut RawFragment) {
        if self.columns.is_empty() {
            match self.from.first() {
                Some(table) => out.text.push_str(&table.all_columns_sql()),
                None => out.text.push('*'),
            }
            return;
        }
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                out.text.push_str(", ");
            }
            out.push_embedded(column);
        }
    }
}

impl WhereQb for SelectQb {
    fn where_set(&mut self) -> &mut PredicateSet {
        &mut self.where_set
    }
}

impl SqlQb for SelectQb {
    fn serialize_with_end(&self, end: &str) -> QueryResult<Statement> {
        if let Some(err) = &self.build_error {
            return Err(err.clone().into());
        }

        let mut out = RawFragment::default();
        write_ctes(&mut out, &self.ctes);

        out.text.push_str("SELECT ");
        match &self.distinct {
            Some(on) if on.is_empty() => out.text.push_str("DISTINCT "),
            Some(on) => {
                out.text.push_str("DISTINCT ON (");
                write_path_list(&mut out.text, on);
                out.text.push_str(") ");
            }
            None => {}
        }
        match self.aggregate {
            Some(function) => {
                out.text.push_str(function.as_sql());
                out.text.push('(');
                self.write_columns(&mut out);
                out.text.push(')');
            }
            None => self.write_columns(&mut out),
        }

        out.text.push_str(" FROM ");
        for (i, table) in self.from.iter().enumerate() {
            if i > 0 {
                out.text.push_str(", ");
            }
            table.write_sql(&mut out.text);
        }

        for join in &self.joins {
            join.serialize(&mut out)?;
        }

        let where_clause = self.where_set.serialize(out.placeholder_count())?;
        if !where_clause.text.is_empty() {
            out.text.push_str(" WHERE ");
            out.push_rendered(where_clause);
        }

        if !self.group_by.is_empty() {
            out.text.push_str(" GROUP BY ");
            write_path_list(&mut out.text, &self.group_by);
        }

        let having = self.having_set.serialize(out.placeholder_count())?;
        if !having.text.is_empty() {
            out.text.push_str(" HAVING ");
            out.push_rendered(having);
        }

        if !self.order.is_empty() {
            out.text.push_str(" ORDER BY ");
            out.text.push_str(&self.order.join(", "));
        }

        if let Some(limit) = self.limit {
            out.text.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            out.text.push_str(&format!(" OFFSET {offset}"));
        }

        if let Some(lock) = self.lock {
            out.text.push_str(lock.as_sql());
            if self.no_wait {
                out.text.push_str(" NOWAIT");
            }
        }

        Ok(Statement::finish(out, end))
    }
}
