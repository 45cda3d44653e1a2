//! DELETE statement builder.

use crate::error::QueryResult;
use crate::ident::Ident;
use crate::predicate::PredicateSet;
use crate::qb::traits::{MutationQb, SqlQb, WhereQb};
use crate::qb::{write_ctes, write_returning, write_where};
use crate::raw::{RawFragment, Statement};

/// DELETE statement builder.
///
/// Bare columns in filters are qualified with the target's alias (or name).
#[derive(Clone, Debug)]
pub struct DeleteQb {
    ctes: Vec<RawFragment>,
    table: Ident,
    /// USING tables
    using: Vec<Ident>,
    where_set: PredicateSet,
    cursor: Option<String>,
    returning: Vec<Ident>,
}

impl DeleteQb {
    pub fn new(table: Ident) -> Self {
        Self {
            ctes: Vec::new(),
            table,
            using: Vec::new(),
            where_set: PredicateSet::new(),
            cursor: None,
            returning: Vec::new(),
        }
    }

    pub fn with(mut self, cte: RawFragment) -> Self {
        self.ctes.push(cte);
        self
    }

    pub fn using(mut self, table: Ident) -> Self {
        self.using.push(table);
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

impl WhereQb for DeleteQb {
    fn where_set(&mut self) -> &mut PredicateSet {
        &mut self.where_set
    }

    fn qualifier(&self) -> Option<String> {
        Some(self.table.reference().to_string())
    }
}

impl SqlQb for DeleteQb {
    fn serialize_with_end(&self, end: &str) -> QueryResult<Statement> {
        let mut out = RawFragment::default();
        write_ctes(&mut out, &self.ctes);

        out.text.push_str("DELETE FROM ");
        self.table.write_sql(&mut out.text);

        if !self.using.is_empty() {
            out.text.push_str(" USING ");
            for (i, table) in self.using.iter().enumerate() {
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

impl MutationQb for DeleteQb {}
