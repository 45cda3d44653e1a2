//! JOIN clauses with their own ON predicate set.

use crate::condition::Condition;
use crate::error::BuildError;
use crate::ident::Ident;
use crate::predicate::{Conjunction, PredicateSet};
use crate::raw::RawFragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMethod {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinMethod {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinMethod::Inner => "INNER",
            JoinMethod::Left => "LEFT",
            JoinMethod::Right => "RIGHT",
            JoinMethod::Full => "FULL",
            JoinMethod::Cross => "CROSS",
        }
    }
}

/// One declared join.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Name used to qualify bare ON columns
    alias: String,
    /// Rendered source, e.g. `"stars" AS "s"`
    source: String,
    method: JoinMethod,
    on: PredicateSet,
}

impl Join {
    pub fn new(table: &Ident, method: JoinMethod) -> Self {
        Self {
            alias: table.reference().to_string(),
            source: table.to_sql(),
            method,
            on: PredicateSet::new(),
        }
    }

    pub fn method(&self) -> JoinMethod {
        self.method
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// `AND`-joined ON condition. A bare left column is qualified with the join alias.
    pub fn on(&mut self, cond: &Condition) {
        self.on.and(cond.to_fragment(Some(&self.alias)));
    }

    pub fn or_on(&mut self, cond: &Condition) {
        self.on.or(cond.to_fragment(Some(&self.alias)));
    }

    pub fn on_raw(&mut self, fragment: RawFragment) {
        self.on.raw(fragment);
    }

    pub fn open_bracket(&mut self, conjunction: Conjunction) {
        self.on.open_bracket(conjunction);
    }

    pub fn close_bracket(&mut self) {
        self.on.close_bracket();
    }

    /// Append ` <METHOD> JOIN <source>[ ON <predicate>]` to `out`.
    ///
    /// A CROSS JOIN takes no ON conditions.
    pub fn serialize(&self, out: &mut RawFragment) -> Result<(), BuildError> {
        if self.method == JoinMethod::Cross && !self.on.is_empty() {
            return Err(BuildError::CrossJoinOn);
        }
        out.text.push(' ');
        out.text.push_str(self.method.as_sql());
        out.text.push_str(" JOIN ");
        out.text.push_str(&self.source);

        let on = self.on.serialize(out.binds.len())?;
        if !on.text.is_empty() {
            out.text.push_str(" ON ");
            out.push_rendered(on);
        }
        Ok(())
    }
}
