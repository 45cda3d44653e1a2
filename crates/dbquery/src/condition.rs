//! Comparison conditions built from identifiers.
//!
//! A [`Condition`] keeps its left-hand column unrendered until it is attached
//! to a clause, so a join or a DELETE target can qualify a bare column with
//! its own alias.
//!
//! # Example
//! ```ignore
//! use dbquery::Ident;
//!
//! Ident::column("age").gte(18_i32);
//! Ident::column("status").in_list(["active", "trial"]);
//! Ident::column("score").between(10_i64, 20_i64);
//! Ident::column("star_id").of("p").eq_col(&Ident::column("id").of("s"));
//! ```

use crate::error::BuildError;
use crate::ident::{Ident, quote};
use crate::raw::RawFragment;
use crate::value::{BindValue, Value};

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    None,
    Column(Ident),
    Values(Vec<BindValue>),
}

/// `<column> <op> <operand>`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    lhs: Ident,
    op: String,
    rhs: Operand,
    cast: Option<String>,
}

impl Condition {
    fn values(lhs: &Ident, op: &str, values: Vec<BindValue>) -> Self {
        Self {
            lhs: lhs.clone(),
            op: op.to_string(),
            rhs: Operand::Values(values),
            cast: None,
        }
    }

    /// Cast every placeholder of this condition (`$N::ty`).
    pub fn cast(mut self, ty: impl Into<String>) -> Self {
        self.cast = Some(ty.into());
        self
    }

    pub fn column(&self) -> &Ident {
        &self.lhs
    }

    /// Render as a predicate fragment: text up to the operator, values as binds.
    ///
    /// `qualifier` is applied to the left column when it has no table of its own.
    pub fn to_fragment(&self, qualifier: Option<&str>) -> RawFragment {
        self.render(self.lhs.qualified_or(qualifier).path_sql())
    }

    /// Render as a SET assignment; the target column is written bare.
    pub(crate) fn to_assignment(&self) -> RawFragment {
        self.render(quote(self.lhs.name()))
    }

    fn render(&self, lhs: String) -> RawFragment {
        let mut text = lhs;
        text.push(' ');
        text.push_str(&self.op);
        let binds = match &self.rhs {
            Operand::None => Vec::new(),
            Operand::Column(col) => {
                text.push(' ');
                col.write_path(&mut text);
                Vec::new()
            }
            Operand::Values(values) => {
                text.push(' ');
                values.clone()
            }
        };
        RawFragment {
            text,
            binds,
            cast: self.cast.clone(),
        }
    }
}

macro_rules! compare_ops {
    ($($(#[$doc:meta])* $name:ident => $op:literal),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(&self, value: impl Into<Value>) -> Condition {
                Condition::values(self, $op, vec![BindValue::new(value)])
            }
        )*
    };
}

impl Ident {
    compare_ops! {
        /// `col = $N`
        eq => "=",
        /// `col != $N`
        ne => "!=",
        gt => ">",
        gte => ">=",
        lt => "<",
        lte => "<=",
        like => "LIKE",
        ilike => "ILIKE",
    }

    /// `col <op> $N` for operators without a dedicated method.
    pub fn custom(&self, op: &str, value: impl Into<Value>) -> Condition {
        Condition::values(self, op, vec![BindValue::new(value)])
    }

    /// `col <op> (...)` with a caller-supplied bind list.
    pub fn custom_list(&self, op: &str, values: impl IntoIterator<Item = BindValue>) -> Condition {
        Condition::values(self, op, values.into_iter().collect())
    }

    /// `col IN (...)`. An empty list drops the condition at serialization.
    pub fn in_list<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        Condition::values(self, "IN", values.into_iter().map(BindValue::new).collect())
    }

    /// `col NOT IN (...)`. An empty list drops the condition at serialization.
    pub fn not_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        Condition::values(self, "NOT IN", values.into_iter().map(BindValue::new).collect())
    }

    /// `col BETWEEN $N AND $N+1`
    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Condition {
        Condition::values(
            self,
            "BETWEEN",
            vec![BindValue::new(low), BindValue::new(high)],
        )
    }

    /// `col NOT BETWEEN $N AND $N+1`
    pub fn not_between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Condition {
        Condition::values(
            self,
            "NOT BETWEEN",
            vec![BindValue::new(low), BindValue::new(high)],
        )
    }

    /// BETWEEN from a list, which must hold exactly two values.
    pub fn range<V: Into<Value>>(
        &self,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Condition, BuildError> {
        let values: Vec<BindValue> = values.into_iter().map(BindValue::new).collect();
        if values.len() != 2 {
            return Err(BuildError::BetweenArity(values.len()));
        }
        Ok(Condition::values(self, "BETWEEN", values))
    }

    pub fn is_null(&self) -> Condition {
        self.no_operand("IS NULL")
    }

    pub fn is_not_null(&self) -> Condition {
        self.no_operand("IS NOT NULL")
    }

    fn no_operand(&self, op: &str) -> Condition {
        Condition {
            lhs: self.clone(),
            op: op.to_string(),
            rhs: Operand::None,
            cast: None,
        }
    }

    /// `col = other_col`
    pub fn eq_col(&self, other: &Ident) -> Condition {
        self.compare_col("=", other)
    }

    /// `col <op> other_col`
    pub fn compare_col(&self, op: &str, other: &Ident) -> Condition {
        Condition {
            lhs: self.clone(),
            op: op.to_string(),
            rhs: Operand::Column(other.clone()),
            cast: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::bind;

    #[test]
    fn test_assignment_drops_qualifier() {
        let f = Ident::column("name").of("u").in_schema("app").eq("X").to_assignment();
        assert_eq!(f.text, r#""name" = "#);
        assert_eq!(f.binds, vec![bind("X")]);
    }

    #[test]
    fn test_eq_fragment() {
        let f = Ident::column("name").eq("alice").to_fragment(None);
        assert_eq!(f.text, r#""name" = "#);
        assert_eq!(f.binds, vec![bind("alice")]);
    }

    #[test]
    fn test_column_comparison_has_no_binds() {
        let f = Ident::column("star_id")
            .eq_col(&Ident::column("id").of("s"))
            .to_fragment(Some("p"));
        assert_eq!(f.text, r#""p"."star_id" = "s"."id""#);
        assert!(f.binds.is_empty());
    }

    #[test]
    fn test_range_arity() {
        let c = Ident::column("n").range([1_i64, 10]).unwrap();
        assert_eq!(c.to_fragment(None).binds.len(), 2);
        assert_eq!(
            Ident::column("n").range([1_i64]),
            Err(BuildError::BetweenArity(1))
        );
        assert_eq!(
            Ident::column("n").range([1_i64, 2, 3]),
            Err(BuildError::BetweenArity(3))
        );
    }

    #[test]
    fn test_null_checks() {
        let f = Ident::column("deleted_at").is_null().to_fragment(None);
        assert_eq!(f.text, r#""deleted_at" IS NULL"#);
    }

    #[test]
    fn test_cast_carried() {
        let f = Ident::column("id").eq("abc").cast("uuid").to_fragment(None);
        assert_eq!(f.cast.as_deref(), Some("uuid"));
    }
}
