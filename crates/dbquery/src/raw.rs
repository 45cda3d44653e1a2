//! Raw SQL fragments and finished statements.

use crate::ident::quote;
use crate::value::{BindValue, Value};
use std::ops::Add;
use tokio_postgres::types::ToSql;

/// A piece of SQL text with the values it binds.
///
/// Fragments written by hand number their own placeholders from `$1`.
/// Wherever a fragment is embedded into a larger statement those local
/// placeholders are shifted past the binds already emitted. The shift skips
/// quoted text, so quotes in hand-written text must balance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFragment {
    pub text: String,
    pub binds: Vec<BindValue>,
    /// Cast applied to every placeholder this fragment renders.
    pub cast: Option<String>,
}

impl RawFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            binds: Vec::new(),
            cast: None,
        }
    }

    pub fn with_binds(text: impl Into<String>, binds: impl IntoIterator<Item = BindValue>) -> Self {
        Self {
            text: text.into(),
            binds: binds.into_iter().collect(),
            cast: None,
        }
    }

    /// Append one bind to a fragment (no text change).
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.binds.push(BindValue::new(value));
        self
    }

    pub fn cast(mut self, ty: impl Into<String>) -> Self {
        self.cast = Some(ty.into());
        self
    }

    /// `"name" AS (<statement>)`, for use as a CTE.
    ///
    /// The statement should be serialized with an empty suffix.
    pub fn cte(name: &str, statement: Statement) -> Self {
        let body = statement.sql.trim_end().trim_end_matches(';');
        Self {
            text: format!("{} AS ({})", quote(name), body),
            binds: statement.binds,
            cast: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.binds.is_empty()
    }

    /// Number of placeholders emitted so far, when used as an accumulator.
    pub(crate) fn placeholder_count(&self) -> usize {
        self.binds.len()
    }

    /// Append an embedded fragment, renumbering its local placeholders.
    pub(crate) fn push_embedded(&mut self, fragment: &RawFragment) {
        self.push_embedded_after(0, fragment);
    }

    /// [`push_embedded`](Self::push_embedded) for an accumulator whose own
    /// numbering starts after `offset` placeholders emitted elsewhere.
    pub(crate) fn push_embedded_after(&mut self, offset: usize, fragment: &RawFragment) {
        let shift = offset + self.binds.len();
        self.text.push_str(&shift_placeholders(&fragment.text, shift));
        self.binds.extend(fragment.binds.iter().cloned());
    }

    /// Append a fragment whose placeholders are already globally numbered.
    pub(crate) fn push_rendered(&mut self, fragment: RawFragment) {
        self.text.push_str(&fragment.text);
        self.binds.extend(fragment.binds);
    }

    /// Emit one value: inline if it is a pre-quoted literal, otherwise
    /// `$N[::cast]` with the bind appended.
    pub(crate) fn push_value(&mut self, bind: &BindValue, fragment_cast: Option<&str>) {
        self.push_value_after(0, bind, fragment_cast);
    }

    /// [`push_value`](Self::push_value) numbering after `offset` placeholders.
    ///
    /// Inlined literal text is final: it is never scanned for placeholders
    /// afterwards, so quotes inside it need not balance.
    pub(crate) fn push_value_after(
        &mut self,
        offset: usize,
        bind: &BindValue,
        fragment_cast: Option<&str>,
    ) {
        if let Value::Literal(text) = &bind.value {
            self.text.push_str(text);
            return;
        }
        let index = offset + self.binds.len() + 1;
        self.text.push('$');
        self.text.push_str(&index.to_string());
        if let Some(cast) = bind.cast.as_deref().or(fragment_cast) {
            self.text.push_str("::");
            self.text.push_str(cast);
        }
        self.binds.push(bind.clone());
    }
}

/// `a + b` joins the texts with a space and keeps both bind lists in order.
impl Add for RawFragment {
    type Output = RawFragment;

    fn add(mut self, rhs: RawFragment) -> RawFragment {
        self.text.push(' ');
        self.push_embedded(&rhs);
        self
    }
}

impl From<&str> for RawFragment {
    fn from(text: &str) -> Self {
        RawFragment::new(text)
    }
}

impl From<String> for RawFragment {
    fn from(text: String) -> Self {
        RawFragment::new(text)
    }
}

/// A finished statement, ready for an executor.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

impl Statement {
    pub(crate) fn finish(fragment: RawFragment, end: &str) -> Self {
        let mut sql = fragment.text;
        sql.push_str(end);
        tracing::trace!(
            target: "dbquery.sql",
            sql = %sql,
            binds = fragment.binds.len(),
            "statement serialized"
        );
        Self {
            sql,
            binds: fragment.binds,
        }
    }

    /// Parameters as references compatible with tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.binds
            .iter()
            .map(|b| &b.value as &(dyn ToSql + Sync))
            .collect()
    }

    /// Distinct `$N` indexes found outside quoted text, ascending.
    pub fn placeholder_indexes(&self) -> Vec<usize> {
        let mut found = Vec::new();
        scan_placeholders(&self.sql, |index| {
            found.push(index);
            index
        });
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Use this statement as an embedded fragment.
    pub fn into_fragment(self) -> RawFragment {
        RawFragment::with_binds(self.sql, self.binds)
    }
}

/// Shift every `$N` outside single-quoted text by `offset`.
fn shift_placeholders(sql: &str, offset: usize) -> String {
    if offset == 0 {
        return sql.to_string();
    }
    scan_placeholders(sql, |index| index + offset)
}

/// Rewrite `$N` placeholders through `map`, skipping `'...'` and `"..."` text.
fn scan_placeholders(sql: &str, mut map: impl FnMut(usize) -> usize) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                result.push(c);
            }
            (Some(_), c) => result.push(c),
            (None, '\'' | '"') => {
                quote = Some(ch);
                result.push(ch);
            }
            (None, '$') => {
                let mut num_str = String::new();
                while let Some(next) = chars.next_if(char::is_ascii_digit) {
                    num_str.push(next);
                }
                result.push('$');
                match num_str.parse::<usize>() {
                    Ok(index) => result.push_str(&map(index).to_string()),
                    Err(_) => result.push_str(&num_str),
                }
            }
            (None, c) => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::bind;

    #[test]
    fn add_joins_text_with_space() {
        let a = RawFragment::new("SELECT 1");
        let b = RawFragment::new("LIMIT 1");
        let c = a + b;
        assert_eq!(c.text, "SELECT 1 LIMIT 1");
        assert!(c.binds.is_empty());
    }

    #[test]
    fn add_keeps_bind_order_and_shifts() {
        let a = RawFragment::with_binds("x = $1", [bind(1_i64)]);
        let b = RawFragment::with_binds("AND y = $1", [bind(2_i64)]);
        let c = a + b;
        assert_eq!(c.text, "x = $1 AND y = $2");
        assert_eq!(c.binds, vec![bind(1_i64), bind(2_i64)]);
    }

    #[test]
    fn shift_skips_quoted_text() {
        assert_eq!(shift_placeholders("a = $1 AND b = '$1'", 2), "a = $3 AND b = '$1'");
        assert_eq!(shift_placeholders("$1::int, $2", 1), "$2::int, $3");
        assert_eq!(shift_placeholders("cost $ 5", 1), "cost $ 5");
    }

    #[test]
    fn push_value_inlines_literals() {
        let mut out = RawFragment::default();
        out.push_value(&bind("'open'"), None);
        out.text.push_str(", ");
        out.push_value(&bind(3_i64), Some("int4"));
        out.text.push_str(", ");
        out.push_value(&bind(4_i64).cast("int8"), Some("int4"));
        assert_eq!(out.text, "'open', $1::int4, $2::int8");
        assert_eq!(out.binds.len(), 2);
    }

    #[test]
    fn push_value_after_continues_numbering() {
        let mut out = RawFragment::new("x = ");
        out.push_value_after(3, &bind("'O'Brien'"), None);
        out.text.push_str(" AND y = ");
        out.push_value_after(3, &bind(1_i64), None);
        assert_eq!(out.text, "x = 'O'Brien' AND y = $4");
        assert_eq!(out.binds, vec![bind(1_i64)]);
    }

    #[test]
    fn cte_wraps_statement_body() {
        let stmt = Statement {
            sql: r#"SELECT "id" FROM "users" WHERE "age" > $1"#.to_string(),
            binds: vec![bind(18_i64)],
        };
        let cte = RawFragment::cte("adults", stmt);
        assert_eq!(
            cte.text,
            r#""adults" AS (SELECT "id" FROM "users" WHERE "age" > $1)"#
        );
        assert_eq!(cte.binds.len(), 1);
    }

    #[test]
    fn statement_reports_placeholders() {
        let stmt = Statement {
            sql: "SELECT $2, $1, '$9', $1".to_string(),
            binds: vec![bind(1_i64), bind(2_i64)],
        };
        assert_eq!(stmt.placeholder_indexes(), vec![1, 2]);
        assert_eq!(stmt.params_ref().len(), 2);
    }
}
