//! SQL identifiers (schema / table / column) with optional alias.
//!
//! Every part is rendered double-quoted and dot-qualified:
//! `"schema"."table"."column"`. Embedded `"` is escaped as `""`.
//!
//! # Example
//! ```ignore
//! use dbquery::Ident;
//!
//! let planets = Ident::table("planets").alias("p");
//! let name = Ident::column("name").of("p");
//! assert_eq!(planets.to_sql(), r#""planets" AS "p""#);
//! assert_eq!(name.to_sql(), r#""p"."name""#);
//! ```

use crate::error::BuildError;
use std::fmt;

/// A (possibly qualified) table or column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    schema: Option<String>,
    table: Option<String>,
    name: String,
    alias: Option<String>,
}

impl Ident {
    /// A column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self::bare(name.into())
    }

    /// A table reference.
    ///
    /// Same representation as a column; the name is kept separate so call
    /// sites read naturally.
    pub fn table(name: impl Into<String>) -> Self {
        Self::bare(name.into())
    }

    fn bare(name: String) -> Self {
        Self {
            schema: None,
            table: None,
            name,
            alias: None,
        }
    }

    /// Parse a dotted identifier: `name`, `table.name` or `schema.table.name`.
    ///
    /// Parts may be double-quoted (`"Odd.Name"`), with `""` as an escaped quote.
    pub fn parse(s: &str) -> Result<Self, BuildError> {
        if s.contains('\0') {
            return Err(BuildError::InvalidIdent(
                "identifier cannot contain NUL".to_string(),
            ));
        }

        let mut parts: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars().peekable();
        let mut quoted = false;

        while let Some(c) = chars.next() {
            match c {
                '"' if quoted => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current.push('"');
                    } else {
                        quoted = false;
                    }
                }
                '"' => quoted = true,
                '.' if !quoted => parts.push(std::mem::take(&mut current)),
                c => current.push(c),
            }
        }
        if quoted {
            return Err(BuildError::InvalidIdent(format!("unclosed quote in {s}")));
        }
        parts.push(current);

        if parts.iter().any(String::is_empty) {
            return Err(BuildError::InvalidIdent(format!("empty segment in '{s}'")));
        }

        let mut parts = parts.into_iter().rev();
        let name = parts.next().unwrap_or_default();
        let table = parts.next();
        let schema = parts.next();
        if parts.next().is_some() {
            return Err(BuildError::InvalidIdent(format!("too many segments in {s}")));
        }

        Ok(Self {
            schema,
            table,
            name,
            alias: None,
        })
    }

    /// Qualify with a table name or alias.
    pub fn of(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Qualify with a schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Attach an alias, rendered as `AS "alias"` where the identifier is declared.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The name other clauses use to refer to this table: its alias, or its name.
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Copy of this identifier qualified with `table` unless already qualified.
    pub(crate) fn qualified_or(&self, table: Option<&str>) -> Ident {
        match (&self.table, table) {
            (None, Some(t)) => self.clone().of(t),
            _ => self.clone(),
        }
    }

    /// Render with the alias: `"schema"."table"."name" AS "alias"`.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    /// Render without the alias.
    pub fn path_sql(&self) -> String {
        let mut out = String::new();
        self.write_path(&mut out);
        out
    }

    /// `"reference".*`
    pub fn all_columns_sql(&self) -> String {
        let mut out = String::new();
        write_quoted(&mut out, self.reference());
        out.push_str(".*");
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        self.write_path(out);
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            write_quoted(out, alias);
        }
    }

    pub(crate) fn write_path(&self, out: &mut String) {
        for part in [&self.schema, &self.table].into_iter().flatten() {
            write_quoted(out, part);
            out.push('.');
        }
        write_quoted(out, &self.name);
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::column(name)
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Ident::column(name)
    }
}

/// Write `name` as a double-quoted identifier.
pub(crate) fn write_quoted(out: &mut String, name: &str) {
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

pub(crate) fn quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    write_quoted(&mut out, name);
    out
}

/// Render a comma separated list of identifier paths (no aliases).
pub(crate) fn write_path_list(out: &mut String, idents: &[Ident]) {
    for (i, ident) in idents.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        ident.write_path(out);
    }
}
