//! Error types for dbquery

use thiserror::Error;

/// Result type alias for dbquery operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Misuse of a statement builder, detected while it is being configured.
///
/// Builders remember the first misuse and report it from `serialize()`, so a
/// broken statement never reaches the executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// An ON condition was added before any join was declared.
    #[error("ON condition without a declared join")]
    NoJoin,

    /// A CROSS JOIN was given ON conditions.
    #[error("CROSS JOIN cannot have an ON clause")]
    CrossJoinOn,

    /// A BETWEEN comparison needs exactly two values.
    #[error("BETWEEN expects exactly 2 values, got {0}")]
    BetweenArity(usize),

    /// `close_bracket` was called with no open bracket.
    #[error("close_bracket without a matching open_bracket")]
    UnbalancedBracket,

    /// Brackets were still open when the statement was serialized.
    #[error("{0} bracket(s) left open")]
    UnclosedBracket(usize),

    /// An INSERT row does not match the declared column list.
    #[error("row has {got} values but {expected} columns were declared")]
    RowArity { expected: usize, got: usize },

    /// UPDATE (or ON CONFLICT DO UPDATE) without any assignment.
    #[error("SET clause cannot be empty")]
    EmptySet,

    /// Identifier that PostgreSQL cannot represent.
    #[error("invalid identifier: {0}")]
    InvalidIdent(String),
}

/// Error types for database operations
#[derive(Debug, Error)]
pub enum QueryError {
    /// Statement construction error
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl QueryError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a construction error
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Parse a tokio_postgres error into a more specific QueryError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for QueryError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
