use thiserror::Error;

/// Errors surfaced by the pantry core.
#[derive(Debug, Error)]
pub enum Error {
    /// An id that does not refer to a live record.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected input: self-merge, malformed patch, out-of-range paging.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A write transaction could not get past lock contention or a uniqueness
    /// race within its retry budget.
    ///
    /// Writes take the lock up front (`BEGIN IMMEDIATE`), so a racing insert of
    /// the same name is already visible when the transaction reads and never
    /// trips the unique index. In practice this surfaces when another writer
    /// holds the database past the busy timeout on every attempt. Nothing from
    /// the failed call is committed; the caller may retry it later.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The extraction collaborator failed to produce a recipe.
    #[error("Extraction failed: {0:#}")]
    Extraction(#[source] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn not_found(what: &str, id: i64) -> Self {
        Self::NotFound(format!("{what} {id}"))
    }

    /// Whether a database error is a uniqueness violation or lock contention,
    /// i.e. something another attempt of the same transaction can get past.
    pub(crate) fn is_conflict(err: &rusqlite::Error) -> bool {
        match err {
            rusqlite::Error::SqliteFailure(e, _) => {
                e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || matches!(
                        e.code,
                        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                    )
            }
            _ => false,
        }
    }
}
