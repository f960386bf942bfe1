use lotfolio_core::errors::{DatabaseError, Error};
use rusqlite::ErrorCode;

/// Maps a rusqlite error onto the database-agnostic error taxonomy.
pub(crate) fn map_sqlite_err(err: rusqlite::Error) -> Error {
    let db_err = match &err {
        rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound(err.to_string()),
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            DatabaseError::ConstraintViolation(err.to_string())
        }
        _ => DatabaseError::QueryFailed(err.to_string()),
    };
    Error::Database(db_err)
}
