use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;

const QUERY_CANCELED: &str = "57014";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Translate driver errors into repository errors by SQLSTATE class.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    let db = match err {
        sqlx::Error::RowNotFound => return RepoError::NotFound,
        sqlx::Error::PoolTimedOut => return RepoError::Timeout,
        sqlx::Error::Database(db) => db,
        other => return RepoError::from_persistence(other),
    };

    match db.kind() {
        // The partial index on active domains surfaces here as well.
        ErrorKind::UniqueViolation => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        ErrorKind::CheckViolation
        | ErrorKind::NotNullViolation
        | ErrorKind::ForeignKeyViolation => RepoError::Integrity {
            message: db.message().to_string(),
        },
        _ => match db.code().as_deref() {
            Some(QUERY_CANCELED) => RepoError::Timeout,
            Some(INVALID_TEXT_REPRESENTATION) => RepoError::InvalidInput {
                message: db.message().to_string(),
            },
            _ => RepoError::from_persistence(db),
        },
    }
}

/// Bound a caller-supplied batch size before it reaches `LIMIT`.
pub(super) fn clamp_limit(limit: u32) -> i64 {
    i64::from(limit.clamp(1, 500))
}
