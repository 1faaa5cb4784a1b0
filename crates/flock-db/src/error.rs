use thiserror::Error;

/// Typed failures from the storage layer. The relationship variants map
/// onto the HTTP error bodies in flock-api.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    DuplicateUser,

    #[error("you already follow this user")]
    AlreadyFollowing,

    #[error("you don't follow this user")]
    NotFollowing,

    #[error("friend request already sent")]
    AlreadyRequested,

    #[error("no friend request from this user")]
    NoSuchRequest,

    #[error("database lock poisoned")]
    Lock,

    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

impl StoreError {
    /// True when a SQL error is a UNIQUE constraint violation.
    pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
