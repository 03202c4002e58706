use thiserror::Error;

pub mod admins_db_operations;
pub mod media_db_operations;
pub mod profile_db_operations;
pub mod projects_db_operations;
pub mod template_projects_db_operations;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("{0} not found")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Maps "no rows changed" to a not-found error for the given entity.
pub(crate) fn expect_changed(changed: usize, entity: &str) -> DbResult<()> {
    if changed == 0 {
        Err(DbError::NotFound(entity.to_string()))
    } else {
        Ok(())
    }
}
