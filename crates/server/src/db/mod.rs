pub mod activities;
pub mod comments;
pub mod projects;
pub mod reviews;
pub mod teams;
pub mod users;

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
