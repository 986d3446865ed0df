//! Database error mapping.

use sea_orm::{DbErr, SqlErr};

use quill_shared::AppError;

/// Maps a database error onto the application taxonomy.
///
/// Constraint violations keep their meaning; everything else is `Database`.
pub fn map_db_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => AppError::Conflict(msg),
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => AppError::Validation(msg),
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_errors_map_to_database() {
        let err = map_db_err(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, AppError::Database(msg) if msg.contains("boom")));
    }

    #[test]
    fn test_record_not_found_is_database_error() {
        // Absence is modelled with Option by the repositories, not DbErr.
        let err = map_db_err(DbErr::RecordNotFound("posts".to_string()));
        assert!(matches!(err, AppError::Database(_)));
    }
}
