pub mod moderator_service;
pub mod permission_service;
pub mod session_service;

pub use moderator_service::ModeratorService;
pub use permission_service::PermissionService;
pub use session_service::SessionService;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Map a storage-level unique violation (a pre-check race) into the same
/// duplicate category the advisory pre-check reports.
pub(crate) fn map_unique_violation(err: sqlx::Error, message: &str) -> ServiceError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return ServiceError::Duplicate(message.to_string());
        }
    }
    ServiceError::Sqlx(err)
}

/// Deduplicate requested permission ids, preserving first-seen order.
/// Duplicates in a request must not inflate grant counts.
pub(crate) fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_order_and_drops_repeats() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert_eq!(dedup_ids(&[5, 5]), vec![5]);
        assert!(dedup_ids(&[]).is_empty());
    }
}
