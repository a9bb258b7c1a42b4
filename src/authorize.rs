//! Authorization evaluator.
//!
//! Gates an operation behind declared permissions for an authenticated
//! moderator: resolve the permission through the catalog, short-circuit for
//! superusers, otherwise check the grant rows. `require*` aborts with 403,
//! `check*` hands the caller a boolean for "optional" guards.

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog::{PermissionCatalog, PermissionRef};
use crate::database::models::Moderator;
use crate::error::ApiError;
use crate::services::ModeratorService;

const DENIED: &str = "Not sufficient permissions";

/// Pure allow/deny decision: superuser bypass, otherwise every required id
/// must be granted. Duplicate required ids collapse naturally.
pub fn is_permitted(superuser: bool, granted: &HashSet<i64>, required: &[i64]) -> bool {
    superuser || required.iter().all(|id| granted.contains(id))
}

#[derive(Clone)]
pub struct Evaluator {
    pool: PgPool,
    catalog: Arc<PermissionCatalog>,
}

impl Evaluator {
    pub fn new(pool: PgPool, catalog: Arc<PermissionCatalog>) -> Self {
        Self { pool, catalog }
    }

    /// Optional-guard variant: resolve and check, returning the decision.
    pub async fn check(
        &self,
        moderator: &Moderator,
        permission: &PermissionRef,
    ) -> Result<bool, ApiError> {
        let permission_id = self.catalog.resolve(permission)?;
        if moderator.superuser {
            return Ok(true);
        }
        let held = ModeratorService::new(self.pool.clone())
            .has_permission(moderator.id, permission_id)
            .await?;
        Ok(held)
    }

    /// Abort variant: deny becomes a 403.
    pub async fn require(
        &self,
        moderator: &Moderator,
        permission: &PermissionRef,
    ) -> Result<(), ApiError> {
        if self.check(moderator, permission).await? {
            Ok(())
        } else {
            Err(ApiError::forbidden(DENIED))
        }
    }

    /// Conjunction over several permissions: allow iff every one is held.
    pub async fn check_all(
        &self,
        moderator: &Moderator,
        permissions: &[PermissionRef],
    ) -> Result<bool, ApiError> {
        let mut ids = Vec::with_capacity(permissions.len());
        for permission in permissions {
            ids.push(self.catalog.resolve(permission)?);
        }
        if moderator.superuser {
            return Ok(true);
        }
        let held = ModeratorService::new(self.pool.clone())
            .has_all_permissions(moderator, &ids)
            .await?;
        Ok(held)
    }

    pub async fn require_all(
        &self,
        moderator: &Moderator,
        permissions: &[PermissionRef],
    ) -> Result<(), ApiError> {
        if self.check_all(moderator, permissions).await? {
            Ok(())
        } else {
            Err(ApiError::forbidden(DENIED))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superuser_is_always_permitted() {
        let granted = HashSet::new();
        assert!(is_permitted(true, &granted, &[1, 2, 3]));
    }

    #[test]
    fn single_permission_requires_its_grant() {
        let granted: HashSet<i64> = [7].into_iter().collect();
        assert!(is_permitted(false, &granted, &[7]));
        assert!(!is_permitted(false, &granted, &[8]));
    }

    #[test]
    fn conjunction_needs_every_permission() {
        let granted: HashSet<i64> = [1].into_iter().collect();
        assert!(!is_permitted(false, &granted, &[1, 2]));

        let granted: HashSet<i64> = [1, 2].into_iter().collect();
        assert!(is_permitted(false, &granted, &[1, 2]));
    }

    #[test]
    fn duplicate_required_ids_behave_like_a_single_one() {
        let granted: HashSet<i64> = [1].into_iter().collect();
        assert_eq!(
            is_permitted(false, &granted, &[1, 1]),
            is_permitted(false, &granted, &[1])
        );
    }

    #[test]
    fn empty_requirement_is_allowed() {
        assert!(is_permitted(false, &HashSet::new(), &[]));
    }
}
