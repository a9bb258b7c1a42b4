use std::sync::Arc;

use sqlx::PgPool;

use crate::authorize::Evaluator;
use crate::catalog::PermissionCatalog;
use crate::handlers::supervision::SupervisionPermissions;
use crate::services::{ModeratorService, PermissionService, SessionService};

/// Shared per-process state handed to every handler. The catalog is frozen
/// before the state is constructed, so concurrent reads need no locking.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog: Arc<PermissionCatalog>,
    pub evaluator: Evaluator,
    pub permissions: SupervisionPermissions,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        catalog: Arc<PermissionCatalog>,
        permissions: SupervisionPermissions,
    ) -> Self {
        let evaluator = Evaluator::new(pool.clone(), catalog.clone());
        Self {
            pool,
            catalog,
            evaluator,
            permissions,
        }
    }

    pub fn moderators(&self) -> ModeratorService {
        ModeratorService::new(self.pool.clone())
    }

    pub fn permissions_store(&self) -> PermissionService {
        PermissionService::new(self.pool.clone())
    }

    pub fn sessions(&self) -> SessionService {
        SessionService::new(self.pool.clone())
    }
}
