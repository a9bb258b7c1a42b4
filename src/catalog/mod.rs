//! Permission catalog.
//!
//! Feature modules declare the sections and permissions they gate on during
//! startup, before any traffic is served. `initialize` then reconciles the
//! declared set against the database exactly once (find-or-create by name)
//! and builds the name-to-id lookup used by every authorization check. After
//! initialization the catalog is read-only and safe to share behind an `Arc`.
//!
//! The catalog is an explicitly constructed value owned by the startup
//! routine and handed to the components that need it; there is no ambient
//! global instance.

use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Section '{0}' is already declared")]
    DuplicateSection(String),

    #[error("Permission '{1}' is already declared in section '{0}'")]
    DuplicatePermission(String, String),

    #[error("Section '{0}' is not declared")]
    UnknownSection(String),

    #[error("Catalog can not be changed after initialization")]
    AlreadyInitialized,

    #[error("Permission catalog has not been initialized")]
    NotInitialized,

    #[error("Permission '{0}' was never declared")]
    UnknownPermission(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Opaque handle to a declared section, only issued by `add_section`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionHandle(String);

impl SectionHandle {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Opaque reference to a declared permission. The catalog key is the
/// qualified name `"<section> <permission>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionRef(String);

impl PermissionRef {
    pub fn qualified(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct PermissionCatalog {
    /// Declared sections with their permission names, in declaration order.
    sections: Vec<(String, Vec<String>)>,
    section_ids: HashMap<String, i64>,
    permission_ids: HashMap<String, i64>,
    initialized: bool,
}

impl PermissionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Declare a section. Only valid before `initialize`.
    pub fn add_section(&mut self, name: &str) -> Result<SectionHandle, CatalogError> {
        if self.initialized {
            return Err(CatalogError::AlreadyInitialized);
        }
        if self.sections.iter().any(|(s, _)| s == name) {
            return Err(CatalogError::DuplicateSection(name.to_string()));
        }
        self.sections.push((name.to_string(), Vec::new()));
        Ok(SectionHandle(name.to_string()))
    }

    /// Declare a permission within a previously declared section.
    pub fn add_permission(
        &mut self,
        section: &SectionHandle,
        name: &str,
    ) -> Result<PermissionRef, CatalogError> {
        if self.initialized {
            return Err(CatalogError::AlreadyInitialized);
        }
        let entry = self
            .sections
            .iter_mut()
            .find(|(s, _)| s == section.name())
            .ok_or_else(|| CatalogError::UnknownSection(section.name().to_string()))?;
        if entry.1.iter().any(|p| p == name) {
            return Err(CatalogError::DuplicatePermission(
                section.name().to_string(),
                name.to_string(),
            ));
        }
        entry.1.push(name.to_string());
        Ok(PermissionRef(format!("{} {}", section.name(), name)))
    }

    /// Reconcile the declared sections and permissions against the database
    /// and build the id lookup tables. Find-or-create by name, so running the
    /// same declarations against an already populated database never creates
    /// duplicate rows.
    ///
    /// Must be called exactly once, after all feature modules have declared
    /// and before any authorization-gated request is served.
    ///
    /// Permissions that exist in storage but are no longer declared by the
    /// running code are left untouched.
    pub async fn initialize(&mut self, pool: &PgPool) -> Result<(), CatalogError> {
        if self.initialized {
            return Err(CatalogError::AlreadyInitialized);
        }

        let mut section_ids = HashMap::new();
        let mut permission_ids = HashMap::new();

        let mut tx = pool.begin().await?;

        for (section_name, permissions) in &self.sections {
            let section_id = match sqlx::query_scalar::<_, i64>(
                "SELECT id FROM sections WHERE name = $1",
            )
            .bind(section_name)
            .fetch_optional(&mut *tx)
            .await?
            {
                Some(id) => id,
                None => {
                    sqlx::query_scalar::<_, i64>(
                        "INSERT INTO sections (name) VALUES ($1) RETURNING id",
                    )
                    .bind(section_name)
                    .fetch_one(&mut *tx)
                    .await?
                }
            };
            section_ids.insert(section_name.clone(), section_id);

            for permission_name in permissions {
                let permission_id = match sqlx::query_scalar::<_, i64>(
                    "SELECT id FROM permissions WHERE name = $1",
                )
                .bind(permission_name)
                .fetch_optional(&mut *tx)
                .await?
                {
                    Some(id) => id,
                    None => {
                        sqlx::query_scalar::<_, i64>(
                            "INSERT INTO permissions (name, section_id) VALUES ($1, $2) RETURNING id",
                        )
                        .bind(permission_name)
                        .bind(section_id)
                        .fetch_one(&mut *tx)
                        .await?
                    }
                };
                permission_ids.insert(format!("{} {}", section_name, permission_name), permission_id);
            }
        }

        tx.commit().await?;

        self.install(section_ids, permission_ids);
        tracing::info!(
            sections = self.section_ids.len(),
            permissions = self.permission_ids.len(),
            "permission catalog initialized"
        );
        Ok(())
    }

    fn install(&mut self, section_ids: HashMap<String, i64>, permission_ids: HashMap<String, i64>) {
        self.section_ids = section_ids;
        self.permission_ids = permission_ids;
        self.initialized = true;
    }

    /// Resolve a declared permission to its persisted id. Failure here is a
    /// deployment bug (catalog never initialized, or a ref leaked from a
    /// different catalog), not a user-facing condition.
    pub fn resolve(&self, permission: &PermissionRef) -> Result<i64, CatalogError> {
        if !self.initialized {
            return Err(CatalogError::NotInitialized);
        }
        self.permission_ids
            .get(permission.qualified())
            .copied()
            .ok_or_else(|| CatalogError::UnknownPermission(permission.qualified().to_string()))
    }

    pub fn section_id(&self, section: &SectionHandle) -> Result<i64, CatalogError> {
        if !self.initialized {
            return Err(CatalogError::NotInitialized);
        }
        self.section_ids
            .get(section.name())
            .copied()
            .ok_or_else(|| CatalogError::UnknownSection(section.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_initialize(catalog: &mut PermissionCatalog) {
        let mut section_ids = HashMap::new();
        let mut permission_ids = HashMap::new();
        for (i, (section, permissions)) in catalog.sections.iter().enumerate() {
            section_ids.insert(section.clone(), i as i64 + 1);
            for (j, permission) in permissions.iter().enumerate() {
                permission_ids.insert(format!("{} {}", section, permission), (i * 100 + j) as i64 + 1);
            }
        }
        catalog.install(section_ids, permission_ids);
    }

    #[test]
    fn qualified_name_joins_section_and_permission() {
        let mut catalog = PermissionCatalog::new();
        let section = catalog.add_section("super").unwrap();
        let permission = catalog.add_permission(&section, "manage mods").unwrap();
        assert_eq!(permission.qualified(), "super manage mods");
    }

    #[test]
    fn duplicate_section_is_rejected() {
        let mut catalog = PermissionCatalog::new();
        catalog.add_section("super").unwrap();
        assert!(matches!(
            catalog.add_section("super"),
            Err(CatalogError::DuplicateSection(_))
        ));
    }

    #[test]
    fn duplicate_permission_is_rejected() {
        let mut catalog = PermissionCatalog::new();
        let section = catalog.add_section("super").unwrap();
        catalog.add_permission(&section, "manage mods").unwrap();
        assert!(matches!(
            catalog.add_permission(&section, "manage mods"),
            Err(CatalogError::DuplicatePermission(_, _))
        ));
    }

    #[test]
    fn permission_requires_a_declared_section() {
        let mut catalog = PermissionCatalog::new();
        let foreign = SectionHandle("elsewhere".to_string());
        assert!(matches!(
            catalog.add_permission(&foreign, "anything"),
            Err(CatalogError::UnknownSection(_))
        ));
    }

    #[test]
    fn declarations_are_frozen_after_initialization() {
        let mut catalog = PermissionCatalog::new();
        let section = catalog.add_section("super").unwrap();
        catalog.add_permission(&section, "manage mods").unwrap();
        fake_initialize(&mut catalog);

        assert!(matches!(
            catalog.add_section("another"),
            Err(CatalogError::AlreadyInitialized)
        ));
        assert!(matches!(
            catalog.add_permission(&section, "more"),
            Err(CatalogError::AlreadyInitialized)
        ));
    }

    #[test]
    fn resolve_fails_fast_before_initialization() {
        let mut catalog = PermissionCatalog::new();
        let section = catalog.add_section("super").unwrap();
        let permission = catalog.add_permission(&section, "manage mods").unwrap();
        assert!(matches!(
            catalog.resolve(&permission),
            Err(CatalogError::NotInitialized)
        ));
    }

    #[test]
    fn resolve_returns_persisted_id_after_initialization() {
        let mut catalog = PermissionCatalog::new();
        let section = catalog.add_section("super").unwrap();
        let permission = catalog.add_permission(&section, "manage mods").unwrap();
        fake_initialize(&mut catalog);

        assert_eq!(catalog.resolve(&permission).unwrap(), 1);
        assert_eq!(catalog.section_id(&section).unwrap(), 1);
    }

    #[test]
    fn unknown_permission_after_initialization_is_a_distinct_error() {
        let mut catalog = PermissionCatalog::new();
        catalog.add_section("super").unwrap();
        fake_initialize(&mut catalog);

        let stray = PermissionRef("other section stray".to_string());
        assert!(matches!(
            catalog.resolve(&stray),
            Err(CatalogError::UnknownPermission(_))
        ));
    }
}
