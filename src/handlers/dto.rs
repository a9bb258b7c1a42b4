//! Response DTOs and their mapping functions.
//!
//! Entities are never serialized directly; each endpoint maps persisted rows
//! into an explicit response shape (and `password_hash` stays internal).

use serde::Serialize;

use crate::database::models::{Moderator, Permission, Section};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PermissionDto {
    pub id: i64,
    pub name: String,
}

impl From<Permission> for PermissionDto {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SectionDto {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<PermissionDto>,
}

/// Signed-in moderator's own view: settings plus held permissions per section.
#[derive(Debug, Serialize)]
pub struct SelfDto {
    pub id: i64,
    pub username: String,
    pub mode: &'static str,
    pub sections: Vec<SectionDto>,
}

/// Listing/creation view of a managed moderator.
#[derive(Debug, Serialize)]
pub struct ModeratorIndexDto {
    pub id: i64,
    pub username: String,
    pub superuser: bool,
    pub permissions: Vec<PermissionDto>,
}

/// Build the self view: every section, with the permissions the moderator
/// holds inside it (all of them for superusers).
pub async fn build_self_dto(state: &AppState, moderator: &Moderator) -> Result<SelfDto, ApiError> {
    let sections = state.permissions_store().all_sections().await?;
    let store = state.moderators();

    let mut section_dtos = Vec::with_capacity(sections.len());
    for section in sections {
        let permissions = store
            .list_section_permissions(moderator, section.id)
            .await?
            .into_iter()
            .map(PermissionDto::from)
            .collect();
        section_dtos.push(SectionDto {
            id: section.id,
            name: section.name,
            permissions,
        });
    }

    Ok(SelfDto {
        id: moderator.id,
        username: moderator.username.clone(),
        mode: moderator.mode.as_str(),
        sections: section_dtos,
    })
}

pub async fn build_index_dto(
    state: &AppState,
    moderator: &Moderator,
) -> Result<ModeratorIndexDto, ApiError> {
    let permissions = state
        .moderators()
        .list_permissions(moderator)
        .await?
        .into_iter()
        .map(PermissionDto::from)
        .collect();

    Ok(ModeratorIndexDto {
        id: moderator.id,
        username: moderator.username.clone(),
        superuser: moderator.superuser,
        permissions,
    })
}

/// Group the full permission table under its sections.
pub fn group_by_section(sections: Vec<Section>, permissions: Vec<Permission>) -> Vec<SectionDto> {
    sections
        .into_iter()
        .map(|section| {
            let in_section = permissions
                .iter()
                .filter(|p| p.section_id == Some(section.id))
                .cloned()
                .map(PermissionDto::from)
                .collect();
            SectionDto {
                id: section.id,
                name: section.name,
                permissions: in_section,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_permissions_under_their_sections() {
        let sections = vec![
            Section { id: 1, name: "super".to_string() },
            Section { id: 2, name: "content".to_string() },
        ];
        let permissions = vec![
            Permission { id: 10, name: "manage mods".to_string(), section_id: Some(1) },
            Permission { id: 11, name: "edit pages".to_string(), section_id: Some(2) },
            Permission { id: 12, name: "orphaned".to_string(), section_id: None },
        ];

        let grouped = group_by_section(sections, permissions);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].permissions.len(), 1);
        assert_eq!(grouped[0].permissions[0].name, "manage mods");
        assert_eq!(grouped[1].permissions[0].name, "edit pages");
    }
}
