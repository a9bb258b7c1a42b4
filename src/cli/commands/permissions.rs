//! Permission listing and grant/revoke commands.

use serde_json::json;

use crate::cli::OutputFormat;
use crate::config;
use crate::database::models::Permission;
use crate::state::AppState;

fn print_permissions(permissions: &[Permission], output_format: OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let entries: Vec<_> = permissions
                .iter()
                .map(|p| json!({ "id": p.id, "name": p.name }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "permissions": entries }))?);
        }
        OutputFormat::Text => {
            if permissions.is_empty() {
                println!("<empty>");
                return Ok(());
            }
            for permission in permissions {
                println!("{:4}: {}", permission.id, permission.name);
            }
        }
    }
    Ok(())
}

pub async fn list_permissions(
    state: &AppState,
    page: i64,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let page_size = config::config().api.cli_page_size;
    let permissions = state
        .permissions_store()
        .search_permissions(super::page_offset(page, page_size), page_size)
        .await?;
    print_permissions(&permissions, output_format)
}

pub async fn grant_permission(
    state: &AppState,
    username: &str,
    permission: &str,
) -> anyhow::Result<()> {
    let Some(permission) = state.permissions_store().find_permission_by_name(permission).await?
    else {
        println!("ERROR: Permission does not exist");
        return Ok(());
    };
    let Some(moderator) = state.moderators().find_by_name(username).await? else {
        println!("ERROR: Moderator does not exist");
        return Ok(());
    };

    // Superusers hold everything implicitly; a grant row would be redundant
    if moderator.superuser {
        println!("WARNING: Permission already granted");
        return Ok(());
    }
    if !state.moderators().grant_permission(moderator.id, permission.id).await? {
        println!("WARNING: Permission already granted");
        return Ok(());
    }
    println!("Granted '{}' to {}", permission.name, moderator.username);
    Ok(())
}

pub async fn revoke_permission(
    state: &AppState,
    username: &str,
    permission: &str,
) -> anyhow::Result<()> {
    let Some(permission) = state.permissions_store().find_permission_by_name(permission).await?
    else {
        println!("ERROR: Permission does not exist");
        return Ok(());
    };
    let Some(moderator) = state.moderators().find_by_name(username).await? else {
        println!("ERROR: Moderator does not exist");
        return Ok(());
    };

    if moderator.superuser {
        println!("ERROR: Moderator is SUPER");
        return Ok(());
    }
    if !state.moderators().revoke_permission(moderator.id, permission.id).await? {
        println!("WARNING: Permission is not granted");
        return Ok(());
    }
    println!("Revoked '{}' from {}", permission.name, moderator.username);
    Ok(())
}

pub async fn list_grants(
    state: &AppState,
    username: &str,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let Some(moderator) = state.moderators().find_by_name(username).await? else {
        println!("ERROR: Moderator does not exist");
        return Ok(());
    };

    let permissions = state.moderators().list_permissions(&moderator).await?;
    print_permissions(&permissions, output_format)
}
