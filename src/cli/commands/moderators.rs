//! Moderator account commands. These bypass the web API's superuser safety
//! rail on purpose: the CLI is the out-of-band path for managing supers.

use serde_json::json;

use crate::cli::OutputFormat;
use crate::config;
use crate::services::ServiceError;
use crate::state::AppState;

pub async fn list_moderators(
    state: &AppState,
    page: i64,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let page_size = config::config().api.cli_page_size;
    let moderators = state
        .moderators()
        .search(super::page_offset(page, page_size), page_size, None, None)
        .await?;

    match output_format {
        OutputFormat::Json => {
            let entries: Vec<_> = moderators
                .iter()
                .map(|m| json!({ "id": m.id, "username": m.username, "superuser": m.superuser }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "moderators": entries }))?);
        }
        OutputFormat::Text => {
            if moderators.is_empty() {
                println!("<empty>");
                return Ok(());
            }
            for moderator in &moderators {
                let marker = if moderator.superuser { " SUPER" } else { "" };
                println!("{:4}: {}{}", moderator.id, moderator.username, marker);
            }
        }
    }
    Ok(())
}

pub async fn create_moderator(
    state: &AppState,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    match state.moderators().register(username, password).await {
        Ok(moderator) => {
            println!("Created moderator {} (id {})", moderator.username, moderator.id);
            Ok(())
        }
        Err(ServiceError::Duplicate(_)) => {
            println!("ERROR: Moderator with this name already exists");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn create_super(state: &AppState, username: &str, password: &str) -> anyhow::Result<()> {
    match state.moderators().register_as(username, password, true).await {
        Ok(moderator) => {
            println!("Created superuser {} (id {})", moderator.username, moderator.id);
            Ok(())
        }
        Err(ServiceError::Duplicate(_)) => {
            println!(
                "ERROR: Moderator with this name already exists\n\
                 Hint: to upgrade a moderator to SUPER use:\n\
                 activate-super -u {username}"
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn set_super(state: &AppState, username: &str, superuser: bool) -> anyhow::Result<()> {
    let Some(moderator) = state.moderators().find_by_name(username).await? else {
        println!("ERROR: Moderator does not exist");
        return Ok(());
    };
    state.moderators().set_superuser(moderator.id, superuser).await?;
    println!(
        "{} is {} a superuser",
        moderator.username,
        if superuser { "now" } else { "no longer" }
    );
    Ok(())
}

pub async fn remove_moderator(state: &AppState, username: &str) -> anyhow::Result<()> {
    let Some(moderator) = state.moderators().find_by_name(username).await? else {
        println!("ERROR: Moderator does not exist");
        return Ok(());
    };
    state.moderators().delete(moderator.id).await?;
    println!("Removed moderator {}", moderator.username);
    Ok(())
}
