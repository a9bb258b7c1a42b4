pub mod commands;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::catalog::PermissionCatalog;
use crate::database;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "mub")]
#[command(about = "MUB CLI - out-of-band administration for the moderator backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List known permissions, one page at a time")]
    ListPermissions {
        #[arg(short, long, default_value_t = 0)]
        page: i64,
    },

    #[command(about = "List moderator accounts, one page at a time")]
    ListModerators {
        #[arg(short, long, default_value_t = 0)]
        page: i64,
    },

    #[command(about = "Create a regular moderator account")]
    CreateModerator {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },

    #[command(about = "Create a superuser account")]
    CreateSuper {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },

    #[command(about = "Promote an existing moderator to superuser")]
    ActivateSuper {
        #[arg(short, long)]
        username: String,
    },

    #[command(about = "Demote a superuser back to a regular moderator")]
    DeactivateSuper {
        #[arg(short, long)]
        username: String,
    },

    #[command(about = "Delete a moderator account")]
    RemoveModerator {
        #[arg(short, long)]
        username: String,
    },

    #[command(about = "Grant a named permission to a moderator")]
    GrantPermission {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        permission: String,
    },

    #[command(about = "Revoke a named permission from a moderator")]
    RevokePermission {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        permission: String,
    },

    #[command(about = "List the permissions a moderator holds")]
    ListGrants {
        #[arg(short, long)]
        username: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    // Same bootstrap as the server: schema, then declared catalog reconciled
    // against storage. Admin commands must not run against an uninitialized
    // catalog.
    let pool = database::connect_pool().await?;
    database::schema::ensure_schema(&pool).await?;

    let mut catalog = PermissionCatalog::new();
    let permissions = crate::handlers::supervision::declare(&mut catalog)?;
    if let Err(e) = catalog.initialize(&pool).await {
        anyhow::bail!("FATAL: Permission catalog has not been initialized: {e}");
    }

    let state = AppState::new(pool, Arc::new(catalog), permissions);

    match cli.command {
        Commands::ListPermissions { page } => {
            commands::permissions::list_permissions(&state, page, output_format).await
        }
        Commands::ListModerators { page } => {
            commands::moderators::list_moderators(&state, page, output_format).await
        }
        Commands::CreateModerator { username, password } => {
            commands::moderators::create_moderator(&state, &username, &password).await
        }
        Commands::CreateSuper { username, password } => {
            commands::moderators::create_super(&state, &username, &password).await
        }
        Commands::ActivateSuper { username } => {
            commands::moderators::set_super(&state, &username, true).await
        }
        Commands::DeactivateSuper { username } => {
            commands::moderators::set_super(&state, &username, false).await
        }
        Commands::RemoveModerator { username } => {
            commands::moderators::remove_moderator(&state, &username).await
        }
        Commands::GrantPermission { username, permission } => {
            commands::permissions::grant_permission(&state, &username, &permission).await
        }
        Commands::RevokePermission { username, permission } => {
            commands::permissions::revoke_permission(&state, &username, &permission).await
        }
        Commands::ListGrants { username } => {
            commands::permissions::list_grants(&state, &username, output_format).await
        }
    }
}
