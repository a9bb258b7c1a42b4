//! Store, catalog and evaluator tests against a real database.
//!
//! Set MUB_TEST_DATABASE_URL to a disposable Postgres database to enable;
//! without it the tests are skipped so the suite stays green with no
//! database. Rows created here carry a per-run marker so reruns never
//! collide with earlier data.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use mub_api::catalog::PermissionCatalog;
use mub_api::database::schema;
use mub_api::handlers::supervision;
use mub_api::services::{ModeratorService, ServiceError};
use mub_api::state::AppState;

static SCHEMA: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();

async fn test_pool() -> Result<Option<PgPool>> {
    let Ok(url) = std::env::var("MUB_TEST_DATABASE_URL") else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await?;

    // Bootstrap once; the tests in this file run concurrently
    SCHEMA
        .get_or_try_init(|| async { schema::ensure_schema(&pool).await })
        .await?;
    Ok(Some(pool))
}

async fn test_state(pool: PgPool) -> Result<AppState> {
    let mut catalog = PermissionCatalog::new();
    let permissions = supervision::declare(&mut catalog)?;
    catalog.initialize(&pool).await?;
    Ok(AppState::new(pool, Arc::new(catalog), permissions))
}

fn run_marker() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[tokio::test]
async fn duplicate_registration_is_rejected() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let store = ModeratorService::new(pool);
    let name = format!("dup-{}", run_marker());

    store.register(&name, "pw").await?;
    let second = store.register(&name, "pw").await;
    assert!(matches!(second, Err(ServiceError::Duplicate(_))));
    Ok(())
}

#[tokio::test]
async fn super_accounts_are_super_from_creation() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let store = ModeratorService::new(pool);

    let created = store
        .register_as(&format!("root-{}", run_marker()), "pw", true)
        .await?;
    assert!(created.superuser);

    let fetched = store.find_by_id(created.id).await?.unwrap();
    assert!(fetched.superuser);
    Ok(())
}

#[tokio::test]
async fn grants_are_idempotent_and_missing_revokes_are_reported() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = test_state(pool).await?;
    let permission_id = state.catalog.resolve(&state.permissions.manage_mods)?;
    let store = state.moderators();
    let moderator = store.register(&format!("idem-{}", run_marker()), "pw").await?;

    // Revoking before any grant reports the missing row
    assert!(!store.revoke_permission(moderator.id, permission_id).await?);

    assert!(store.grant_permission(moderator.id, permission_id).await?);
    // Second grant is a no-op, not an error
    assert!(!store.grant_permission(moderator.id, permission_id).await?);

    assert!(store.revoke_permission(moderator.id, permission_id).await?);
    assert!(!store.revoke_permission(moderator.id, permission_id).await?);
    Ok(())
}

#[tokio::test]
async fn reinitializing_the_catalog_reuses_stored_rows() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };

    let mut first = PermissionCatalog::new();
    let declared = supervision::declare(&mut first)?;
    first.initialize(&pool).await?;
    let first_id = first.resolve(&declared.manage_mods)?;

    // A fresh process runs the same declarations against the same storage
    let mut second = PermissionCatalog::new();
    let redeclared = supervision::declare(&mut second)?;
    second.initialize(&pool).await?;
    assert_eq!(second.resolve(&redeclared.manage_mods)?, first_id);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions WHERE name = $1")
        .bind("manage mods")
        .fetch_one(&pool)
        .await?;
    assert_eq!(rows, 1);
    Ok(())
}

#[tokio::test]
async fn evaluator_follows_grant_and_revoke() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = test_state(pool).await?;
    let permission_id = state.catalog.resolve(&state.permissions.manage_mods)?;
    let store = state.moderators();
    let alice = store.register(&format!("alice-{}", run_marker()), "pw").await?;

    assert!(!state.evaluator.check(&alice, &state.permissions.manage_mods).await?);

    store.grant_permission(alice.id, permission_id).await?;
    assert!(state.evaluator.check(&alice, &state.permissions.manage_mods).await?);
    state.evaluator.require(&alice, &state.permissions.manage_mods).await?;

    store.revoke_permission(alice.id, permission_id).await?;
    assert!(!state.evaluator.check(&alice, &state.permissions.manage_mods).await?);
    assert!(state
        .evaluator
        .require(&alice, &state.permissions.manage_mods)
        .await
        .is_err());
    Ok(())
}

#[tokio::test]
async fn permissions_relay_only_when_the_actor_holds_them() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };

    // Declare an extra permission the managing moderator does not hold
    let mut catalog = PermissionCatalog::new();
    let permissions = supervision::declare(&mut catalog)?;
    let section = catalog.add_section("content")?;
    let edit_pages = catalog.add_permission(&section, "edit pages")?;
    catalog.initialize(&pool).await?;
    let state = AppState::new(pool, Arc::new(catalog), permissions);

    let manage_id = state.catalog.resolve(&state.permissions.manage_mods)?;
    let edit_id = state.catalog.resolve(&edit_pages)?;
    let store = state.moderators();
    let marker = run_marker();

    let bob = store.register(&format!("bob-{marker}"), "pw").await?;
    store.grant_permission(bob.id, manage_id).await?;
    let carol = store.register(&format!("carol-{marker}"), "pw").await?;

    // Bob manages moderators but does not hold "edit pages" himself
    let denied = store
        .apply_edits(&bob, carol.id, None, None, &[edit_id], &[])
        .await;
    assert!(matches!(denied, Err(ServiceError::Forbidden(_))));
    assert!(!store.has_permission(carol.id, edit_id).await?);

    // Holding the permission makes the same relay legal
    store.grant_permission(bob.id, edit_id).await?;
    store
        .apply_edits(&bob, carol.id, None, None, &[edit_id], &[])
        .await?;
    assert!(store.has_permission(carol.id, edit_id).await?);
    Ok(())
}

#[tokio::test]
async fn failed_grant_validation_creates_no_account() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = test_state(pool).await?;
    let store = state.moderators();
    let marker = run_marker();

    let admin = store.register_as(&format!("admin-{marker}"), "pw", true).await?;
    let name = format!("ghost-{marker}");

    let unknown_permission = i64::MAX;
    let err = store
        .create_with_grants(&admin, &name, "pw", &[unknown_permission])
        .await;
    assert!(matches!(err, Err(ServiceError::NotFound(_))));

    // The rejected creation left nothing behind
    assert!(store.find_by_name(&name).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn search_excludes_the_acting_moderator() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let store = ModeratorService::new(pool);
    let marker = run_marker();

    let actor = store.register(&format!("search-{marker}-a"), "pw").await?;
    let other = store.register(&format!("search-{marker}-b"), "pw").await?;

    let rows = store.search(0, 10, Some(&marker), Some(actor.id)).await?;
    let names: Vec<&str> = rows.iter().map(|m| m.username.as_str()).collect();
    assert!(!names.contains(&actor.username.as_str()));
    assert!(names.contains(&other.username.as_str()));
    Ok(())
}
