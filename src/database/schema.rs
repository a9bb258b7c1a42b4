//! Idempotent schema bootstrap, run by both binaries before the catalog
//! initializes.

use sqlx::PgPool;

use super::DatabaseError;

const STATEMENTS: &[&str] = &[
    // interface_mode backs the cosmetic moderator preference
    r#"
    DO $$ BEGIN
        CREATE TYPE interface_mode AS ENUM ('dark', 'light');
    EXCEPTION
        WHEN duplicate_object THEN NULL;
    END $$
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sections (
        id   BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS permissions (
        id         BIGSERIAL PRIMARY KEY,
        name       TEXT NOT NULL UNIQUE,
        section_id BIGINT REFERENCES sections(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS moderators (
        id            BIGSERIAL PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        superuser     BOOLEAN NOT NULL DEFAULT FALSE,
        mode          interface_mode NOT NULL DEFAULT 'dark'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS moderator_permissions (
        moderator_id  BIGINT NOT NULL REFERENCES moderators(id) ON DELETE CASCADE,
        permission_id BIGINT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
        PRIMARY KEY (moderator_id, permission_id)
    )
    "#,
    // Revoked session tokens; purging expired rows is left to housekeeping
    r#"
    CREATE TABLE IF NOT EXISTS blocked_tokens (
        id  BIGSERIAL PRIMARY KEY,
        jti TEXT NOT NULL
    )
    "#,
];

pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
