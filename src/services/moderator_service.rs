//! Moderator store: account CRUD, grant management and permission queries.

use sqlx::PgPool;

use super::{dedup_ids, map_unique_violation, ServiceError};
use crate::auth::password;
use crate::database::models::{InterfaceMode, Moderator, Permission};

const MODERATOR_COLUMNS: &str = "id, username, password_hash, superuser, mode";

pub struct ModeratorService {
    pool: PgPool,
}

impl ModeratorService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a regular (non-super) account with a freshly hashed password.
    pub async fn register(&self, username: &str, plain_password: &str) -> Result<Moderator, ServiceError> {
        self.register_as(username, plain_password, false).await
    }

    /// Single-statement account insert. A superuser account is super from the
    /// moment the row exists; there is no separate promotion step that could
    /// fail halfway and leave a plain account behind.
    ///
    /// The name pre-check is advisory; the unique constraint on `username` is
    /// the source of truth and a race that slips past the pre-check surfaces
    /// as the same duplicate error.
    pub async fn register_as(
        &self,
        username: &str,
        plain_password: &str,
        superuser: bool,
    ) -> Result<Moderator, ServiceError> {
        if self.find_by_name(username).await?.is_some() {
            return Err(ServiceError::Duplicate(format!(
                "Moderator with username '{}' already exists",
                username
            )));
        }

        let hash = password::hash_password(plain_password)
            .map_err(|e| ServiceError::PasswordHash(e.to_string()))?;

        sqlx::query_as::<_, Moderator>(&format!(
            "INSERT INTO moderators (username, password_hash, superuser) VALUES ($1, $2, $3) RETURNING {MODERATOR_COLUMNS}"
        ))
        .bind(username)
        .bind(&hash)
        .bind(superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Moderator with this username already exists"))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Moderator>, ServiceError> {
        let row = sqlx::query_as::<_, Moderator>(&format!(
            "SELECT {MODERATOR_COLUMNS} FROM moderators WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_name(&self, username: &str) -> Result<Option<Moderator>, ServiceError> {
        let row = sqlx::query_as::<_, Moderator>(&format!(
            "SELECT {MODERATOR_COLUMNS} FROM moderators WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Paginated username-ordered listing. `search` is a case-insensitive
    /// substring match; `exclude` hides one account (the acting moderator)
    /// from the result.
    pub async fn search(
        &self,
        offset: i64,
        limit: i64,
        search: Option<&str>,
        exclude: Option<i64>,
    ) -> Result<Vec<Moderator>, ServiceError> {
        let pattern = search.map(|s| format!("%{}%", escape_like(s)));

        let rows = sqlx::query_as::<_, Moderator>(&format!(
            "SELECT {MODERATOR_COLUMNS} FROM moderators \
             WHERE ($1::bigint IS NULL OR id <> $1) \
               AND ($2::text IS NULL OR username ILIKE $2) \
             ORDER BY username ASC OFFSET $3 LIMIT $4"
        ))
        .bind(exclude)
        .bind(pattern)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub fn verify_password(&self, moderator: &Moderator, plain_password: &str) -> bool {
        password::verify_password(plain_password, &moderator.password_hash)
    }

    /// Idempotent grant. Returns whether a new grant row was created.
    pub async fn grant_permission(
        &self,
        moderator_id: i64,
        permission_id: i64,
    ) -> Result<bool, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(grant_in(&mut *conn, moderator_id, permission_id).await?)
    }

    /// Returns whether a grant row was deleted.
    pub async fn revoke_permission(
        &self,
        moderator_id: i64,
        permission_id: i64,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            "DELETE FROM moderator_permissions WHERE moderator_id = $1 AND permission_id = $2",
        )
        .bind(moderator_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete all matching grants at once; missing grants are not an error.
    pub async fn bundle_revoke(
        &self,
        moderator_id: i64,
        permission_ids: &[i64],
    ) -> Result<(), ServiceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(bundle_revoke_in(&mut *conn, moderator_id, permission_ids).await?)
    }

    /// Permissions held by the moderator; superusers hold everything.
    pub async fn list_permissions(&self, moderator: &Moderator) -> Result<Vec<Permission>, ServiceError> {
        let rows = if moderator.superuser {
            sqlx::query_as::<_, Permission>(
                "SELECT id, name, section_id FROM permissions ORDER BY name ASC",
            )
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Permission>(
                "SELECT p.id, p.name, p.section_id FROM permissions p \
                 JOIN moderator_permissions mp ON mp.permission_id = p.id \
                 WHERE mp.moderator_id = $1 ORDER BY p.name ASC",
            )
            .bind(moderator.id)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }

    /// Held permissions restricted to one section.
    pub async fn list_section_permissions(
        &self,
        moderator: &Moderator,
        section_id: i64,
    ) -> Result<Vec<Permission>, ServiceError> {
        let rows = if moderator.superuser {
            sqlx::query_as::<_, Permission>(
                "SELECT id, name, section_id FROM permissions WHERE section_id = $1 ORDER BY name ASC",
            )
            .bind(section_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Permission>(
                "SELECT p.id, p.name, p.section_id FROM permissions p \
                 JOIN moderator_permissions mp ON mp.permission_id = p.id \
                 WHERE p.section_id = $1 AND mp.moderator_id = $2 ORDER BY p.name ASC",
            )
            .bind(section_id)
            .bind(moderator.id)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }

    pub async fn has_permission(
        &self,
        moderator_id: i64,
        permission_id: i64,
    ) -> Result<bool, ServiceError> {
        let held = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM moderator_permissions \
             WHERE moderator_id = $1 AND permission_id = $2)",
        )
        .bind(moderator_id)
        .bind(permission_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(held)
    }

    /// Conjunction check: every requested id must be granted. Requested ids
    /// are deduplicated so repeats cannot inflate the count.
    pub async fn has_all_permissions(
        &self,
        moderator: &Moderator,
        permission_ids: &[i64],
    ) -> Result<bool, ServiceError> {
        if moderator.superuser {
            return Ok(true);
        }
        let wanted = dedup_ids(permission_ids);
        if wanted.is_empty() {
            return Ok(true);
        }
        let held = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM moderator_permissions \
             WHERE moderator_id = $1 AND permission_id = ANY($2)",
        )
        .bind(moderator.id)
        .bind(&wanted)
        .fetch_one(&self.pool)
        .await?;
        Ok(held == wanted.len() as i64)
    }

    /// Create an account together with its initial grants in one transaction.
    /// Each requested permission is validated inside that same transaction
    /// (it must exist, and the actor must be allowed to pass it on), so a
    /// validation failure never leaves a partially granted moderator behind
    /// and no concurrent revoke can slip between the check and the write.
    pub async fn create_with_grants(
        &self,
        actor: &Moderator,
        username: &str,
        plain_password: &str,
        permission_ids: &[i64],
    ) -> Result<Moderator, ServiceError> {
        let hash = password::hash_password(plain_password)
            .map_err(|e| ServiceError::PasswordHash(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        validate_grantable_in(&mut *tx, actor, permission_ids).await?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM moderators WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            return Err(ServiceError::Duplicate(format!(
                "Moderator with username '{}' already exists",
                username
            )));
        }

        let moderator = sqlx::query_as::<_, Moderator>(&format!(
            "INSERT INTO moderators (username, password_hash) VALUES ($1, $2) RETURNING {MODERATOR_COLUMNS}"
        ))
        .bind(username)
        .bind(&hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Moderator with this username already exists"))?;

        for permission_id in dedup_ids(permission_ids) {
            grant_in(&mut *tx, moderator.id, permission_id).await?;
        }

        tx.commit().await?;
        Ok(moderator)
    }

    /// Apply an admin edit (rename, password reset, grant/revoke lists) as a
    /// single transaction. Every edited permission id is validated inside the
    /// same transaction before any row changes. Changing credentials does not
    /// revoke tokens the target already holds.
    pub async fn apply_edits(
        &self,
        actor: &Moderator,
        target_id: i64,
        username: Option<&str>,
        plain_password: Option<&str>,
        append: &[i64],
        remove: &[i64],
    ) -> Result<(), ServiceError> {
        let new_hash = match plain_password {
            Some(p) => Some(
                password::hash_password(p).map_err(|e| ServiceError::PasswordHash(e.to_string()))?,
            ),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let mut edited = append.to_vec();
        edited.extend_from_slice(remove);
        validate_grantable_in(&mut *tx, actor, &edited).await?;

        if let Some(username) = username {
            sqlx::query("UPDATE moderators SET username = $1 WHERE id = $2")
                .bind(username)
                .bind(target_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_unique_violation(e, "Moderator with this username already exists"))?;
        }

        if let Some(hash) = new_hash {
            sqlx::query("UPDATE moderators SET password_hash = $1 WHERE id = $2")
                .bind(hash)
                .bind(target_id)
                .execute(&mut *tx)
                .await?;
        }

        for permission_id in dedup_ids(append) {
            grant_in(&mut *tx, target_id, permission_id).await?;
        }

        bundle_revoke_in(&mut *tx, target_id, remove).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn set_superuser(&self, moderator_id: i64, superuser: bool) -> Result<(), ServiceError> {
        sqlx::query("UPDATE moderators SET superuser = $1 WHERE id = $2")
            .bind(superuser)
            .bind(moderator_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_mode(&self, moderator_id: i64, mode: InterfaceMode) -> Result<(), ServiceError> {
        sqlx::query("UPDATE moderators SET mode = $1 WHERE id = $2")
            .bind(mode)
            .bind(moderator_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete an account; grants cascade. Returns whether a row was deleted.
    pub async fn delete(&self, moderator_id: i64) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM moderators WHERE id = $1")
            .bind(moderator_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// Validate a batch of grant/revoke targets inside the mutating transaction:
/// every id must name a stored permission, and a non-super actor may only
/// pass on permissions they hold themselves. The actor's own grant rows are
/// share-locked until the transaction commits, so a concurrent revoke cannot
/// invalidate the check before the write lands.
async fn validate_grantable_in(
    conn: &mut sqlx::PgConnection,
    actor: &Moderator,
    permission_ids: &[i64],
) -> Result<(), ServiceError> {
    for &permission_id in permission_ids {
        let known = sqlx::query_scalar::<_, i64>("SELECT id FROM permissions WHERE id = $1")
            .bind(permission_id)
            .fetch_optional(&mut *conn)
            .await?;
        if known.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Permission {} does not exist",
                permission_id
            )));
        }
        if !actor.superuser {
            let held = sqlx::query_scalar::<_, i32>(
                "SELECT 1 FROM moderator_permissions \
                 WHERE moderator_id = $1 AND permission_id = $2 FOR SHARE",
            )
            .bind(actor.id)
            .bind(permission_id)
            .fetch_optional(&mut *conn)
            .await?;
            if held.is_none() {
                return Err(ServiceError::Forbidden(format!(
                    "You can not grant or remove permission #{}",
                    permission_id
                )));
            }
        }
    }
    Ok(())
}

/// Insert a grant row unless it already exists. Returns whether a new row was
/// written, so callers can distinguish a fresh grant from a repeat.
async fn grant_in(
    conn: &mut sqlx::PgConnection,
    moderator_id: i64,
    permission_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO moderator_permissions (moderator_id, permission_id) \
         VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(moderator_id)
    .bind(permission_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Drop a batch of grants in one statement. Missing grants are ignored.
async fn bundle_revoke_in(
    conn: &mut sqlx::PgConnection,
    moderator_id: i64,
    permission_ids: &[i64],
) -> Result<(), sqlx::Error> {
    if permission_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "DELETE FROM moderator_permissions WHERE moderator_id = $1 AND permission_id = ANY($2)",
    )
    .bind(moderator_id)
    .bind(permission_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Escape LIKE wildcards so a search substring matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == '\\' || c == '%' || c == '_' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("ali"), "ali");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
