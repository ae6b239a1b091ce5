//! Postgres repositories for grants, identities, and share aliases.

use arbor_access::{Grant, Identity, Privilege, ShareAlias, StoreError};
use arbor_access::{AliasStore, GrantStore, IdentityStore};
use arbor_core::{GrantId, IdentityId, ShareTag};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

fn store_error(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        details: err.to_string(),
    }
}

fn decode_error(what: &str, value: &str, reason: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable {
        details: format!("invalid {what} '{value}': {reason}"),
    }
}

/// Row type for grant queries.
#[derive(FromRow)]
struct GrantRow {
    id: String,
    uri: String,
    identity_id: String,
    parent_id: Option<String>,
    privilege: i16,
}

impl GrantRow {
    fn try_into_grant(self) -> Result<Grant, StoreError> {
        let id = GrantId::from_str(&self.id).map_err(|e| decode_error("grant id", &self.id, e))?;
        let identity_id = IdentityId::from_str(&self.identity_id)
            .map_err(|e| decode_error("identity id", &self.identity_id, e))?;
        let parent_id = self
            .parent_id
            .as_deref()
            .map(|parent| {
                GrantId::from_str(parent).map_err(|e| decode_error("parent grant id", parent, e))
            })
            .transpose()?;
        let privilege = Privilege::from_i16(self.privilege)
            .ok_or_else(|| decode_error("privilege", &self.privilege.to_string(), "out of range"))?;

        Ok(Grant::with_all_fields(
            id,
            self.uri,
            identity_id,
            parent_id,
            privilege,
        ))
    }
}

/// Row type for identity queries.
#[derive(FromRow)]
struct IdentityRow {
    id: String,
    username: String,
    is_virtual: bool,
}

impl IdentityRow {
    fn try_into_identity(self) -> Result<Identity, StoreError> {
        let id =
            IdentityId::from_str(&self.id).map_err(|e| decode_error("identity id", &self.id, e))?;
        Ok(Identity::with_all_fields(id, self.username, self.is_virtual))
    }
}

/// Row type for alias queries.
#[derive(FromRow)]
struct AliasRow {
    tag: String,
    root_uri: String,
    identity_id: String,
    notes: String,
}

impl AliasRow {
    fn try_into_alias(self) -> Result<ShareAlias, StoreError> {
        let identity_id = IdentityId::from_str(&self.identity_id)
            .map_err(|e| decode_error("identity id", &self.identity_id, e))?;
        Ok(ShareAlias::new(
            ShareTag::new(self.tag),
            self.root_uri,
            identity_id,
            self.notes,
        ))
    }
}

/// Postgres-backed grant store.
#[derive(Clone)]
pub struct PgGrantStore {
    pool: PgPool,
}

impl PgGrantStore {
    /// Creates a new grant store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn convert_grants(rows: Vec<GrantRow>) -> Result<Vec<Grant>, StoreError> {
    rows.into_iter().map(GrantRow::try_into_grant).collect()
}

#[async_trait]
impl GrantStore for PgGrantStore {
    async fn create(&self, grant: Grant) -> Result<GrantId, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO grants (id, uri, identity_id, parent_id, privilege)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(grant.id().to_string())
        .bind(grant.uri())
        .bind(grant.identity_id().to_string())
        .bind(grant.parent_id().map(|id| id.to_string()))
        .bind(grant.privilege().as_i16())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(grant.id())
    }

    async fn get(&self, id: GrantId) -> Result<Option<Grant>, StoreError> {
        let row: Option<GrantRow> = sqlx::query_as(
            r#"
            SELECT id, uri, identity_id, parent_id, privilege
            FROM grants
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_grant()?)),
            None => Ok(None),
        }
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Vec<Grant>, StoreError> {
        let rows: Vec<GrantRow> = sqlx::query_as(
            r#"
            SELECT id, uri, identity_id, parent_id, privilege
            FROM grants
            WHERE uri = $1
            "#,
        )
        .bind(uri)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        convert_grants(rows)
    }

    async fn find_for_identities(
        &self,
        ids: &[IdentityId],
        uri: &str,
    ) -> Result<Vec<Grant>, StoreError> {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let rows: Vec<GrantRow> = sqlx::query_as(
            r#"
            SELECT id, uri, identity_id, parent_id, privilege
            FROM grants
            WHERE identity_id = ANY($1) AND uri = $2
            "#,
        )
        .bind(ids)
        .bind(uri)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        convert_grants(rows)
    }

    async fn children_of(&self, parent: GrantId) -> Result<Vec<Grant>, StoreError> {
        let rows: Vec<GrantRow> = sqlx::query_as(
            r#"
            SELECT id, uri, identity_id, parent_id, privilege
            FROM grants
            WHERE parent_id = $1
            "#,
        )
        .bind(parent.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        convert_grants(rows)
    }

    async fn roots_for(&self, ids: &[IdentityId]) -> Result<Vec<Grant>, StoreError> {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let rows: Vec<GrantRow> = sqlx::query_as(
            r#"
            SELECT id, uri, identity_id, parent_id, privilege
            FROM grants
            WHERE identity_id = ANY($1) AND parent_id IS NULL
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        convert_grants(rows)
    }

    async fn set_privilege(&self, id: GrantId, privilege: Privilege) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE grants
            SET privilege = $2
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .bind(privilege.as_i16())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: format!("grant {id}"),
            });
        }
        Ok(())
    }

    async fn set_uri(&self, id: GrantId, uri: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE grants
            SET uri = $2
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .bind(uri)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: format!("grant {id}"),
            });
        }
        Ok(())
    }

    async fn delete(&self, id: GrantId) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM grants
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}

/// Postgres-backed identity store.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Creates a new identity store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn create_virtual(&self) -> Result<Identity, StoreError> {
        let identity = Identity::new_virtual();
        sqlx::query(
            r#"
            INSERT INTO identities (id, username, is_virtual)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(identity.id().to_string())
        .bind(identity.username())
        .bind(identity.is_virtual())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(identity)
    }

    async fn find(
        &self,
        ids: &[IdentityId],
        username: Option<&str>,
    ) -> Result<Vec<Identity>, StoreError> {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let rows: Vec<IdentityRow> = match username {
            Some(name) => {
                sqlx::query_as(
                    r#"
                    SELECT id, username, is_virtual
                    FROM identities
                    WHERE id = ANY($1) AND username = $2
                    "#,
                )
                .bind(ids)
                .bind(name)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, username, is_virtual
                    FROM identities
                    WHERE id = ANY($1)
                    "#,
                )
                .bind(ids)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(store_error)?;

        rows.into_iter().map(IdentityRow::try_into_identity).collect()
    }
}

/// Postgres-backed alias store.
#[derive(Clone)]
pub struct PgAliasStore {
    pool: PgPool,
}

impl PgAliasStore {
    /// Creates a new alias store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AliasStore for PgAliasStore {
    async fn create(&self, alias: ShareAlias) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO share_aliases (tag, root_uri, identity_id, notes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(alias.tag().as_str())
        .bind(alias.root_uri())
        .bind(alias.identity_id().to_string())
        .bind(alias.notes())
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict {
                details: format!("alias tag {} already exists", alias.tag()),
            },
            _ => store_error(err),
        })?;

        Ok(())
    }

    async fn find_by_tag(&self, tag: &ShareTag) -> Result<Option<ShareAlias>, StoreError> {
        let row: Option<AliasRow> = sqlx::query_as(
            r#"
            SELECT tag, root_uri, identity_id, notes
            FROM share_aliases
            WHERE tag = $1
            "#,
        )
        .bind(tag.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_alias()?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_row_converts() {
        let id = GrantId::new();
        let identity = IdentityId::new();
        let parent = GrantId::new();
        let row = GrantRow {
            id: id.to_string(),
            uri: "db/user/alice/col1".to_string(),
            identity_id: identity.to_string(),
            parent_id: Some(parent.to_string()),
            privilege: 2,
        };

        let grant = row.try_into_grant().expect("valid row");
        assert_eq!(grant.id(), id);
        assert_eq!(grant.identity_id(), identity);
        assert_eq!(grant.parent_id(), Some(parent));
        assert_eq!(grant.privilege(), Privilege::Write);
    }

    #[test]
    fn grant_row_rejects_bad_privilege() {
        let row = GrantRow {
            id: GrantId::new().to_string(),
            uri: "db/user/alice/col1".to_string(),
            identity_id: IdentityId::new().to_string(),
            parent_id: None,
            privilege: 9,
        };
        assert!(row.try_into_grant().is_err());
    }

    #[test]
    fn grant_row_rejects_bad_id() {
        let row = GrantRow {
            id: "not_an_id".to_string(),
            uri: "db/user/alice/col1".to_string(),
            identity_id: IdentityId::new().to_string(),
            parent_id: None,
            privilege: 1,
        };
        assert!(row.try_into_grant().is_err());
    }

    #[test]
    fn identity_row_converts() {
        let id = IdentityId::new();
        let row = IdentityRow {
            id: id.to_string(),
            username: "alice".to_string(),
            is_virtual: false,
        };
        let identity = row.try_into_identity().expect("valid row");
        assert_eq!(identity.id(), id);
        assert_eq!(identity.username(), "alice");
        assert!(!identity.is_virtual());
    }

    #[test]
    fn alias_row_converts() {
        let identity = IdentityId::new();
        let row = AliasRow {
            tag: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            root_uri: "https://share.example.org/user/alice/col1".to_string(),
            identity_id: identity.to_string(),
            notes: "for review".to_string(),
        };
        let alias = row.try_into_alias().expect("valid row");
        assert_eq!(alias.tag().as_str(), "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert_eq!(alias.identity_id(), identity);
    }
}
