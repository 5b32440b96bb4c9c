//! Postgres store backend.
//!
//! Unique constraints on `identities.username`, `groups.name`, and
//! `permissions (scope, codename)` back the get-or-create invariants under
//! concurrent logins; `ON CONFLICT DO NOTHING` keeps edge writes
//! idempotent.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::contract::{AuthzStore, AuthzTx};
use crate::error::StoreError;
use crate::models::{LocalGroup, LocalIdentity, Permission};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Postgres-backed authorization store.
#[derive(Debug, Clone)]
pub struct PgAuthzStore {
    pool: PgPool,
}

impl PgAuthzStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().connect(url).await?;
        Ok(Self { pool })
    }

    /// Run embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthzStore for PgAuthzStore {
    type Tx = PgAuthzTx;

    async fn begin(&self) -> Result<PgAuthzTx, StoreError> {
        Ok(PgAuthzTx {
            tx: self.pool.begin().await?,
        })
    }
}

/// One open Postgres transaction.
pub struct PgAuthzTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AuthzTx for PgAuthzTx {
    async fn get_or_create_identity(
        &mut self,
        username: &str,
    ) -> Result<(LocalIdentity, bool), StoreError> {
        let existing: Option<LocalIdentity> =
            sqlx::query_as("SELECT * FROM identities WHERE username = $1")
                .bind(username)
                .fetch_optional(&mut *self.tx)
                .await?;

        if let Some(identity) = existing {
            return Ok((identity, false));
        }

        let inserted: Option<LocalIdentity> = sqlx::query_as(
            r"
            INSERT INTO identities (username)
            VALUES ($1)
            ON CONFLICT (username) DO NOTHING
            RETURNING *
            ",
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;

        match inserted {
            Some(identity) => {
                debug!(username, "created local identity");
                Ok((identity, true))
            }
            // Lost a race against a concurrent login for the same username.
            None => {
                let identity = sqlx::query_as("SELECT * FROM identities WHERE username = $1")
                    .bind(username)
                    .fetch_one(&mut *self.tx)
                    .await?;
                Ok((identity, false))
            }
        }
    }

    async fn update_identity(&mut self, identity: &LocalIdentity) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE identities
            SET email = $2,
                given_name = $3,
                family_name = $4,
                is_active = $5,
                credential_usable = $6,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&identity.given_name)
        .bind(&identity.family_name)
        .bind(identity.is_active)
        .bind(identity.credential_usable)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn get_or_create_group(&mut self, name: &str) -> Result<(LocalGroup, bool), StoreError> {
        let existing: Option<LocalGroup> = sqlx::query_as("SELECT * FROM groups WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;

        if let Some(group) = existing {
            return Ok((group, false));
        }

        let inserted: Option<LocalGroup> = sqlx::query_as(
            r"
            INSERT INTO groups (name)
            VALUES ($1)
            ON CONFLICT (name) DO NOTHING
            RETURNING *
            ",
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        match inserted {
            Some(group) => {
                debug!(name, "created local group");
                Ok((group, true))
            }
            None => {
                let group = sqlx::query_as("SELECT * FROM groups WHERE name = $1")
                    .bind(name)
                    .fetch_one(&mut *self.tx)
                    .await?;
                Ok((group, false))
            }
        }
    }

    async fn find_group(&mut self, name: &str) -> Result<Option<LocalGroup>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM groups WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn find_permission(
        &mut self,
        scope: &str,
        codename: &str,
    ) -> Result<Option<Permission>, StoreError> {
        Ok(sqlx::query_as(
            "SELECT id, scope, codename FROM permissions WHERE scope = $1 AND codename = $2",
        )
        .bind(scope)
        .bind(codename)
        .fetch_optional(&mut *self.tx)
        .await?)
    }

    async fn grant_permission(
        &mut self,
        group: &LocalGroup,
        permission: &Permission,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO group_permissions (group_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(group.id)
        .bind(permission.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn add_membership(
        &mut self,
        identity: &LocalIdentity,
        group: &LocalGroup,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO group_memberships (identity_id, group_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(identity.id)
        .bind(group.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn remove_membership(
        &mut self,
        identity: &LocalIdentity,
        group: &LocalGroup,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM group_memberships WHERE identity_id = $1 AND group_id = $2",
        )
        .bind(identity.id)
        .bind(group.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn membership_names(
        &mut self,
        identity: &LocalIdentity,
    ) -> Result<HashSet<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT g.name
            FROM group_memberships gm
            JOIN groups g ON g.id = gm.group_id
            WHERE gm.identity_id = $1
            ",
        )
        .bind(identity.id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
