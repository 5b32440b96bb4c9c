//! In-memory store backend.
//!
//! Transactions stage their writes against a snapshot of the shared state
//! and publish it on commit, which gives the same all-or-nothing
//! visibility as the Postgres backend. Writers are serialized by the
//! mutex; this backend is for tests and single-process deployments, not
//! for contended multi-writer use.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::contract::{AuthzStore, AuthzTx};
use crate::error::StoreError;
use crate::models::{LocalGroup, LocalIdentity, Permission};

#[derive(Debug, Clone, Default)]
struct State {
    identities: Vec<LocalIdentity>,
    groups: Vec<LocalGroup>,
    permissions: Vec<Permission>,
    group_permissions: HashSet<(Uuid, Uuid)>,
    memberships: HashSet<(Uuid, Uuid)>,
}

/// In-memory authorization store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a permission record, as schema provisioning would in the
    /// Postgres backend.
    pub fn insert_permission(
        &self,
        scope: impl Into<String>,
        codename: impl Into<String>,
    ) -> Result<Permission, StoreError> {
        let permission = Permission {
            id: Uuid::new_v4(),
            scope: scope.into(),
            codename: codename.into(),
        };
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        state.permissions.push(permission.clone());
        Ok(permission)
    }

    /// Committed permissions attached to a group, for diagnostics and
    /// assertions.
    pub fn permissions_for_group(&self, name: &str) -> Result<Vec<Permission>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        let Some(group) = state.groups.iter().find(|group| group.name == name) else {
            return Ok(Vec::new());
        };
        Ok(state
            .permissions
            .iter()
            .filter(|permission| state.group_permissions.contains(&(group.id, permission.id)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuthzStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let staged = self.state.lock().map_err(|_| StoreError::Poisoned)?.clone();
        Ok(MemoryTx {
            shared: Arc::clone(&self.state),
            staged,
        })
    }
}

/// One open in-memory transaction. Dropping it discards the staged state.
pub struct MemoryTx {
    shared: Arc<Mutex<State>>,
    staged: State,
}

#[async_trait]
impl AuthzTx for MemoryTx {
    async fn get_or_create_identity(
        &mut self,
        username: &str,
    ) -> Result<(LocalIdentity, bool), StoreError> {
        if let Some(identity) = self
            .staged
            .identities
            .iter()
            .find(|identity| identity.username == username)
        {
            return Ok((identity.clone(), false));
        }

        let now = Utc::now();
        let identity = LocalIdentity {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: None,
            given_name: None,
            family_name: None,
            is_active: false,
            credential_usable: false,
            created_at: now,
            updated_at: now,
        };
        self.staged.identities.push(identity.clone());
        Ok((identity, true))
    }

    async fn update_identity(&mut self, identity: &LocalIdentity) -> Result<(), StoreError> {
        if let Some(stored) = self
            .staged
            .identities
            .iter_mut()
            .find(|stored| stored.id == identity.id)
        {
            stored.email = identity.email.clone();
            stored.given_name = identity.given_name.clone();
            stored.family_name = identity.family_name.clone();
            stored.is_active = identity.is_active;
            stored.credential_usable = identity.credential_usable;
            stored.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn get_or_create_group(&mut self, name: &str) -> Result<(LocalGroup, bool), StoreError> {
        if let Some(group) = self.staged.groups.iter().find(|group| group.name == name) {
            return Ok((group.clone(), false));
        }

        let group = LocalGroup {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.staged.groups.push(group.clone());
        Ok((group, true))
    }

    async fn find_group(&mut self, name: &str) -> Result<Option<LocalGroup>, StoreError> {
        Ok(self
            .staged
            .groups
            .iter()
            .find(|group| group.name == name)
            .cloned())
    }

    async fn find_permission(
        &mut self,
        scope: &str,
        codename: &str,
    ) -> Result<Option<Permission>, StoreError> {
        Ok(self
            .staged
            .permissions
            .iter()
            .find(|permission| permission.scope == scope && permission.codename == codename)
            .cloned())
    }

    async fn grant_permission(
        &mut self,
        group: &LocalGroup,
        permission: &Permission,
    ) -> Result<(), StoreError> {
        self.staged
            .group_permissions
            .insert((group.id, permission.id));
        Ok(())
    }

    async fn add_membership(
        &mut self,
        identity: &LocalIdentity,
        group: &LocalGroup,
    ) -> Result<(), StoreError> {
        self.staged.memberships.insert((identity.id, group.id));
        Ok(())
    }

    async fn remove_membership(
        &mut self,
        identity: &LocalIdentity,
        group: &LocalGroup,
    ) -> Result<(), StoreError> {
        self.staged.memberships.remove(&(identity.id, group.id));
        Ok(())
    }

    async fn membership_names(
        &mut self,
        identity: &LocalIdentity,
    ) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .staged
            .memberships
            .iter()
            .filter(|(identity_id, _)| *identity_id == identity.id)
            .filter_map(|(_, group_id)| {
                self.staged
                    .groups
                    .iter()
                    .find(|group| group.id == *group_id)
                    .map(|group| group.name.clone())
            })
            .collect())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut shared = self.shared.lock().map_err(|_| StoreError::Poisoned)?;
        *shared = self.staged;
        Ok(())
    }
}
