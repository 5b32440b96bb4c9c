//! The transactional store contract.
//!
//! All writes the authentication engine performs go through one
//! [`AuthzTx`]: get-or-create operations are idempotent, and nothing is
//! visible to other readers until `commit`. Dropping an uncommitted
//! transaction rolls it back.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{LocalGroup, LocalIdentity, Permission};

/// A store that can open transactions.
#[async_trait]
pub trait AuthzStore: Send + Sync {
    type Tx: AuthzTx;

    /// Begin a transaction.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// One open store transaction.
#[async_trait]
pub trait AuthzTx: Send {
    /// Look up an identity by username, creating it if absent.
    /// Returns the identity and whether it was created.
    async fn get_or_create_identity(
        &mut self,
        username: &str,
    ) -> Result<(LocalIdentity, bool), StoreError>;

    /// Persist the mutable fields of an identity.
    async fn update_identity(&mut self, identity: &LocalIdentity) -> Result<(), StoreError>;

    /// Look up a group by name, creating it if absent.
    async fn get_or_create_group(&mut self, name: &str) -> Result<(LocalGroup, bool), StoreError>;

    /// Look up a group by name.
    async fn find_group(&mut self, name: &str) -> Result<Option<LocalGroup>, StoreError>;

    /// Look up a permission by scope and codename. A miss is `Ok(None)`,
    /// not an error; the caller decides whether that is fatal.
    async fn find_permission(
        &mut self,
        scope: &str,
        codename: &str,
    ) -> Result<Option<Permission>, StoreError>;

    /// Attach a permission to a group. Idempotent.
    async fn grant_permission(
        &mut self,
        group: &LocalGroup,
        permission: &Permission,
    ) -> Result<(), StoreError>;

    /// Add the identity to the group. Idempotent.
    async fn add_membership(
        &mut self,
        identity: &LocalIdentity,
        group: &LocalGroup,
    ) -> Result<(), StoreError>;

    /// Remove the identity from the group. The group itself stays.
    async fn remove_membership(
        &mut self,
        identity: &LocalIdentity,
        group: &LocalGroup,
    ) -> Result<(), StoreError>;

    /// Names of all groups the identity belongs to.
    async fn membership_names(
        &mut self,
        identity: &LocalIdentity,
    ) -> Result<HashSet<String>, StoreError>;

    /// Commit the transaction, making all changes visible at once.
    async fn commit(self) -> Result<(), StoreError>;
}
