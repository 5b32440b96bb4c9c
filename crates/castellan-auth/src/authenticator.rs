//! The authentication facade.
//!
//! One call per login attempt: resolve the bind identity, verify the
//! credentials, extract remote groups, and reconcile the local store in a
//! single transaction. The directory session is released on every exit
//! path.

use castellan_directory::{
    CredentialVerifier, DirectoryClient, DirectoryConnector, DirectoryEntry, DirectoryError,
    DirectorySettings, GroupExtractor, IdentityResolver, Verified,
};
use castellan_store::{AuthzStore, AuthzTx, LocalIdentity};
use tracing::{info, instrument};

use crate::error::DenialReason;
use crate::policy::SyncPolicy;
use crate::sync::GroupSyncEngine;

/// The single entry point for directory-backed authentication.
///
/// Holds no per-attempt state; a shared reference can serve concurrent
/// logins, with uniqueness under concurrency delegated to the store's
/// transactional get-or-create semantics.
pub struct Authenticator<D: DirectoryConnector, S: AuthzStore> {
    directory: D,
    store: S,
    resolver: IdentityResolver,
    verifier: CredentialVerifier,
    extractor: GroupExtractor,
    engine: GroupSyncEngine,
}

impl<D: DirectoryConnector, S: AuthzStore> Authenticator<D, S> {
    /// Build an authenticator. Settings are validated eagerly; a missing
    /// domain or service credential is an error here, not at login time.
    pub fn new(
        directory: D,
        store: S,
        settings: DirectorySettings,
        policy: SyncPolicy,
    ) -> Result<Self, DirectoryError> {
        settings.validate()?;
        Ok(Self {
            directory,
            store,
            resolver: IdentityResolver::new(settings.clone()),
            verifier: CredentialVerifier::new(settings.clone()),
            extractor: GroupExtractor::new(settings),
            engine: GroupSyncEngine::new(policy),
        })
    }

    /// Authenticate a username/password pair.
    ///
    /// Returns the resolved local identity, or `None` for every failure
    /// mode: bad credentials, unreachable server, missing entry,
    /// configuration faults, and store faults all look identical to the
    /// caller. The stage that failed is logged for operators.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn authenticate(&self, username: &str, secret: &str) -> Option<LocalIdentity> {
        match self.try_authenticate(username, secret).await {
            Ok(identity) => {
                info!(username, "authentication granted");
                Some(identity)
            }
            Err(reason) => {
                reason.log(username);
                None
            }
        }
    }

    async fn try_authenticate(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<LocalIdentity, DenialReason> {
        if username.is_empty() || secret.is_empty() {
            return Err(DenialReason::EmptyCredentials);
        }

        let bind = self
            .resolver
            .resolve(&self.directory, username)
            .await
            .map_err(DenialReason::Directory)?;

        let mut verified = self
            .verifier
            .verify(&self.directory, &bind, username, secret)
            .await
            .map_err(DenialReason::Directory)?;

        let outcome = self.provision(&mut verified, username).await;
        // Release the directory session on every exit path.
        verified.client.close().await;
        outcome
    }

    /// Extract remote groups and run the store transaction: identity
    /// upsert and group reconciliation commit together or not at all.
    async fn provision(
        &self,
        verified: &mut Verified<D::Client>,
        username: &str,
    ) -> Result<LocalIdentity, DenialReason> {
        let remote_groups = self
            .extractor
            .extract(&mut verified.client, &verified.entry)
            .await
            .map_err(DenialReason::Directory)?;

        let mut tx = self.store.begin().await.map_err(DenialReason::Store)?;

        let (mut identity, created) = tx
            .get_or_create_identity(username)
            .await
            .map_err(DenialReason::Store)?;
        if created {
            identity.is_active = true;
        }
        apply_entry_attributes(&mut identity, &verified.entry);
        // The directory stays the credential authority; the local secret
        // is never usable.
        identity.credential_usable = false;

        tx.update_identity(&identity)
            .await
            .map_err(DenialReason::Store)?;

        self.engine
            .reconcile(&mut tx, &identity, &remote_groups)
            .await
            .map_err(DenialReason::Sync)?;

        tx.commit().await.map_err(DenialReason::Store)?;

        Ok(identity)
    }
}

/// Overwrite identity attributes from the directory entry when present;
/// absent attributes leave the existing local values untouched.
fn apply_entry_attributes(identity: &mut LocalIdentity, entry: &DirectoryEntry) {
    if let Some(mail) = entry.get("mail") {
        identity.email = Some(mail.to_string());
    }
    if let Some(given_name) = entry.get("givenName") {
        identity.given_name = Some(given_name.to_string());
    }
    if let Some(family_name) = entry.get("sn") {
        identity.family_name = Some(family_name.to_string());
    }
}
