//! Credential verification.
//!
//! One connection per attempt: bind with the resolved identity, then fetch
//! the user's entry with a subtree search. The session is kept open on
//! success so the group extractor can reuse it, and closed on every
//! failure path before returning.

use tracing::{info, instrument, warn};

use crate::client::{DirectoryClient, DirectoryConnector};
use crate::config::DirectorySettings;
use crate::entry::DirectoryEntry;
use crate::error::DirectoryError;
use crate::filter;
use crate::resolver::BindIdentity;

/// A verified user: the directory entry plus the still-bound session.
#[derive(Debug)]
pub struct Verified<C> {
    pub entry: DirectoryEntry,
    pub client: C,
}

/// Verifies credentials against the directory.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    settings: DirectorySettings,
}

impl CredentialVerifier {
    pub fn new(settings: DirectorySettings) -> Self {
        Self { settings }
    }

    /// Bind with the supplied secret and fetch the user's entry.
    ///
    /// Bad credentials, an unreachable server, a timeout, and an empty
    /// post-bind search all come back as errors the facade collapses into
    /// one generic denial; none of them are fatal to the caller.
    #[instrument(skip_all, fields(username = %username, principal = %bind.principal))]
    pub async fn verify<D: DirectoryConnector>(
        &self,
        directory: &D,
        bind: &BindIdentity,
        username: &str,
        secret: &str,
    ) -> Result<Verified<D::Client>, DirectoryError> {
        let mut client = directory.connect().await?;

        match self.bind_and_fetch(&mut client, bind, username, secret).await {
            Ok(entry) => Ok(Verified { entry, client }),
            Err(err) => {
                client.close().await;
                Err(err)
            }
        }
    }

    async fn bind_and_fetch<C: DirectoryClient>(
        &self,
        client: &mut C,
        bind: &BindIdentity,
        username: &str,
        secret: &str,
    ) -> Result<DirectoryEntry, DirectoryError> {
        if !client.bind(&bind.principal, secret).await? {
            info!(username, "directory bind rejected");
            return Err(DirectoryError::CredentialsRejected);
        }

        let search_filter = filter::render_user_filter(&self.settings.user_filter, username);
        let entries = client
            .search(&self.settings.search_base, &search_filter, &["*"])
            .await?;

        if entries.len() > 1 {
            // Ambiguous match: take the first entry, but leave a trace for
            // the operator.
            warn!(
                username,
                matches = entries.len(),
                "user search returned multiple entries, using the first"
            );
        }

        entries.into_iter().next().ok_or_else(|| {
            info!(username, "user not found in directory after successful bind");
            DirectoryError::NotFound
        })
    }
}
