//! Directory protocol client.
//!
//! [`DirectoryConnector`] and [`DirectoryClient`] form the seam between the
//! authentication logic and the wire protocol; [`LdapDirectory`] is the
//! `ldap3`-backed implementation. Sessions are single-use: one per
//! authentication attempt, explicitly closed on every exit path.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DirectorySettings;
use crate::entry::DirectoryEntry;
use crate::error::DirectoryError;

/// A live, single-use directory session.
#[async_trait]
pub trait DirectoryClient: Send {
    /// Verify credentials against the server. `Ok(true)` on success,
    /// `Ok(false)` when the server rejected the credentials.
    async fn bind(&mut self, principal: &str, secret: &str) -> Result<bool, DirectoryError>;

    /// Subtree search beneath `base`.
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Release the session. Never fails; protocol errors are logged.
    async fn close(&mut self);
}

/// Opens directory sessions.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    type Client: DirectoryClient;

    /// Open a new session. One connection per call, no pooling.
    async fn connect(&self) -> Result<Self::Client, DirectoryError>;
}

/// `ldap3`-backed directory.
#[derive(Debug, Clone)]
pub struct LdapDirectory {
    settings: DirectorySettings,
}

impl LdapDirectory {
    /// Create a directory handle with validated settings.
    pub fn new(settings: DirectorySettings) -> Result<Self, DirectoryError> {
        settings.validate()?;
        Ok(Self { settings })
    }
}

#[async_trait]
impl DirectoryConnector for LdapDirectory {
    type Client = LdapSession;

    async fn connect(&self) -> Result<LdapSession, DirectoryError> {
        let url = self.settings.url();

        debug!(url = %url, "connecting to directory server");

        let conn_settings = LdapConnSettings::new().set_conn_timeout(self.settings.timeout());

        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, &url)
            .await
            .map_err(|e| DirectoryError::Connect {
                url: url.clone(),
                source: e,
            })?;

        // Drive the connection until the session is closed.
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "directory connection driver error");
            }
        });

        Ok(LdapSession {
            ldap,
            timeout: self.settings.timeout(),
        })
    }
}

/// LDAP result code for invalidCredentials (RFC 4511).
const RC_INVALID_CREDENTIALS: u32 = 49;

/// One live LDAP connection.
pub struct LdapSession {
    ldap: Ldap,
    timeout: Duration,
}

#[async_trait]
impl DirectoryClient for LdapSession {
    async fn bind(&mut self, principal: &str, secret: &str) -> Result<bool, DirectoryError> {
        debug!(principal = %principal, "performing directory bind");

        let result = self
            .ldap
            .with_timeout(self.timeout)
            .simple_bind(principal, secret)
            .await?;

        match result.rc {
            0 => Ok(true),
            RC_INVALID_CREDENTIALS => {
                debug!(principal = %principal, "directory rejected credentials");
                Ok(false)
            }
            code => Err(DirectoryError::Bind {
                code,
                text: result.text,
            }),
        }
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        debug!(base = %base, filter = %filter, "searching directory");

        let result = self
            .ldap
            .with_timeout(self.timeout)
            .search(base, Scope::Subtree, filter, attributes)
            .await?;

        let (entries, _res) = result.success()?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(DirectoryEntry::from_search_entry)
            .collect())
    }

    async fn close(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            warn!(error = %e, "error during directory unbind");
        }
    }
}
