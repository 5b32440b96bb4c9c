//! Error types for directory operations.

use thiserror::Error;

/// Directory operation errors.
///
/// Everything here collapses to a generic "authentication denied" at the
/// facade boundary; the variants exist so each stage can be logged with
/// enough context for operator diagnosis.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A required setting is missing or malformed.
    #[error("invalid directory configuration: {message}")]
    Configuration { message: String },

    /// The service account needed for DN resolution is missing or was
    /// rejected by the server.
    #[error("service account error: {message}")]
    ServiceAccount { message: String },

    /// Could not reach the directory server.
    #[error("failed to connect to directory server at {url}")]
    Connect {
        url: String,
        #[source]
        source: ldap3::LdapError,
    },

    /// The connection dropped or an operation failed at the protocol level
    /// (includes timeouts).
    #[error("directory operation failed")]
    Protocol(#[from] ldap3::LdapError),

    /// The server answered a bind with a non-success result other than
    /// invalidCredentials.
    #[error("directory bind failed with code {code}: {text}")]
    Bind { code: u32, text: String },

    /// The supplied credentials were rejected (LDAP result 49).
    #[error("directory credentials rejected")]
    CredentialsRejected,

    /// DN resolution or the post-bind entry search matched nothing.
    #[error("no directory entry matched")]
    NotFound,
}

impl DirectoryError {
    /// Build a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        DirectoryError::Configuration {
            message: message.into(),
        }
    }

    /// Build a service account error.
    pub fn service_account(message: impl Into<String>) -> Self {
        DirectoryError::ServiceAccount {
            message: message.into(),
        }
    }

    /// Check if this error was caused by configuration rather than the
    /// directory server.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DirectoryError::Configuration { .. } | DirectoryError::ServiceAccount { .. }
        )
    }

    /// Check if this error means the user's credentials were rejected.
    #[must_use]
    pub fn is_credentials_rejected(&self) -> bool {
        matches!(self, DirectoryError::CredentialsRejected)
    }

    /// Check if this error means no entry matched.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound)
    }
}
