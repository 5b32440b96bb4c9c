//! Directory configuration.
//!
//! One immutable settings struct carries every recognized option; it is
//! validated eagerly at construction so misconfiguration surfaces at
//! startup, not in the middle of a login attempt.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// How the bind identity is formed from a username.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Bind as `DOMAIN\username` (Active Directory style).
    #[default]
    DomainPrefixed,
    /// Simple bind: a DN template, a resolved DN, or the bare username.
    Simple,
}

/// Where remote group names come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupSource {
    /// Read the multi-valued `memberOf` attribute on the user entry.
    #[default]
    Embedded,
    /// Issue a separate search for groups that list the user as a member.
    Search,
}

/// Configuration for the directory connection and searches.
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Directory server URI (e.g. "ldaps://dc01.corp.local:636"). A bare
    /// host is accepted; the scheme is then derived from `use_ssl`.
    pub server_uri: String,

    /// Authentication mode.
    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Domain name for domain-prefixed binds (e.g. "CORP").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Use LDAPS when `server_uri` carries no scheme.
    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,

    /// Connect and receive timeout in seconds. Every bind and search is
    /// bounded by this; a blocked call times out rather than hanging.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Direct-bind DN template for simple mode, with `%user%` substitution
    /// (e.g. "uid=%user%,ou=people,dc=corp,dc=local").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_template: Option<String>,

    /// Resolve the user's DN with a service account before binding
    /// (simple mode only).
    #[serde(default)]
    pub resolve_user_dn: bool,

    /// Service account bind DN, required when `resolve_user_dn` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_bind_dn: Option<String>,

    /// Service account password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_bind_password: Option<String>,

    /// Base DN for user searches.
    pub search_base: String,

    /// User search filter template, `%user%` substitution.
    #[serde(default = "default_user_filter")]
    pub user_filter: String,

    /// Remote group source strategy.
    #[serde(default)]
    pub group_source: GroupSource,

    /// Base DN for group searches; falls back to `search_base`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_search_base: Option<String>,

    /// Group search filter template, `%dn%` substitution.
    #[serde(default = "default_group_filter")]
    pub group_filter: String,
}

fn default_use_ssl() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_user_filter() -> String {
    "(sAMAccountName=%user%)".to_string()
}

fn default_group_filter() -> String {
    "(member=%dn%)".to_string()
}

impl std::fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySettings")
            .field("server_uri", &self.server_uri)
            .field("auth_mode", &self.auth_mode)
            .field("domain", &self.domain)
            .field("use_ssl", &self.use_ssl)
            .field("timeout_secs", &self.timeout_secs)
            .field("bind_template", &self.bind_template)
            .field("resolve_user_dn", &self.resolve_user_dn)
            .field("service_bind_dn", &self.service_bind_dn)
            .field(
                "service_bind_password",
                &self.service_bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("search_base", &self.search_base)
            .field("user_filter", &self.user_filter)
            .field("group_source", &self.group_source)
            .field("group_search_base", &self.group_search_base)
            .field("group_filter", &self.group_filter)
            .finish()
    }
}

impl DirectorySettings {
    /// Create settings with the required fields and defaults for the rest.
    pub fn new(server_uri: impl Into<String>, search_base: impl Into<String>) -> Self {
        Self {
            server_uri: server_uri.into(),
            auth_mode: AuthMode::default(),
            domain: None,
            use_ssl: default_use_ssl(),
            timeout_secs: default_timeout_secs(),
            bind_template: None,
            resolve_user_dn: false,
            service_bind_dn: None,
            service_bind_password: None,
            search_base: search_base.into(),
            user_filter: default_user_filter(),
            group_source: GroupSource::default(),
            group_search_base: None,
            group_filter: default_group_filter(),
        }
    }

    /// Set the domain for domain-prefixed binds.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Switch to simple-bind mode.
    #[must_use]
    pub fn with_simple_bind(mut self) -> Self {
        self.auth_mode = AuthMode::Simple;
        self
    }

    /// Set the direct-bind DN template (implies simple mode).
    #[must_use]
    pub fn with_bind_template(mut self, template: impl Into<String>) -> Self {
        self.auth_mode = AuthMode::Simple;
        self.bind_template = Some(template.into());
        self
    }

    /// Enable service-account DN resolution (implies simple mode).
    #[must_use]
    pub fn with_service_account(
        mut self,
        bind_dn: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth_mode = AuthMode::Simple;
        self.resolve_user_dn = true;
        self.service_bind_dn = Some(bind_dn.into());
        self.service_bind_password = Some(password.into());
        self
    }

    /// Set the user search filter template.
    #[must_use]
    pub fn with_user_filter(mut self, filter: impl Into<String>) -> Self {
        self.user_filter = filter.into();
        self
    }

    /// Use the group-search strategy instead of `memberOf`.
    #[must_use]
    pub fn with_group_search(mut self) -> Self {
        self.group_source = GroupSource::Search;
        self
    }

    /// The URL passed to the protocol client. A scheme in `server_uri`
    /// wins; otherwise one is derived from `use_ssl`.
    #[must_use]
    pub fn url(&self) -> String {
        if self.server_uri.contains("://") {
            self.server_uri.clone()
        } else if self.use_ssl {
            format!("ldaps://{}", self.server_uri)
        } else {
            format!("ldap://{}", self.server_uri)
        }
    }

    /// Operation timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base DN for group searches.
    #[must_use]
    pub fn group_base(&self) -> &str {
        self.group_search_base.as_deref().unwrap_or(&self.search_base)
    }

    /// Validate the settings. Called eagerly by every component that is
    /// constructed from them.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.server_uri.is_empty() {
            return Err(DirectoryError::configuration("server_uri is required"));
        }
        if self.search_base.is_empty() {
            return Err(DirectoryError::configuration("search_base is required"));
        }
        if self.timeout_secs == 0 {
            return Err(DirectoryError::configuration(
                "timeout_secs must be greater than zero",
            ));
        }
        if self.auth_mode == AuthMode::DomainPrefixed
            && self.domain.as_deref().unwrap_or("").is_empty()
        {
            return Err(DirectoryError::configuration(
                "domain is required for domain-prefixed authentication",
            ));
        }
        if !self.user_filter.contains("%user%") {
            return Err(DirectoryError::configuration(
                "user_filter must contain the %user% placeholder",
            ));
        }
        if let Some(template) = &self.bind_template {
            if !template.contains("%user%") {
                return Err(DirectoryError::configuration(
                    "bind_template must contain the %user% placeholder",
                ));
            }
        }
        if self.resolve_user_dn
            && (self.service_bind_dn.as_deref().unwrap_or("").is_empty()
                || self.service_bind_password.is_none())
        {
            return Err(DirectoryError::configuration(
                "service_bind_dn and service_bind_password are required to resolve user DNs",
            ));
        }
        if self.group_source == GroupSource::Search && !self.group_filter.contains("%dn%") {
            return Err(DirectoryError::configuration(
                "group_filter must contain the %dn% placeholder",
            ));
        }
        Ok(())
    }

    /// A copy safe to print or serialize into diagnostics.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut settings = self.clone();
        if settings.service_bind_password.is_some() {
            settings.service_bind_password = Some("***REDACTED***".to_string());
        }
        settings
    }
}
