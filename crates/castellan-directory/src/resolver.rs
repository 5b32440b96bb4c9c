//! Bind identity resolution.
//!
//! Turns a bare username into the principal used for the directory bind,
//! according to the configured authentication mode.

use tracing::{debug, instrument};

use crate::client::{DirectoryClient, DirectoryConnector};
use crate::config::{AuthMode, DirectorySettings};
use crate::error::DirectoryError;
use crate::filter;

/// How a bind identity was formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMethod {
    /// `DOMAIN\username` principal.
    DomainPrefixed,
    /// Simple bind with a DN or bare username.
    Simple,
}

/// The principal used for one bind attempt. Derived per call, never stored.
#[derive(Debug, Clone)]
pub struct BindIdentity {
    pub principal: String,
    pub method: BindMethod,
}

/// Resolves usernames to bind identities.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    settings: DirectorySettings,
}

impl IdentityResolver {
    pub fn new(settings: DirectorySettings) -> Self {
        Self { settings }
    }

    /// Resolve the bind identity for `username`.
    ///
    /// In simple mode with DN resolution enabled, this opens a scoped
    /// service-account session: connect, bind, search, and close on every
    /// path, whatever the outcome.
    #[instrument(skip(self, directory))]
    pub async fn resolve<D: DirectoryConnector>(
        &self,
        directory: &D,
        username: &str,
    ) -> Result<BindIdentity, DirectoryError> {
        match self.settings.auth_mode {
            AuthMode::DomainPrefixed => {
                let domain = self
                    .settings
                    .domain
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| {
                        DirectoryError::configuration(
                            "domain is required for domain-prefixed authentication",
                        )
                    })?;
                Ok(BindIdentity {
                    principal: format!("{domain}\\{username}"),
                    method: BindMethod::DomainPrefixed,
                })
            }
            AuthMode::Simple => {
                if let Some(template) = &self.settings.bind_template {
                    return Ok(BindIdentity {
                        principal: filter::render_bind_template(template, username),
                        method: BindMethod::Simple,
                    });
                }
                if self.settings.resolve_user_dn {
                    let dn = self.resolve_dn(directory, username).await?;
                    debug!(dn = %dn, "resolved user DN via service account");
                    return Ok(BindIdentity {
                        principal: dn,
                        method: BindMethod::Simple,
                    });
                }
                Ok(BindIdentity {
                    principal: username.to_string(),
                    method: BindMethod::Simple,
                })
            }
        }
    }

    /// Look up the user's DN with the configured service account.
    async fn resolve_dn<D: DirectoryConnector>(
        &self,
        directory: &D,
        username: &str,
    ) -> Result<String, DirectoryError> {
        let service_dn = self
            .settings
            .service_bind_dn
            .as_deref()
            .filter(|dn| !dn.is_empty())
            .ok_or_else(|| {
                DirectoryError::service_account(
                    "service_bind_dn and service_bind_password are required to resolve user DNs",
                )
            })?;
        let service_password = self.settings.service_bind_password.as_deref().ok_or_else(|| {
            DirectoryError::service_account(
                "service_bind_dn and service_bind_password are required to resolve user DNs",
            )
        })?;

        let mut session = directory.connect().await?;
        let outcome = self
            .lookup_dn(&mut session, service_dn, service_password, username)
            .await;
        // Scoped acquisition: the service session is released whatever the
        // lookup produced.
        session.close().await;
        outcome
    }

    async fn lookup_dn<C: DirectoryClient>(
        &self,
        session: &mut C,
        service_dn: &str,
        service_password: &str,
        username: &str,
    ) -> Result<String, DirectoryError> {
        if !session.bind(service_dn, service_password).await? {
            return Err(DirectoryError::service_account(
                "service account bind was rejected",
            ));
        }

        let search_filter = filter::render_user_filter(&self.settings.user_filter, username);
        let entries = session
            .search(&self.settings.search_base, &search_filter, &["distinguishedName"])
            .await?;

        entries
            .into_iter()
            .next()
            .map(|entry| entry.dn().to_string())
            .ok_or(DirectoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DirectoryEntry;
    use crate::testing::ScriptedDirectory;

    fn base_settings() -> DirectorySettings {
        DirectorySettings::new("ldap://dc01.corp.local", "dc=corp,dc=local")
    }

    #[tokio::test]
    async fn test_domain_prefixed_principal() {
        let resolver = IdentityResolver::new(base_settings().with_domain("CORP"));
        let directory = ScriptedDirectory::builder().build();

        let bind = resolver.resolve(&directory, "jdoe").await.unwrap();
        assert_eq!(bind.principal, "CORP\\jdoe");
        assert_eq!(bind.method, BindMethod::DomainPrefixed);
        // No directory round-trip for domain-prefixed resolution.
        assert_eq!(directory.connects(), 0);
    }

    #[tokio::test]
    async fn test_domain_prefixed_without_domain_fails() {
        let resolver = IdentityResolver::new(base_settings());
        let directory = ScriptedDirectory::builder().build();

        let err = resolver.resolve(&directory, "jdoe").await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(directory.connects(), 0);
    }

    #[tokio::test]
    async fn test_simple_bind_template() {
        let resolver = IdentityResolver::new(
            base_settings().with_bind_template("uid=%user%,ou=people,dc=corp,dc=local"),
        );
        let directory = ScriptedDirectory::builder().build();

        let bind = resolver.resolve(&directory, "jdoe").await.unwrap();
        assert_eq!(bind.principal, "uid=jdoe,ou=people,dc=corp,dc=local");
        assert_eq!(bind.method, BindMethod::Simple);
    }

    #[tokio::test]
    async fn test_simple_bare_username() {
        let resolver = IdentityResolver::new(base_settings().with_simple_bind());
        let directory = ScriptedDirectory::builder().build();

        let bind = resolver.resolve(&directory, "jdoe").await.unwrap();
        assert_eq!(bind.principal, "jdoe");
    }

    #[tokio::test]
    async fn test_dn_resolution_via_service_account() {
        let resolver = IdentityResolver::new(
            base_settings().with_service_account("cn=svc,dc=corp,dc=local", "svc-secret"),
        );
        let directory = ScriptedDirectory::builder()
            .accept("cn=svc,dc=corp,dc=local", "svc-secret")
            .respond(
                "(sAMAccountName=jdoe)",
                vec![DirectoryEntry::new("CN=J Doe,OU=Users,DC=corp,DC=local")],
            )
            .build();

        let bind = resolver.resolve(&directory, "jdoe").await.unwrap();
        assert_eq!(bind.principal, "CN=J Doe,OU=Users,DC=corp,DC=local");
        // Service session is opened once and closed again.
        assert_eq!(directory.connects(), 1);
        assert_eq!(directory.closes(), 1);
    }

    #[tokio::test]
    async fn test_dn_resolution_no_match_is_not_found() {
        let resolver = IdentityResolver::new(
            base_settings().with_service_account("cn=svc,dc=corp,dc=local", "svc-secret"),
        );
        let directory = ScriptedDirectory::builder()
            .accept("cn=svc,dc=corp,dc=local", "svc-secret")
            .build();

        let err = resolver.resolve(&directory, "ghost").await.unwrap_err();
        assert!(err.is_not_found());
        // The service session is still released.
        assert_eq!(directory.closes(), 1);
    }

    #[tokio::test]
    async fn test_dn_resolution_rejected_service_bind() {
        let resolver = IdentityResolver::new(
            base_settings().with_service_account("cn=svc,dc=corp,dc=local", "wrong"),
        );
        let directory = ScriptedDirectory::builder()
            .accept("cn=svc,dc=corp,dc=local", "svc-secret")
            .build();

        let err = resolver.resolve(&directory, "jdoe").await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(directory.closes(), 1);
    }

    #[tokio::test]
    async fn test_dn_resolution_missing_service_credentials() {
        let mut settings = base_settings().with_simple_bind();
        settings.resolve_user_dn = true;
        let resolver = IdentityResolver::new(settings);
        let directory = ScriptedDirectory::builder().build();

        let err = resolver.resolve(&directory, "jdoe").await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(directory.connects(), 0);
    }
}
