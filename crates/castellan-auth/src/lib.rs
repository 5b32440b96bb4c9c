//! # castellan-auth
//!
//! The authentication facade and the group reconciliation engine.
//!
//! [`Authenticator`] is the single entry point: one call per login
//! attempt, combining bind identity resolution, credential verification,
//! group extraction, and local-store reconciliation into one atomic
//! operation. The caller gets the resolved local identity or `None`;
//! every failure mode collapses into the same denial so nothing about
//! configuration or user existence leaks through the return value.
//!
//! ## Example
//!
//! ```ignore
//! use castellan_auth::{Authenticator, SyncPolicy};
//! use castellan_directory::{DirectorySettings, LdapDirectory};
//! use castellan_store::PgAuthzStore;
//!
//! let settings = DirectorySettings::new("ldaps://dc01.corp.local", "dc=corp,dc=local")
//!     .with_domain("CORP");
//! let directory = LdapDirectory::new(settings.clone())?;
//! let store = PgAuthzStore::connect("postgres://...").await?;
//!
//! let authenticator = Authenticator::new(directory, store, settings, SyncPolicy::default())?;
//! let identity = authenticator.authenticate("jdoe", "secret").await;
//! ```

pub mod authenticator;
pub mod error;
pub mod policy;
pub mod sync;

// Re-exports
pub use authenticator::Authenticator;
pub use error::SyncError;
pub use policy::{GroupMappingRule, PermissionRef, PolicyError, SyncPolicy};
pub use sync::{GroupSyncEngine, SyncReport};
