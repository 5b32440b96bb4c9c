//! # castellan-store
//!
//! Local identity and authorization store.
//!
//! The authentication engine never talks SQL; it goes through the
//! [`AuthzStore`] / [`AuthzTx`] contract: begin a transaction, upsert the
//! identity, reconcile group memberships, commit. Either everything
//! commits or nothing does, so a partially-synced identity is never
//! visible to concurrent readers.
//!
//! Two backends ship with the crate:
//!
//! - [`PgAuthzStore`]: sqlx/Postgres, with unique constraints backing the
//!   get-or-create invariants under concurrent logins
//! - [`MemoryStore`]: mutex-guarded in-process state for tests and
//!   single-process deployments

pub mod contract;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;

// Re-exports
pub use contract::{AuthzStore, AuthzTx};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{LocalGroup, LocalIdentity, Permission};
pub use postgres::PgAuthzStore;
