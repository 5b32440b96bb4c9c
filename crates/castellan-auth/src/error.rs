//! Error types for authentication and reconciliation.

use castellan_directory::DirectoryError;
use castellan_store::StoreError;
use thiserror::Error;
use tracing::{info, warn};

/// Group reconciliation failure.
///
/// Permission lookup misses are NOT errors; they are logged and skipped
/// inside the engine. This type covers store faults that abort the
/// reconciliation and with it the surrounding transaction.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store failed mid-reconciliation.
    #[error("group reconciliation failed: {0}")]
    Store(#[from] StoreError),
}

/// Why an authentication attempt was denied.
///
/// Internal diagnostics only: the public contract stays
/// `Option<LocalIdentity>`, so callers cannot distinguish a bad password
/// from a missing domain setting or an unreachable server.
#[derive(Debug)]
pub(crate) enum DenialReason {
    /// Empty username or secret; rejected before any directory I/O.
    EmptyCredentials,
    /// Resolution, bind, or entry search failed.
    Directory(DirectoryError),
    /// The store failed outside reconciliation.
    Store(StoreError),
    /// Reconciliation failed and rolled the transaction back.
    Sync(SyncError),
}

impl DenialReason {
    /// Log the denial with the stage that produced it.
    pub(crate) fn log(&self, username: &str) {
        match self {
            DenialReason::EmptyCredentials => {
                info!(username, "authentication denied: empty credentials");
            }
            DenialReason::Directory(err) if err.is_credentials_rejected() => {
                info!(username, "authentication denied: credentials rejected");
            }
            DenialReason::Directory(err) if err.is_not_found() => {
                info!(username, "authentication denied: no directory entry matched");
            }
            DenialReason::Directory(err) => {
                warn!(username, error = %err, "authentication denied at directory stage");
            }
            DenialReason::Store(err) => {
                warn!(username, error = %err, "authentication denied at store stage");
            }
            DenialReason::Sync(err) => {
                warn!(username, error = %err, "authentication denied: group sync rolled back");
            }
        }
    }
}
