//! Group membership reconciliation.
//!
//! Reconciles the remote group set extracted from the directory against
//! the local store inside the caller's transaction: mapped groups are
//! assigned (with their configured permissions), unmapped groups are
//! auto-created or ignored, and optionally every membership absent from
//! the reconciled set is removed.

use std::collections::HashSet;

use castellan_store::{AuthzTx, LocalIdentity};
use tracing::{debug, info, instrument, warn};

use crate::error::SyncError;
use crate::policy::SyncPolicy;

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Local group names assigned this pass, in assignment order.
    pub assigned: Vec<String>,
    /// Local group names the identity was removed from.
    pub removed: Vec<String>,
    /// Configured permission references that did not resolve to a record.
    pub permissions_skipped: usize,
}

/// Reconciles remote groups against the local store.
#[derive(Debug, Clone)]
pub struct GroupSyncEngine {
    policy: SyncPolicy,
}

impl GroupSyncEngine {
    pub fn new(policy: SyncPolicy) -> Self {
        Self { policy }
    }

    /// Reconcile `remote_groups` for `identity` inside `tx`.
    ///
    /// Assignment follows remote extraction order; mapping lookups are
    /// exact-string, case-sensitive. A permission that does not resolve is
    /// logged and skipped; a store fault aborts the pass and the caller's
    /// transaction with it.
    #[instrument(skip_all, fields(username = %identity.username, remote = remote_groups.len()))]
    pub async fn reconcile<T: AuthzTx>(
        &self,
        tx: &mut T,
        identity: &LocalIdentity,
        remote_groups: &[String],
    ) -> Result<SyncReport, SyncError> {
        let mut assigned: HashSet<String> = HashSet::new();
        let mut report = SyncReport::default();

        for remote_group in remote_groups {
            if let Some(rule) = self.policy.mappings.get(remote_group) {
                let (group, created) = tx.get_or_create_group(&rule.local_group).await?;
                if created {
                    debug!(group = %group.name, "created mapped local group");
                }

                for reference in &rule.permissions {
                    match tx.find_permission(&reference.scope, &reference.codename).await? {
                        Some(permission) => tx.grant_permission(&group, &permission).await?,
                        None => {
                            // One bad permission reference must not abort
                            // the whole sync.
                            warn!(
                                permission = %reference,
                                group = %group.name,
                                "permission not found, skipping"
                            );
                            report.permissions_skipped += 1;
                        }
                    }
                }

                tx.add_membership(identity, &group).await?;
                if assigned.insert(group.name.clone()) {
                    report.assigned.push(group.name);
                }
            } else if self.policy.auto_create_unmapped {
                let (group, created) = tx.get_or_create_group(remote_group).await?;
                if created {
                    debug!(group = %group.name, "auto-created local group for remote group");
                }
                tx.add_membership(identity, &group).await?;
                if assigned.insert(group.name.clone()) {
                    report.assigned.push(group.name);
                }
            } else {
                debug!(remote_group = %remote_group, "remote group has no mapping, ignored");
            }
        }

        if self.policy.prune_memberships {
            let current = tx.membership_names(identity).await?;
            let mut stale: Vec<String> = current
                .into_iter()
                .filter(|name| !assigned.contains(name) && !self.policy.exempt_groups.contains(name))
                .collect();
            // Deterministic removal order for logs and tests.
            stale.sort();

            for name in stale {
                if let Some(group) = tx.find_group(&name).await? {
                    tx.remove_membership(identity, &group).await?;
                    report.removed.push(name);
                }
            }
        }

        info!(
            assigned = report.assigned.len(),
            removed = report.removed.len(),
            permissions_skipped = report.permissions_skipped,
            "group reconciliation complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::GroupMappingRule;
    use castellan_store::{AuthzStore, MemoryStore};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    async fn seeded_identity(store: &MemoryStore, username: &str) -> LocalIdentity {
        let mut tx = store.begin().await.unwrap();
        let (identity, _) = tx.get_or_create_identity(username).await.unwrap();
        tx.commit().await.unwrap();
        identity
    }

    #[tokio::test]
    async fn test_mapped_group_assignment_with_permissions() {
        let store = MemoryStore::new();
        store.insert_permission("app", "manage").unwrap();
        let identity = seeded_identity(&store, "jdoe").await;

        let engine = GroupSyncEngine::new(SyncPolicy::default().with_mapping(
            "Admins",
            GroupMappingRule::new("Administrators")
                .with_permission("app.manage")
                .unwrap(),
        ));

        let mut tx = store.begin().await.unwrap();
        let report = engine
            .reconcile(&mut tx, &identity, &strings(&["Admins", "Sales"]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(report.assigned, vec!["Administrators"]);
        assert_eq!(report.permissions_skipped, 0);

        let mut tx = store.begin().await.unwrap();
        let names = tx.membership_names(&identity).await.unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains("Administrators"));
        // "Sales" is unmapped and auto-create is off: no local group.
        assert!(tx.find_group("Sales").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_permission_is_skipped_not_fatal() {
        let store = MemoryStore::new();
        let identity = seeded_identity(&store, "jdoe").await;

        let engine = GroupSyncEngine::new(SyncPolicy::default().with_mapping(
            "Admins",
            GroupMappingRule::new("Administrators")
                .with_permission("app.not-provisioned")
                .unwrap(),
        ));

        let mut tx = store.begin().await.unwrap();
        let report = engine
            .reconcile(&mut tx, &identity, &strings(&["Admins"]))
            .await
            .unwrap();

        assert_eq!(report.assigned, vec!["Administrators"]);
        assert_eq!(report.permissions_skipped, 1);
    }

    #[tokio::test]
    async fn test_auto_create_unmapped() {
        let store = MemoryStore::new();
        let identity = seeded_identity(&store, "jdoe").await;

        let engine = GroupSyncEngine::new(SyncPolicy::default().with_auto_create());

        let mut tx = store.begin().await.unwrap();
        let report = engine
            .reconcile(&mut tx, &identity, &strings(&["Sales"]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(report.assigned, vec!["Sales"]);
        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_group("Sales").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pruning_removes_stale_memberships() {
        let store = MemoryStore::new();
        let identity = seeded_identity(&store, "jdoe").await;

        // Identity starts as a member of Old and Administrators.
        let mut tx = store.begin().await.unwrap();
        for name in ["Old", "Administrators"] {
            let (group, _) = tx.get_or_create_group(name).await.unwrap();
            tx.add_membership(&identity, &group).await.unwrap();
        }
        tx.commit().await.unwrap();

        let engine = GroupSyncEngine::new(
            SyncPolicy::default()
                .with_mapping("Admins", GroupMappingRule::new("Administrators"))
                .with_pruning(),
        );

        let mut tx = store.begin().await.unwrap();
        let report = engine
            .reconcile(&mut tx, &identity, &strings(&["Admins"]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(report.removed, vec!["Old"]);
        let mut tx = store.begin().await.unwrap();
        let names = tx.membership_names(&identity).await.unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains("Administrators"));
        // Pruning removes the edge, never the group.
        assert!(tx.find_group("Old").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_exempt_groups_survive_pruning() {
        let store = MemoryStore::new();
        let identity = seeded_identity(&store, "jdoe").await;

        let mut tx = store.begin().await.unwrap();
        for name in ["Old", "Administrators"] {
            let (group, _) = tx.get_or_create_group(name).await.unwrap();
            tx.add_membership(&identity, &group).await.unwrap();
        }
        tx.commit().await.unwrap();

        let engine = GroupSyncEngine::new(
            SyncPolicy::default()
                .with_mapping("Admins", GroupMappingRule::new("Administrators"))
                .with_pruning()
                .with_exempt_group("Old"),
        );

        let mut tx = store.begin().await.unwrap();
        engine
            .reconcile(&mut tx, &identity, &strings(&["Admins"]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let names = tx.membership_names(&identity).await.unwrap();
        assert!(names.contains("Old"));
        assert!(names.contains("Administrators"));
        assert_eq!(names.len(), 2);
    }

    #[tokio::test]
    async fn test_no_pruning_keeps_superset() {
        let store = MemoryStore::new();
        let identity = seeded_identity(&store, "jdoe").await;

        let mut tx = store.begin().await.unwrap();
        let (group, _) = tx.get_or_create_group("Old").await.unwrap();
        tx.add_membership(&identity, &group).await.unwrap();
        tx.commit().await.unwrap();

        let engine = GroupSyncEngine::new(
            SyncPolicy::default().with_mapping("Admins", GroupMappingRule::new("Administrators")),
        );

        let mut tx = store.begin().await.unwrap();
        engine
            .reconcile(&mut tx, &identity, &strings(&["Admins"]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let names = tx.membership_names(&identity).await.unwrap();
        assert!(names.contains("Old"));
        assert!(names.contains("Administrators"));
    }

    #[tokio::test]
    async fn test_duplicate_remote_groups_assign_once() {
        let store = MemoryStore::new();
        let identity = seeded_identity(&store, "jdoe").await;

        let engine = GroupSyncEngine::new(
            SyncPolicy::default().with_mapping("Admins", GroupMappingRule::new("Administrators")),
        );

        let mut tx = store.begin().await.unwrap();
        let report = engine
            .reconcile(&mut tx, &identity, &strings(&["Admins", "Admins"]))
            .await
            .unwrap();

        assert_eq!(report.assigned, vec!["Administrators"]);
    }

    #[tokio::test]
    async fn test_mapping_is_case_sensitive() {
        let store = MemoryStore::new();
        let identity = seeded_identity(&store, "jdoe").await;

        let engine = GroupSyncEngine::new(
            SyncPolicy::default().with_mapping("Admins", GroupMappingRule::new("Administrators")),
        );

        let mut tx = store.begin().await.unwrap();
        let report = engine
            .reconcile(&mut tx, &identity, &strings(&["admins"]))
            .await
            .unwrap();

        assert!(report.assigned.is_empty());
    }
}
