//! Store entity models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A local identity, owned by the store.
///
/// Created on first successful authentication for a username, updated on
/// every subsequent one. The local credential is never populated from
/// directory data; `credential_usable` stays `false` because the directory
/// remains the source of truth for verification.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LocalIdentity {
    /// Unique identifier.
    pub id: Uuid,

    /// Unique, stable username.
    pub username: String,

    /// Email address from the directory `mail` attribute.
    pub email: Option<String>,

    /// Given name from the directory `givenName` attribute.
    pub given_name: Option<String>,

    /// Family name from the directory `sn` attribute.
    pub family_name: Option<String>,

    /// Whether the account is active.
    pub is_active: bool,

    /// Whether the locally stored credential may be used for verification.
    pub credential_usable: bool,

    /// When the identity was created.
    pub created_at: DateTime<Utc>,

    /// When the identity was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A local authorization group. Names are unique; membership and
/// permissions are edges in the store.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LocalGroup {
    /// Unique identifier.
    pub id: Uuid,

    /// Unique group name.
    pub name: String,

    /// When the group was created.
    pub created_at: DateTime<Utc>,
}

/// A permission record, addressed by `(scope, codename)`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Permission {
    /// Unique identifier.
    pub id: Uuid,

    /// Application scope (e.g. "app").
    pub scope: String,

    /// Permission codename within the scope (e.g. "manage").
    pub codename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_fields() {
        let identity = LocalIdentity {
            id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            email: Some("jdoe@corp.local".to_string()),
            given_name: Some("John".to_string()),
            family_name: Some("Doe".to_string()),
            is_active: true,
            credential_usable: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(identity.username, "jdoe");
        assert!(!identity.credential_usable);
    }

    #[test]
    fn test_permission_pair() {
        let permission = Permission {
            id: Uuid::new_v4(),
            scope: "app".to_string(),
            codename: "manage".to_string(),
        };

        assert_eq!(permission.scope, "app");
        assert_eq!(permission.codename, "manage");
    }
}
