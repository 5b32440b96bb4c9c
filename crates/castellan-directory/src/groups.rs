//! Remote group extraction.
//!
//! Two interchangeable strategies: read the `memberOf` attribute on the
//! already-fetched user entry, or search for group entries that list the
//! user as a member. Both yield remote group common names in directory
//! order; duplicates are the consumer's problem.

use tracing::{debug, instrument};

use crate::client::DirectoryClient;
use crate::config::{DirectorySettings, GroupSource};
use crate::entry::DirectoryEntry;
use crate::error::DirectoryError;
use crate::filter;

/// Extracts remote group names for an authenticated user.
#[derive(Debug, Clone)]
pub struct GroupExtractor {
    settings: DirectorySettings,
}

impl GroupExtractor {
    pub fn new(settings: DirectorySettings) -> Self {
        Self { settings }
    }

    /// Extract remote group common names using the configured strategy.
    #[instrument(skip_all, fields(dn = %entry.dn()))]
    pub async fn extract<C: DirectoryClient>(
        &self,
        client: &mut C,
        entry: &DirectoryEntry,
    ) -> Result<Vec<String>, DirectoryError> {
        let groups = match self.settings.group_source {
            GroupSource::Embedded => Self::from_member_of(entry),
            GroupSource::Search => self.from_search(client, entry.dn()).await?,
        };
        debug!(count = groups.len(), "extracted remote groups");
        Ok(groups)
    }

    /// Read group CNs from the `memberOf` values of the entry.
    /// Malformed values without a `CN=` component are skipped.
    #[must_use]
    pub fn from_member_of(entry: &DirectoryEntry) -> Vec<String> {
        entry
            .get_all("memberOf")
            .iter()
            .filter_map(|dn| extract_cn(dn))
            .map(str::to_string)
            .collect()
    }

    /// Search for groups that list `user_dn` as a member.
    async fn from_search<C: DirectoryClient>(
        &self,
        client: &mut C,
        user_dn: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let search_filter = filter::render_group_filter(&self.settings.group_filter, user_dn);
        let entries = client
            .search(self.settings.group_base(), &search_filter, &["cn"])
            .await?;

        Ok(entries
            .iter()
            .filter_map(|entry| entry.get("cn"))
            .map(str::to_string)
            .collect())
    }
}

/// Extract the first `CN=` component of a DN.
///
/// Splits on commas and matches the component prefix case-insensitively,
/// the same naive parse the directory emits for `memberOf` values.
#[must_use]
pub fn extract_cn(dn: &str) -> Option<&str> {
    dn.split(',').find_map(|part| {
        let part = part.trim();
        match part.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("cn=") => Some(&part[3..]),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDirectory;
    use crate::DirectoryConnector;

    #[test]
    fn test_extract_cn() {
        assert_eq!(
            extract_cn("CN=Sales,OU=Groups,DC=corp,DC=local"),
            Some("Sales")
        );
        assert_eq!(
            extract_cn("cn=lowercase,ou=Groups,DC=corp,DC=local"),
            Some("lowercase")
        );
        // Leading non-CN components are skipped, first CN wins.
        assert_eq!(
            extract_cn("OU=Groups,CN=Admins,DC=corp,DC=local"),
            Some("Admins")
        );
    }

    #[test]
    fn test_extract_cn_malformed() {
        assert_eq!(extract_cn("OU=Groups,DC=corp,DC=local"), None);
        assert_eq!(extract_cn(""), None);
        assert_eq!(extract_cn("CN"), None);
    }

    #[test]
    fn test_from_member_of() {
        let entry = DirectoryEntry::new("CN=J Doe,OU=Users,DC=corp,DC=local").with_attr(
            "memberOf",
            [
                "CN=Admins,OU=Groups,DC=corp,DC=local",
                "OU=NoCommonName,DC=corp,DC=local",
                "CN=Sales,OU=Groups,DC=corp,DC=local",
            ],
        );

        // The malformed value is skipped without aborting the rest.
        assert_eq!(GroupExtractor::from_member_of(&entry), vec!["Admins", "Sales"]);
    }

    #[test]
    fn test_from_member_of_absent_attribute() {
        let entry = DirectoryEntry::new("CN=J Doe,OU=Users,DC=corp,DC=local");
        assert!(GroupExtractor::from_member_of(&entry).is_empty());
    }

    #[tokio::test]
    async fn test_embedded_strategy_makes_no_search() {
        let settings = DirectorySettings::new("ldap://dc01", "dc=corp,dc=local").with_domain("CORP");
        let extractor = GroupExtractor::new(settings);
        let directory = ScriptedDirectory::builder().build();
        let mut client = directory.connect().await.unwrap();

        let entry = DirectoryEntry::new("CN=J Doe,OU=Users,DC=corp,DC=local")
            .with_attr("memberOf", ["CN=Admins,OU=Groups,DC=corp,DC=local"]);
        let groups = extractor.extract(&mut client, &entry).await.unwrap();

        assert_eq!(groups, vec!["Admins"]);
        assert_eq!(directory.searches(), 0);
    }

    #[tokio::test]
    async fn test_search_strategy() {
        let settings = DirectorySettings::new("ldap://dc01", "dc=corp,dc=local")
            .with_domain("CORP")
            .with_group_search();
        let extractor = GroupExtractor::new(settings);
        let directory = ScriptedDirectory::builder()
            .respond(
                "(member=CN=J Doe,OU=Users,DC=corp,DC=local)",
                vec![
                    DirectoryEntry::new("CN=Admins,OU=Groups,DC=corp,DC=local")
                        .with_attr("cn", ["Admins"]),
                    DirectoryEntry::new("CN=Sales,OU=Groups,DC=corp,DC=local")
                        .with_attr("cn", ["Sales"]),
                ],
            )
            .build();
        let mut client = directory.connect().await.unwrap();

        let entry = DirectoryEntry::new("CN=J Doe,OU=Users,DC=corp,DC=local");
        let groups = extractor.extract(&mut client, &entry).await.unwrap();

        assert_eq!(groups, vec!["Admins", "Sales"]);
        assert_eq!(directory.searches(), 1);
    }

    #[tokio::test]
    async fn test_search_strategy_skips_entries_without_cn() {
        let settings = DirectorySettings::new("ldap://dc01", "dc=corp,dc=local")
            .with_domain("CORP")
            .with_group_search();
        let extractor = GroupExtractor::new(settings);
        let directory = ScriptedDirectory::builder()
            .respond(
                "(member=CN=J Doe,OU=Users,DC=corp,DC=local)",
                vec![
                    DirectoryEntry::new("CN=Admins,OU=Groups,DC=corp,DC=local")
                        .with_attr("cn", ["Admins"]),
                    DirectoryEntry::new("OU=Odd,DC=corp,DC=local"),
                ],
            )
            .build();
        let mut client = directory.connect().await.unwrap();

        let entry = DirectoryEntry::new("CN=J Doe,OU=Users,DC=corp,DC=local");
        let groups = extractor.extract(&mut client, &entry).await.unwrap();

        assert_eq!(groups, vec!["Admins"]);
    }
}
