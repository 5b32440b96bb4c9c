//! Directory entry snapshot.
//!
//! A read-only view of one search result. Attribute names are
//! case-insensitive (RFC 4512), so `memberOf` and `memberof` address the
//! same values.

use std::collections::HashMap;

use ldap3::SearchEntry;

/// A read-only snapshot of a directory entry.
#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    dn: String,
    // Keys lowercased; original attribute spelling is not preserved.
    attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Create an empty entry with the given DN.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    /// Add an attribute with its values.
    #[must_use]
    pub fn with_attr<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attrs.insert(
            name.to_lowercase(),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Build an entry from an `ldap3` search result.
    #[must_use]
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        let mut attrs = HashMap::with_capacity(entry.attrs.len());
        for (name, values) in entry.attrs {
            attrs.insert(name.to_lowercase(), values);
        }
        Self {
            dn: entry.dn,
            attrs,
        }
    }

    /// The entry's distinguished name.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Whether the attribute is present with at least one value.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.attrs
            .get(&name.to_lowercase())
            .is_some_and(|values| !values.is_empty())
    }

    /// First value of the attribute, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of the attribute; empty slice when absent.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.attrs
            .get(&name.to_lowercase())
            .map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> DirectoryEntry {
        DirectoryEntry::new("CN=J Doe,OU=Users,DC=corp,DC=local")
            .with_attr("mail", ["jdoe@corp.local"])
            .with_attr("givenName", ["John"])
            .with_attr(
                "memberOf",
                [
                    "CN=Admins,OU=Groups,DC=corp,DC=local",
                    "CN=Sales,OU=Groups,DC=corp,DC=local",
                ],
            )
    }

    #[test]
    fn test_dn() {
        assert_eq!(sample_entry().dn(), "CN=J Doe,OU=Users,DC=corp,DC=local");
    }

    #[test]
    fn test_has_and_get() {
        let entry = sample_entry();
        assert!(entry.has("mail"));
        assert!(!entry.has("sn"));
        assert_eq!(entry.get("mail"), Some("jdoe@corp.local"));
        assert_eq!(entry.get("sn"), None);
    }

    #[test]
    fn test_attribute_names_are_case_insensitive() {
        let entry = sample_entry();
        assert!(entry.has("memberof"));
        assert!(entry.has("MEMBEROF"));
        assert_eq!(entry.get("GIVENNAME"), Some("John"));
    }

    #[test]
    fn test_get_all() {
        let entry = sample_entry();
        assert_eq!(entry.get_all("memberOf").len(), 2);
        assert!(entry.get_all("absent").is_empty());
    }

    #[test]
    fn test_empty_values_not_present() {
        let entry = DirectoryEntry::new("cn=x").with_attr("mail", Vec::<String>::new());
        assert!(!entry.has("mail"));
        assert_eq!(entry.get("mail"), None);
    }
}
