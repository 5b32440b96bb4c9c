//! Filter and DN template rendering.
//!
//! Values substituted into search filters are escaped per RFC 4515 and
//! values substituted into DNs per RFC 4514, so a username like
//! `admin)(objectClass=*` cannot widen a filter.

/// Placeholder for the username in user filters and bind templates.
pub const USER_PLACEHOLDER: &str = "%user%";

/// Placeholder for the user's DN in group filters.
pub const DN_PLACEHOLDER: &str = "%dn%";

/// Escape special characters in LDAP filter values (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// Escape special characters in DN attribute values (RFC 4514).
///
/// Always escaped: `, + " \ < > ; =` and NUL. A space is escaped only at
/// the start or end of the value, `#` only at the start.
#[must_use]
pub fn escape_dn_value(value: &str) -> String {
    let char_count = value.chars().count();
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == char_count;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

/// Render a user search filter, substituting the escaped username.
#[must_use]
pub fn render_user_filter(template: &str, username: &str) -> String {
    template.replace(USER_PLACEHOLDER, &escape_filter_value(username))
}

/// Render a group search filter, substituting the escaped user DN.
#[must_use]
pub fn render_group_filter(template: &str, user_dn: &str) -> String {
    template.replace(DN_PLACEHOLDER, &escape_filter_value(user_dn))
}

/// Render a direct-bind DN template, substituting the DN-escaped username.
#[must_use]
pub fn render_bind_template(template: &str, username: &str) -> String {
    template.replace(USER_PLACEHOLDER, &escape_dn_value(username))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("jdoe"), "jdoe");
        assert_eq!(escape_filter_value("j*doe"), "j\\2adoe");
        assert_eq!(escape_filter_value("(admin)"), "\\28admin\\29");
        assert_eq!(escape_filter_value("a\\b"), "a\\5cb");
    }

    #[test]
    fn test_escape_filter_blocks_injection() {
        let rendered = render_user_filter("(sAMAccountName=%user%)", "*)(objectClass=*");
        assert_eq!(rendered, "(sAMAccountName=\\2a\\29\\28objectClass=\\2a)");
    }

    #[test]
    fn test_escape_dn_value_simple() {
        assert_eq!(escape_dn_value("John Doe"), "John Doe");
        assert_eq!(escape_dn_value("jdoe"), "jdoe");
    }

    #[test]
    fn test_escape_dn_value_special_chars() {
        assert_eq!(escape_dn_value("a,b"), "a\\,b");
        assert_eq!(escape_dn_value("a=b"), "a\\=b");
        assert_eq!(escape_dn_value("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_escape_dn_value_boundary_chars() {
        assert_eq!(escape_dn_value(" jdoe"), "\\20jdoe");
        assert_eq!(escape_dn_value("jdoe "), "jdoe\\20");
        assert_eq!(escape_dn_value("#jdoe"), "\\23jdoe");
        assert_eq!(escape_dn_value("jd#oe"), "jd#oe");
    }

    #[test]
    fn test_escape_dn_value_injection_attempt() {
        assert_eq!(
            escape_dn_value("jdoe,dc=evil,dc=com"),
            "jdoe\\,dc\\=evil\\,dc\\=com"
        );
    }

    #[test]
    fn test_escape_dn_value_multibyte() {
        // Trailing-space detection must count characters, not bytes.
        assert_eq!(escape_dn_value("ané"), "ané");
        assert_eq!(escape_dn_value("ané "), "ané\\20");
    }

    #[test]
    fn test_render_user_filter() {
        assert_eq!(
            render_user_filter("(sAMAccountName=%user%)", "jdoe"),
            "(sAMAccountName=jdoe)"
        );
        assert_eq!(
            render_user_filter("(&(objectClass=user)(uid=%user%))", "jdoe"),
            "(&(objectClass=user)(uid=jdoe))"
        );
    }

    #[test]
    fn test_render_group_filter() {
        assert_eq!(
            render_group_filter("(member=%dn%)", "CN=J Doe,OU=Users,DC=corp,DC=local"),
            "(member=CN=J Doe,OU=Users,DC=corp,DC=local)"
        );
    }

    #[test]
    fn test_render_bind_template() {
        assert_eq!(
            render_bind_template("uid=%user%,ou=people,dc=corp,dc=local", "jdoe"),
            "uid=jdoe,ou=people,dc=corp,dc=local"
        );
        assert_eq!(
            render_bind_template("uid=%user%,ou=people,dc=corp,dc=local", "j,doe"),
            "uid=j\\,doe,ou=people,dc=corp,dc=local"
        );
    }
}
