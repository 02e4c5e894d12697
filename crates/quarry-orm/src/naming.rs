//! Persisted names derived from entity and property names.

use std::sync::LazyLock;

use regex::Regex;

static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("([a-z])([A-Z]+)").expect("constant pattern"));

/// Column name of a property: camelCase becomes snake_case.
///
/// ```
/// assert_eq!(quarry_orm::naming::column_name("lastLoginAt"), "last_login_at");
/// assert_eq!(quarry_orm::naming::column_name("abcTestLOL"), "abc_test_lol");
/// ```
#[must_use]
pub fn column_name(property: &str) -> String {
    WORD_BOUNDARY
        .replace_all(property, "${1}_${2}")
        .to_lowercase()
}

/// Column holding a one-to-many reference.
#[must_use]
pub fn reference_column(property: &str) -> String {
    format!("{}_id", column_name(property))
}

/// Prefix under which the columns of a joined reference are selected.
#[must_use]
pub fn reference_prefix(property: &str) -> String {
    format!("{}_", column_name(property))
}

/// Unmanaged many-to-many table, independent of which side declares it.
#[must_use]
pub fn junction_table(table: &str, other: &str) -> String {
    let (first, second) = sorted_pair(table, other);
    format!("NM_{first}_{second}")
}

/// Column of a junction table pointing at `table`.
#[must_use]
pub fn junction_column(table: &str) -> String {
    format!("{}_id", column_name(table))
}

/// The two names in lexical order.
#[must_use]
pub fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[must_use]
pub fn primary_key_name(table: &str) -> String {
    format!("pk_{table}")
}

#[must_use]
pub fn foreign_key_name(table: &str, target: &str, column: &str) -> String {
    format!("fk_{table}_{target}_{column}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_name() {
        assert_eq!(column_name("name"), "name");
        assert_eq!(column_name("fullName"), "full_name");
        assert_eq!(column_name("userID"), "user_id");
        assert_eq!(column_name("already_snake"), "already_snake");
    }

    #[test]
    fn test_junction_table_is_symmetric() {
        assert_eq!(junction_table("User", "Group"), "NM_Group_User");
        assert_eq!(junction_table("Group", "User"), "NM_Group_User");
        assert_eq!(junction_column("ApiKey"), "api_key_id");
    }

    #[test]
    fn test_reference_names() {
        assert_eq!(reference_column("ownerGroup"), "owner_group_id");
        assert_eq!(reference_prefix("ownerGroup"), "owner_group_");
        assert_eq!(foreign_key_name("User", "Group", "group_id"), "fk_User_Group_group_id");
    }
}
