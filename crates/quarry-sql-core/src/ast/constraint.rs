//! Table constraints and conflict strategies.

use super::expression::Expression;

/// Action taken on referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnDelete {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    #[default]
    NoAction,
}

impl OnDelete {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
    },
    Unique {
        name: Option<String>,
        columns: Vec<String>,
    },
    ForeignKey {
        name: Option<String>,
        column: String,
        references_table: String,
        references_column: String,
        on_delete: OnDelete,
    },
}

impl Constraint {
    #[must_use]
    pub fn primary_key<I, S>(name: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PrimaryKey {
            name: Some(String::from(name)),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Unique {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn foreign_key(
        column: &str,
        references_table: &str,
        references_column: &str,
        on_delete: OnDelete,
    ) -> Self {
        Self::ForeignKey {
            name: None,
            column: String::from(column),
            references_table: String::from(references_table),
            references_column: String::from(references_column),
            on_delete,
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, new_name: &str) -> Self {
        match &mut self {
            Self::PrimaryKey { name, .. }
            | Self::Unique { name, .. }
            | Self::ForeignKey { name, .. } => *name = Some(String::from(new_name)),
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::PrimaryKey { name, .. }
            | Self::Unique { name, .. }
            | Self::ForeignKey { name, .. } => name.as_deref(),
        }
    }
}

/// What an INSERT does when it hits a unique conflict.
///
/// A value that is a plain column reference takes the value the conflicting
/// row tried to insert into that column (`VALUES(col)` / `EXCLUDED.col`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateStrategy {
    pub conflicting_columns: Vec<String>,
    pub values: Vec<(String, Expression)>,
}

impl UpdateStrategy {
    #[must_use]
    pub fn on<I, S>(conflicting_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            conflicting_columns: conflicting_columns.into_iter().map(Into::into).collect(),
            values: Vec::new(),
        }
    }

    /// Sets `column` to an arbitrary expression on conflict.
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<Expression>) -> Self {
        self.values.push((String::from(column), value.into()));
        self
    }

    /// Sets `column` to the value of the rejected row.
    #[must_use]
    pub fn set_from_insert(mut self, column: &str) -> Self {
        self.values
            .push((String::from(column), Expression::Column(String::from(column))));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_delete_sql() {
        assert_eq!(OnDelete::SetNull.as_sql(), "SET NULL");
        assert_eq!(OnDelete::default().as_sql(), "NO ACTION");
    }

    #[test]
    fn test_constraint_named() {
        let fk = Constraint::foreign_key("group_id", "Group", "id", OnDelete::Cascade)
            .named("fk_User_Group_group_id");
        assert_eq!(fk.name(), Some("fk_User_Group_group_id"));
        assert_eq!(Constraint::unique(["a", "b"]).name(), None);
    }
}
