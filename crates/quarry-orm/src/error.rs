//! Error types for the ORM.

use quarry_sql_core::BuildError;
use thiserror::Error;

/// An entity descriptor that cannot be turned into table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The field declares no column type.
    #[error("entity '{entity}': field '{field}' has no type")]
    MissingType { entity: String, field: String },

    /// An attribute that does not apply to the field's type.
    #[error("entity '{entity}': '{attribute}' is not valid on field '{field}': {reason}")]
    InvalidAttribute {
        entity: String,
        field: String,
        attribute: &'static str,
        reason: String,
    },

    /// Two declarations of the same field disagree.
    #[error("entity '{entity}': field '{field}' declares conflicting {what}")]
    Conflicting {
        entity: String,
        field: String,
        what: String,
    },

    /// A field declared twice in one descriptor.
    #[error("entity '{entity}' declares field '{field}' twice")]
    DuplicateField { entity: String, field: String },

    /// `id` is the generated primary key.
    #[error("entity '{entity}': the field name 'id' is reserved")]
    ReservedField { entity: String },

    /// A constraint or relation names a field that does not exist.
    #[error("entity '{entity}' has no field '{field}'")]
    UnknownField { entity: String, field: String },

    /// At most one extending enum per entity.
    #[error("entity '{entity}' declares more than one extending enum")]
    MultipleExtending { entity: String },

    /// An unmanaged many-to-many relation pointing at its own entity.
    #[error("entity '{entity}': relation '{field}' cannot join the entity to itself")]
    SelfJunction { entity: String, field: String },

    /// Two unmanaged relations would share one junction table.
    #[error("entity '{entity}' declares several unmanaged relations to '{target}'")]
    AmbiguousJunction { entity: String, target: String },

    /// "Use properties of" loops back on itself.
    #[error("property inheritance cycle through '{entity}'")]
    InheritanceCycle { entity: String },

    /// Entities referencing each other in a loop cannot be created in order.
    #[error("reference cycle between entities: {}", .entities.join(", "))]
    DependencyCycle { entities: Vec<String> },
}

/// A row or record that cannot be turned into an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HydrationError {
    /// The row lacks a selected column.
    #[error("entity '{entity}': column '{column}' missing from row")]
    MissingColumn { entity: String, column: String },

    /// The record lacks a value for a field.
    #[error("entity '{entity}': field '{field}' has no value")]
    MissingField { entity: String, field: String },

    /// The value has the wrong type.
    #[error("entity '{entity}': column '{column}' expected {expected}, found {found}")]
    TypeMismatch {
        entity: String,
        column: String,
        expected: &'static str,
        found: String,
    },

    /// The value has the right type but cannot be parsed.
    #[error("entity '{entity}': column '{column}' holds an unparsable value: {message}")]
    Unparsable {
        entity: String,
        column: String,
        message: String,
    },
}

/// A statement the backend rejected.
///
/// Carries the statement shape (`INSERT INTO "User"`), never the bound
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{shape}: {message}")]
pub struct ExecutionError {
    pub shape: String,
    pub message: String,
}

impl ExecutionError {
    #[must_use]
    pub fn new(shape: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            message: message.into(),
        }
    }
}

/// Invalid pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("invalid page {0}: pages start at 1")]
    InvalidPage(i64),

    #[error("invalid page size {size}: must be between 1 and {max}")]
    InvalidPageSize { size: i64, max: u64 },

    #[error("cannot order by '{0}'")]
    UnknownOrderColumn(String),

    #[error("invalid sort order '{0}': expected asc or desc")]
    InvalidSortOrder(String),
}

/// ORM errors.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Statement could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Entity metadata could not be derived.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A row or record could not be hydrated.
    #[error(transparent)]
    Hydration(#[from] HydrationError),

    /// The backend rejected a statement.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Invalid pagination request.
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// No row with this id.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: String, id: i64 },

    /// A NOT NULL field without default was never set before insert.
    #[error("cannot insert {entity}: field '{field}' is not initialized")]
    Uninitialized { entity: String, field: String },

    /// The operation needs a persisted record.
    #[error("{entity} has no id")]
    MissingId { entity: String },
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_shows_shape() {
        let error = ExecutionError::new(r#"INSERT INTO "User""#, "duplicate key");
        assert_eq!(error.to_string(), r#"INSERT INTO "User": duplicate key"#);
    }

    #[test]
    fn test_dependency_cycle_lists_entities() {
        let error = MetadataError::DependencyCycle {
            entities: vec![String::from("A"), String::from("B")],
        };
        assert_eq!(error.to_string(), "reference cycle between entities: A, B");
    }

    #[test]
    fn test_orm_error_wraps_build_error() {
        let error: OrmError = BuildError::EmptyInList.into();
        assert!(matches!(error, OrmError::Build(BuildError::EmptyInList)));
    }
}
