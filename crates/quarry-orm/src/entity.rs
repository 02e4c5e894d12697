//! Typed entities and their field conversions.

use chrono::NaiveDateTime;
use quarry_sql_core::SqlValue;

use crate::descriptor::{EntityDescriptor, EntityRef, FieldKind};
use crate::error::HydrationError;
use crate::record::{EntityRecord, FieldValue};
use crate::relation::{Reference, RelationHandle};

/// A Rust type persisted as one table row.
///
/// Usually implemented with `#[derive(Entity)]`:
///
/// ```ignore
/// use quarry_orm::{Entity, Reference, RelationHandle};
///
/// #[derive(Entity)]
/// #[entity(unique(email))]
/// struct User {
///     id: Option<i64>,
///     #[entity(max_length = 32)]
///     name: String,
///     email: String,
///     group: Option<Reference<Group>>,
///     #[entity(many = Tag)]
///     tags: RelationHandle,
/// }
/// ```
pub trait Entity: Sized + 'static {
    /// Describes the table this entity maps to.
    fn describe() -> EntityDescriptor;

    fn to_record(&self) -> EntityRecord;

    /// # Errors
    ///
    /// [`HydrationError`] when a field is missing or has another type.
    fn from_record(record: &EntityRecord) -> Result<Self, HydrationError>;

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);
}

/// A Rust type usable as an entity field.
pub trait FieldType: Sized {
    /// Whether the column accepts NULL.
    const NULLABLE: bool = false;

    /// Column kind, `None` when it has to be declared explicitly.
    fn kind() -> Option<FieldKind>;

    fn to_field(&self) -> FieldValue;

    /// # Errors
    ///
    /// [`HydrationError::TypeMismatch`] or [`HydrationError::Unparsable`].
    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError>;

    /// Value of a field the record does not carry.
    ///
    /// # Errors
    ///
    /// [`HydrationError::MissingField`] unless the type has an empty value.
    fn from_missing(entity: &str, field: &str) -> Result<Self, HydrationError> {
        Err(HydrationError::MissingField {
            entity: String::from(entity),
            field: String::from(field),
        })
    }
}

pub(crate) fn mismatch(
    entity: &str,
    column: &str,
    expected: &'static str,
    found: &FieldValue,
) -> HydrationError {
    HydrationError::TypeMismatch {
        entity: String::from(entity),
        column: String::from(column),
        expected,
        found: found.describe(),
    }
}

pub(crate) fn unparsable(entity: &str, column: &str, message: impl ToString) -> HydrationError {
    HydrationError::Unparsable {
        entity: String::from(entity),
        column: String::from(column),
        message: message.to_string(),
    }
}

/// Parses the textual datetime forms backends return.
pub(crate) fn parse_datetime(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
}

macro_rules! integer_field {
    ($($ty:ty),*) => {
        $(
            impl FieldType for $ty {
                fn kind() -> Option<FieldKind> {
                    Some(FieldKind::Integer)
                }

                fn to_field(&self) -> FieldValue {
                    FieldValue::Scalar(SqlValue::Int(i64::from(*self)))
                }

                fn from_field(
                    value: &FieldValue,
                    entity: &str,
                    field: &str,
                ) -> Result<Self, HydrationError> {
                    let number = match value {
                        FieldValue::Scalar(scalar) => scalar.as_i64(),
                        FieldValue::ReferenceId(id) => Some(*id),
                        _ => None,
                    }
                    .ok_or_else(|| mismatch(entity, field, "integer", value))?;
                    Self::try_from(number)
                        .map_err(|_| unparsable(entity, field, format!("{number} is out of range")))
                }
            }
        )*
    };
}

integer_field!(i64, i32, i16, i8, u32, u16, u8);

impl FieldType for bool {
    fn kind() -> Option<FieldKind> {
        Some(FieldKind::Bool)
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(SqlValue::Bool(*self))
    }

    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError> {
        match value {
            FieldValue::Scalar(scalar) => scalar.as_bool(),
            _ => None,
        }
        .ok_or_else(|| mismatch(entity, field, "bool", value))
    }
}

impl FieldType for f64 {
    fn kind() -> Option<FieldKind> {
        Some(FieldKind::Double)
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(SqlValue::Float(*self))
    }

    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError> {
        match value {
            FieldValue::Scalar(SqlValue::Text(text)) => text
                .parse()
                .map_err(|e: std::num::ParseFloatError| unparsable(entity, field, e)),
            FieldValue::Scalar(scalar) => scalar
                .as_f64()
                .ok_or_else(|| mismatch(entity, field, "number", value)),
            _ => Err(mismatch(entity, field, "number", value)),
        }
    }
}

impl FieldType for f32 {
    fn kind() -> Option<FieldKind> {
        Some(FieldKind::Float)
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(SqlValue::Float(f64::from(*self)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError> {
        f64::from_field(value, entity, field).map(|number| number as Self)
    }
}

impl FieldType for String {
    fn kind() -> Option<FieldKind> {
        Some(FieldKind::Text)
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(SqlValue::Text(self.clone()))
    }

    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError> {
        match value {
            FieldValue::Scalar(SqlValue::Text(text)) => Ok(text.clone()),
            FieldValue::Json(json) => Ok(json.to_string()),
            _ => Err(mismatch(entity, field, "text", value)),
        }
    }
}

impl FieldType for NaiveDateTime {
    fn kind() -> Option<FieldKind> {
        Some(FieldKind::DateTime)
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::DateTime(*self)
    }

    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError> {
        match value {
            FieldValue::DateTime(datetime) => Ok(*datetime),
            FieldValue::Scalar(SqlValue::Text(text)) => {
                parse_datetime(text).map_err(|e| unparsable(entity, field, e))
            }
            _ => Err(mismatch(entity, field, "datetime", value)),
        }
    }
}

impl FieldType for serde_json::Value {
    fn kind() -> Option<FieldKind> {
        Some(FieldKind::Json)
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Json(self.clone())
    }

    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError> {
        match value {
            FieldValue::Json(json) => Ok(json.clone()),
            FieldValue::Scalar(SqlValue::Text(text)) => {
                serde_json::from_str(text).map_err(|e| unparsable(entity, field, e))
            }
            _ => Err(mismatch(entity, field, "json", value)),
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const NULLABLE: bool = true;

    fn kind() -> Option<FieldKind> {
        T::kind()
    }

    fn to_field(&self) -> FieldValue {
        self.as_ref()
            .map_or(FieldValue::Scalar(SqlValue::Null), T::to_field)
    }

    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_field(value, entity, field).map(Some)
        }
    }

    fn from_missing(_entity: &str, _field: &str) -> Result<Self, HydrationError> {
        Ok(None)
    }
}

impl<T: Entity> FieldType for Reference<T> {
    fn kind() -> Option<FieldKind> {
        Some(FieldKind::Reference(EntityRef::of::<T>()))
    }

    fn to_field(&self) -> FieldValue {
        match self {
            Self::Id(id) => FieldValue::ReferenceId(*id),
            Self::Loaded(entity) => FieldValue::Reference(Box::new(entity.to_record())),
        }
    }

    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError> {
        match value {
            FieldValue::ReferenceId(id) => Ok(Self::Id(*id)),
            FieldValue::Reference(record) => T::from_record(record).map(|e| Self::Loaded(Box::new(e))),
            FieldValue::Scalar(scalar) => scalar
                .as_i64()
                .map(Self::Id)
                .ok_or_else(|| mismatch(entity, field, "reference", value)),
            _ => Err(mismatch(entity, field, "reference", value)),
        }
    }
}

impl FieldType for RelationHandle {
    fn kind() -> Option<FieldKind> {
        None
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Relation(self.clone())
    }

    fn from_field(value: &FieldValue, entity: &str, field: &str) -> Result<Self, HydrationError> {
        match value {
            FieldValue::Relation(handle) => Ok(handle.clone()),
            _ => Err(mismatch(entity, field, "relation", value)),
        }
    }

    fn from_missing(_entity: &str, _field: &str) -> Result<Self, HydrationError> {
        Ok(Self::default())
    }
}
