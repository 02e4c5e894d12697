//! Dynamic field maps every entity converts to and from.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use quarry_sql_core::{Expression, SqlValue};

use crate::entity::FieldType;
use crate::error::HydrationError;
use crate::relation::RelationHandle;

/// Textual form datetimes are persisted in.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The value of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(SqlValue),
    DateTime(NaiveDateTime),
    Json(serde_json::Value),
    /// A one-to-many reference that was not loaded.
    ReferenceId(i64),
    /// A loaded one-to-many reference.
    Reference(Box<EntityRecord>),
    /// A many-to-many collection.
    Relation(RelationHandle),
}

impl FieldValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(SqlValue::Null))
    }

    /// The value stored in the field's column; relations have no column.
    #[must_use]
    pub fn to_sql_value(&self) -> Option<SqlValue> {
        match self {
            Self::Scalar(value) => Some(value.clone()),
            Self::DateTime(datetime) => Some(SqlValue::Text(
                datetime.format(DATETIME_FORMAT).to_string(),
            )),
            Self::Json(value) => Some(SqlValue::Text(value.to_string())),
            Self::ReferenceId(id) => Some(SqlValue::Int(*id)),
            Self::Reference(record) => Some(record.id().map_or(SqlValue::Null, SqlValue::Int)),
            Self::Relation(_) => None,
        }
    }

    pub(crate) fn to_expression(&self) -> Option<Expression> {
        self.to_sql_value().map(Expression::Value)
    }

    /// Short description used in conversion errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Scalar(value) => String::from(value.kind()),
            Self::DateTime(_) => String::from("datetime"),
            Self::Json(_) => String::from("json"),
            Self::ReferenceId(_) | Self::Reference(_) => String::from("reference"),
            Self::Relation(_) => String::from("relation"),
        }
    }
}

impl From<SqlValue> for FieldValue {
    fn from(value: SqlValue) -> Self {
        Self::Scalar(value)
    }
}

macro_rules! scalar_into_field_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    Self::Scalar(quarry_sql_core::ToSqlValue::to_sql_value(value))
                }
            }
        )*
    };
}

scalar_into_field_value!(bool, i64, i32, u32, f32, f64, String, &str);

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<RelationHandle> for FieldValue {
    fn from(value: RelationHandle) -> Self {
        Self::Relation(value)
    }
}

impl From<EntityRecord> for FieldValue {
    fn from(value: EntityRecord) -> Self {
        Self::Reference(Box::new(value))
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Scalar(SqlValue::Null), Into::into)
    }
}

/// An entity as a map of field values.
///
/// A field that was never set is *uninitialized*: on insert it takes its
/// default, on update it is left untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityRecord {
    entity: String,
    id: Option<i64>,
    values: BTreeMap<String, FieldValue>,
    extra: BTreeMap<String, serde_json::Value>,
}

impl EntityRecord {
    #[must_use]
    pub fn new(entity: &str) -> Self {
        Self {
            entity: String::from(entity),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets a field, builder style.
    #[must_use]
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.values.insert(String::from(field), value.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut FieldValue> {
        self.values.get_mut(field)
    }

    #[must_use]
    pub fn is_set(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.values.remove(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Reads a field as a typed value.
    ///
    /// # Errors
    ///
    /// [`HydrationError`] when the field is missing or has another type.
    pub fn field<T: FieldType>(&self, name: &str) -> Result<T, HydrationError> {
        match self.values.get(name) {
            Some(value) => T::from_field(value, &self.entity, name),
            None => T::from_missing(&self.entity, name),
        }
    }

    /// The many-to-many collection stored in `field`.
    #[must_use]
    pub fn relation(&self, field: &str) -> Option<&RelationHandle> {
        match self.values.get(field) {
            Some(FieldValue::Relation(handle)) => Some(handle),
            _ => None,
        }
    }

    pub fn relation_mut(&mut self, field: &str) -> Option<&mut RelationHandle> {
        match self.values.get_mut(field) {
            Some(FieldValue::Relation(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Attaches a value that is not persisted, such as a computed column.
    pub fn set_extra(&mut self, key: &str, value: serde_json::Value) {
        self.extra.insert(String::from(key), value);
    }

    #[must_use]
    pub const fn extra(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_field_value_sql_values() {
        let datetime = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(
            FieldValue::from(datetime).to_sql_value(),
            Some(SqlValue::Text("2024-03-01 12:30:00".into()))
        );
        assert_eq!(
            FieldValue::from(serde_json::json!({"a": 1})).to_sql_value(),
            Some(SqlValue::Text(r#"{"a":1}"#.into()))
        );
        assert_eq!(
            FieldValue::from(EntityRecord::new("Group").with_id(4)).to_sql_value(),
            Some(SqlValue::Int(4))
        );
        assert_eq!(
            FieldValue::from(RelationHandle::new([1, 2])).to_sql_value(),
            None
        );
    }

    #[test]
    fn test_none_is_null() {
        assert!(FieldValue::from(None::<i64>).is_null());
        assert_eq!(FieldValue::from(Some("a")), FieldValue::Scalar(SqlValue::Text("a".into())));
    }

    #[test]
    fn test_record_fields() {
        let mut record = EntityRecord::new("User").with("name", "alice");
        assert!(record.is_set("name"));
        assert!(!record.is_set("age"));
        assert_eq!(record.field::<String>("name").unwrap(), "alice");
        assert_eq!(record.field::<Option<i64>>("age").unwrap(), None);
        assert!(matches!(
            record.field::<i64>("age"),
            Err(HydrationError::MissingField { .. })
        ));

        record.set("groups", RelationHandle::new([3]));
        record.relation_mut("groups").unwrap().add(5);
        assert_eq!(record.relation("groups").unwrap().ids(), [3, 5]);
    }
}
