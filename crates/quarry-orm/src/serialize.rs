//! JSON output of records, filtered by field visibility.

use std::collections::BTreeMap;

use quarry_sql_core::SqlValue;
use serde_json::{Map, Value};

use crate::descriptor::Visibility;
use crate::error::Result;
use crate::metadata::{EntityMetadata, PropertyKind};
use crate::record::{EntityRecord, FieldValue};
use crate::registry::EntityRegistry;

/// Whoever a record is serialized for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    groups: Vec<String>,
}

impl Viewer {
    #[must_use]
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

impl Visibility {
    /// Whether `viewer` sees a field with this visibility.
    #[must_use]
    pub fn admits(&self, viewer: Option<&Viewer>) -> bool {
        match (self, viewer) {
            (Self::All, _) => true,
            (Self::None, _) => false,
            // An empty allow-list restricts nobody.
            (Self::ByGroup(groups), _) if groups.is_empty() => true,
            (Self::ByGroup(_), None) => false,
            (Self::ByGroup(groups), Some(viewer)) => {
                groups.iter().any(|group| viewer.in_group(group))
            }
        }
    }
}

/// The fields to output, with projections of nested references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: BTreeMap<String, Option<Projection>>,
}

impl Projection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A projection of plain fields.
    #[must_use]
    pub fn of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields.into_iter().fold(Self::new(), |projection, field| projection.field(field))
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), None);
        self
    }

    /// Includes reference `name`, itself projected.
    #[must_use]
    pub fn nested(mut self, name: impl Into<String>, projection: Self) -> Self {
        self.fields.insert(name.into(), Some(projection));
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn nested_for(&self, name: &str) -> Option<&Self> {
        self.fields.get(name).and_then(Option::as_ref)
    }
}

/// JSON form of a column value.
#[must_use]
pub fn sql_to_json(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Bool(*b),
        SqlValue::Int(n) => Value::from(*n),
        SqlValue::Float(f) => Value::from(*f),
        SqlValue::Text(s) => Value::String(s.clone()),
        SqlValue::Blob(bytes) => Value::from(bytes.clone()),
    }
}

/// Serializes `record` for `viewer`.
///
/// `id` comes first, then the visible properties in declaration order.
/// Uninitialized fields are left out. Datetimes become unix timestamps,
/// loaded references nested objects and relations id arrays. Extra values
/// are merged in when no projection is given.
///
/// # Errors
///
/// The metadata error of a nested reference's entity.
pub fn serialize(
    registry: &EntityRegistry,
    metadata: &EntityMetadata,
    record: &EntityRecord,
    viewer: Option<&Viewer>,
    projection: Option<&Projection>,
) -> Result<Value> {
    let mut object = Map::new();
    object.insert(String::from("id"), record.id().map_or(Value::Null, Value::from));

    for property in metadata.properties() {
        if property.kind == PropertyKind::Id {
            continue;
        }
        if projection.is_some_and(|projection| !projection.contains(&property.name)) {
            continue;
        }
        if !property.visibility.admits(viewer) {
            continue;
        }
        let Some(value) = record.get(&property.name) else {
            continue;
        };
        let json = match value {
            FieldValue::Scalar(value) => sql_to_json(value),
            FieldValue::DateTime(datetime) => Value::from(datetime.and_utc().timestamp()),
            FieldValue::Json(json) => json.clone(),
            FieldValue::ReferenceId(id) => Value::from(*id),
            FieldValue::Reference(nested) => {
                let Some(reference) = metadata.reference(&property.name) else {
                    continue;
                };
                let target = registry.metadata_of(reference.target)?;
                let nested_projection = projection
                    .and_then(|projection| projection.nested_for(&property.name))
                    .or(if reference.target == metadata.entity() {
                        projection
                    } else {
                        None
                    });
                serialize(registry, &target, nested, viewer, nested_projection)?
            }
            FieldValue::Relation(handle) => Value::from(handle.ids().to_vec()),
        };
        object.insert(property.name.clone(), json);
    }

    if projection.is_none() {
        for (key, value) in record.extra() {
            object.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_rules() {
        let admin = Viewer::new(["admin"]);
        let guest = Viewer::new(["guest"]);
        let admins_only = Visibility::ByGroup(vec![String::from("admin")]);

        assert!(Visibility::All.admits(None));
        assert!(!Visibility::None.admits(Some(&admin)));
        assert!(admins_only.admits(Some(&admin)));
        assert!(!admins_only.admits(Some(&guest)));
        assert!(!admins_only.admits(None));
        assert!(Visibility::ByGroup(Vec::new()).admits(Some(&guest)));
        assert!(Visibility::ByGroup(Vec::new()).admits(None));
    }

    #[test]
    fn test_projection() {
        let projection = Projection::of(["name"]).nested("group", Projection::of(["title"]));
        assert!(projection.contains("name"));
        assert!(projection.contains("group"));
        assert!(!projection.contains("email"));
        assert!(projection.nested_for("name").is_none());
        assert!(projection.nested_for("group").unwrap().contains("title"));
    }

    #[test]
    fn test_sql_to_json() {
        assert_eq!(sql_to_json(&SqlValue::Int(3)), serde_json::json!(3));
        assert_eq!(sql_to_json(&SqlValue::Null), Value::Null);
        assert_eq!(sql_to_json(&SqlValue::Text("a".into())), serde_json::json!("a"));
    }
}
