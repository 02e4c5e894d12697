//! Entity descriptors: the declared shape of an entity.
//!
//! A descriptor is built with a fluent API or generated by
//! `#[derive(Entity)]`. Every attribute is optional so a descriptor can
//! refine fields inherited through "use properties of"; the merged result
//! is validated when metadata is derived.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use quarry_sql_core::{SqlValue, ToSqlValue};

use crate::entity::{Entity, FieldType};
use crate::entity_log::EntityLogConfig;
use crate::error::MetadataError;
use crate::record::{EntityRecord, FieldValue};

/// A handle on an entity type, compared by type identity.
#[derive(Clone, Copy)]
pub struct EntityRef {
    type_id: TypeId,
    type_name: &'static str,
    describe: fn() -> EntityDescriptor,
}

impl EntityRef {
    #[must_use]
    pub fn of<T: Entity>() -> Self {
        Self::new::<T>(T::describe)
    }

    /// An entity known only by its descriptor; `M` is a marker giving it an
    /// identity.
    #[must_use]
    pub fn new<M: 'static>(describe: fn() -> EntityDescriptor) -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
            describe,
        }
    }

    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn describe(&self) -> EntityDescriptor {
        (self.describe)()
    }

    /// Table name of the entity.
    #[must_use]
    pub fn name(&self) -> String {
        self.describe().name
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityRef {}

impl Hash for EntityRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.type_name).finish()
    }
}

/// What a field stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Double,
    Bool,
    Text,
    DateTime,
    Json,
    /// One-to-many reference to another entity.
    Reference(EntityRef),
    /// Many-to-many collection of another entity.
    Relation(EntityRef),
}

/// Who sees a field when a record is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Never serialized.
    None,
    /// Serialized for viewers in one of the groups; an empty list admits
    /// every viewer.
    ByGroup(Vec<String>),
    #[default]
    All,
}

/// Value of a field that was not initialized before insert.
#[derive(Debug, Clone)]
pub enum FieldDefault {
    /// A literal, also emitted as the column DEFAULT.
    Value(SqlValue),
    /// The current timestamp, also emitted as the column DEFAULT.
    Now,
    /// Computed on insert.
    With(fn() -> FieldValue),
}

/// Computed defaults never compare equal, not even to themselves.
impl PartialEq for FieldDefault {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Now, Self::Now) => true,
            _ => false,
        }
    }
}

/// One declared field. Unset attributes are inherited or take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) kind: Option<FieldKind>,
    pub(crate) nullable: Option<bool>,
    pub(crate) max_length: Option<u32>,
    pub(crate) big: Option<bool>,
    pub(crate) unsigned: Option<bool>,
    pub(crate) json: Option<bool>,
    pub(crate) values: Option<Vec<String>>,
    pub(crate) extending: Option<Vec<(String, String)>>,
    pub(crate) unique: Option<bool>,
    pub(crate) transient: Option<bool>,
    pub(crate) visibility: Option<Visibility>,
    pub(crate) default: Option<FieldDefault>,
    pub(crate) through: Option<(String, String)>,
}

impl Field {
    fn of_kind(name: &str, kind: FieldKind) -> Self {
        Self {
            name: String::from(name),
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// A field whose kind and nullability come from its Rust type.
    #[must_use]
    pub fn typed<T: FieldType>(name: &str) -> Self {
        Self {
            name: String::from(name),
            kind: T::kind(),
            nullable: Some(T::NULLABLE),
            ..Default::default()
        }
    }

    /// Attribute overrides for a field declared elsewhere.
    #[must_use]
    pub fn attributes(name: &str) -> Self {
        Self {
            name: String::from(name),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn integer(name: &str) -> Self {
        Self::of_kind(name, FieldKind::Integer)
    }

    #[must_use]
    pub fn float(name: &str) -> Self {
        Self::of_kind(name, FieldKind::Float)
    }

    #[must_use]
    pub fn double(name: &str) -> Self {
        Self::of_kind(name, FieldKind::Double)
    }

    #[must_use]
    pub fn bool(name: &str) -> Self {
        Self::of_kind(name, FieldKind::Bool)
    }

    #[must_use]
    pub fn text(name: &str) -> Self {
        Self::of_kind(name, FieldKind::Text)
    }

    #[must_use]
    pub fn datetime(name: &str) -> Self {
        Self::of_kind(name, FieldKind::DateTime)
    }

    #[must_use]
    pub fn json_document(name: &str) -> Self {
        Self::of_kind(name, FieldKind::Json)
    }

    #[must_use]
    pub fn reference<T: Entity>(name: &str) -> Self {
        Self::reference_to(name, EntityRef::of::<T>())
    }

    #[must_use]
    pub fn reference_to(name: &str, target: EntityRef) -> Self {
        Self::of_kind(name, FieldKind::Reference(target))
    }

    #[must_use]
    pub fn many<T: Entity>(name: &str) -> Self {
        Self::many_to(name, EntityRef::of::<T>())
    }

    #[must_use]
    pub fn many_to(name: &str, target: EntityRef) -> Self {
        Self::of_kind(name, FieldKind::Relation(target))
    }

    /// Replaces the kind, keeping the other attributes.
    #[must_use]
    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    /// Makes the column NOT NULL even when the Rust type is optional.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    #[must_use]
    pub const fn max_length(mut self, length: u32) -> Self {
        self.max_length = Some(length);
        self
    }

    /// 64-bit integer column.
    #[must_use]
    pub const fn big(mut self) -> Self {
        self.big = Some(true);
        self
    }

    #[must_use]
    pub const fn unsigned(mut self) -> Self {
        self.unsigned = Some(true);
        self
    }

    /// Stores a text field as a JSON column.
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.json = Some(true);
        self
    }

    /// Restricts a text field to a closed set of values.
    #[must_use]
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// An enum whose values map to display labels.
    #[must_use]
    pub fn extending<I, S, L>(mut self, mappings: I) -> Self
    where
        I: IntoIterator<Item = (S, L)>,
        S: Into<String>,
        L: Into<String>,
    {
        self.extending = Some(
            mappings
                .into_iter()
                .map(|(value, label)| (value.into(), label.into()))
                .collect(),
        );
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = Some(true);
        self
    }

    /// Not persisted.
    #[must_use]
    pub const fn transient(mut self) -> Self {
        self.transient = Some(true);
        self
    }

    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    #[must_use]
    pub fn hidden(self) -> Self {
        self.visibility(Visibility::None)
    }

    #[must_use]
    pub fn visible_to<I, S>(self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visibility(Visibility::ByGroup(
            groups.into_iter().map(Into::into).collect(),
        ))
    }

    #[must_use]
    pub fn default(mut self, value: impl ToSqlValue) -> Self {
        self.default = Some(FieldDefault::Value(value.to_sql_value()));
        self
    }

    #[must_use]
    pub fn default_now(mut self) -> Self {
        self.default = Some(FieldDefault::Now);
        self
    }

    #[must_use]
    pub fn default_with(mut self, constructor: fn() -> FieldValue) -> Self {
        self.default = Some(FieldDefault::With(constructor));
        self
    }

    /// Makes a many-to-many relation managed by the related entity: its
    /// `this_field` references the owner and `other_field` the far side.
    #[must_use]
    pub fn through(mut self, this_field: &str, other_field: &str) -> Self {
        self.through = Some((String::from(this_field), String::from(other_field)));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn field_kind(&self) -> Option<&FieldKind> {
        self.kind.as_ref()
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.transient == Some(true)
    }

    /// `over` refines `self`: its set attributes win.
    pub(crate) fn merge(self, over: Self, entity: &str) -> Result<Self, MetadataError> {
        if let (Some(base), Some(refined)) = (&self.kind, &over.kind) {
            if base != refined {
                return Err(MetadataError::Conflicting {
                    entity: String::from(entity),
                    field: self.name,
                    what: String::from("types"),
                });
            }
        }
        Ok(Self {
            name: self.name,
            kind: over.kind.or(self.kind),
            nullable: over.nullable.or(self.nullable),
            max_length: over.max_length.or(self.max_length),
            big: over.big.or(self.big),
            unsigned: over.unsigned.or(self.unsigned),
            json: over.json.or(self.json),
            values: over.values.or(self.values),
            extending: over.extending.or(self.extending),
            unique: over.unique.or(self.unique),
            transient: over.transient.or(self.transient),
            visibility: over.visibility.or(self.visibility),
            default: over.default.or(self.default),
            through: over.through.or(self.through),
        })
    }
}

/// The declared shape of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub(crate) name: String,
    pub(crate) fields: Vec<Field>,
    pub(crate) unique: Vec<Vec<String>>,
    pub(crate) uses: Option<EntityRef>,
    pub(crate) entity_log: EntityLogConfig,
    pub(crate) predefined: Vec<EntityRecord>,
}

impl EntityDescriptor {
    /// Starts a descriptor; `name` is also the table name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            fields: Vec::new(),
            unique: Vec::new(),
            uses: None,
            entity_log: EntityLogConfig::default(),
            predefined: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// A unique constraint over several fields.
    #[must_use]
    pub fn unique<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique
            .push(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Inherits the fields and unique constraints of `T`.
    #[must_use]
    pub fn uses_properties_of<T: Entity>(self) -> Self {
        self.uses(EntityRef::of::<T>())
    }

    #[must_use]
    pub const fn uses(mut self, base: EntityRef) -> Self {
        self.uses = Some(base);
        self
    }

    #[must_use]
    pub const fn entity_log(mut self, config: EntityLogConfig) -> Self {
        self.entity_log = config;
        self
    }

    /// A row inserted right after the table is created.
    #[must_use]
    pub fn predefined(mut self, record: EntityRecord) -> Self {
        self.predefined.push(record);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    fn describe_marker() -> EntityDescriptor {
        EntityDescriptor::new("Marker").field(Field::text("name"))
    }

    #[test]
    fn test_entity_ref_identity() {
        let a = EntityRef::new::<Marker>(describe_marker);
        let b = EntityRef::new::<Marker>(describe_marker);
        assert_eq!(a, b);
        assert_eq!(a.name(), "Marker");
        assert!(format!("{a:?}").contains("Marker"));
    }

    #[test]
    fn test_field_default_equality() {
        fn token() -> FieldValue {
            FieldValue::Scalar(SqlValue::Text(String::from("abc")))
        }
        assert_eq!(FieldDefault::Now, FieldDefault::Now);
        assert_eq!(
            FieldDefault::Value(SqlValue::Int(3)),
            FieldDefault::Value(SqlValue::Int(3))
        );
        assert_ne!(FieldDefault::Value(SqlValue::Int(3)), FieldDefault::Now);
        assert_ne!(FieldDefault::With(token), FieldDefault::With(token));

        let computed = Field::text("token").default_with(token);
        assert_ne!(computed.clone(), computed);
        assert_eq!(Field::text("token").default_now(), Field::text("token").default_now());
    }

    #[test]
    fn test_merge_prefers_refinement() {
        let base = Field::text("name").max_length(64).unique();
        let refined = Field::attributes("name").max_length(32).nullable();
        let merged = base.merge(refined, "User").unwrap();
        assert_eq!(merged.kind, Some(FieldKind::Text));
        assert_eq!(merged.max_length, Some(32));
        assert_eq!(merged.unique, Some(true));
        assert_eq!(merged.nullable, Some(true));
    }

    #[test]
    fn test_merge_rejects_other_type() {
        let result = Field::text("age").merge(Field::integer("age"), "User");
        assert!(matches!(result, Err(MetadataError::Conflicting { .. })));
    }

    #[test]
    fn test_typed_field_takes_nullability() {
        let field = Field::typed::<Option<String>>("nickname");
        assert_eq!(field.kind, Some(FieldKind::Text));
        assert_eq!(field.nullable, Some(true));
        assert_eq!(Field::typed::<crate::RelationHandle>("tags").kind, None);
    }
}
