//! Table metadata derived from entity descriptors.

use std::any::TypeId;

use quarry_sql_core::ast::{Constraint, OnDelete};
use quarry_sql_core::builder::{CreateTable, CreateTrigger, Insert};
use quarry_sql_core::{ColumnDefinition, ColumnType, DefaultValue, Expression, SqlValue};

use crate::descriptor::{EntityDescriptor, EntityRef, Field, FieldDefault, FieldKind, Visibility};
use crate::entity_log::{self, EntityLogConfig};
use crate::error::{MetadataError, OrmError};
use crate::naming::{
    column_name, foreign_key_name, junction_column, junction_table, reference_column, sorted_pair,
};
use crate::record::EntityRecord;

/// How a column's value is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Scalar,
    DateTime,
    Json,
    Reference,
}

/// A persisted field.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub property: String,
    pub definition: ColumnDefinition,
    pub kind: ColumnKind,
    pub default: Option<FieldDefault>,
}

impl ColumnMeta {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.definition.nullable
    }
}

/// A one-to-many reference stored as `<column>_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceMeta {
    pub property: String,
    pub column: String,
    pub target: EntityRef,
    pub target_table: String,
    pub nullable: bool,
}

/// A many-to-many relation.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationMeta {
    /// Stored in an `NM_<A>_<B>` table owned by neither side.
    Junction {
        property: String,
        table: String,
        this_column: String,
        other_column: String,
        target: EntityRef,
    },
    /// Stored in the table of an intermediate entity referencing both sides.
    Managed {
        property: String,
        table: String,
        this_column: String,
        other_column: String,
        through: EntityRef,
        target: EntityRef,
    },
}

impl RelationMeta {
    #[must_use]
    pub fn property(&self) -> &str {
        match self {
            Self::Junction { property, .. } | Self::Managed { property, .. } => property,
        }
    }

    /// Table holding the pairs.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::Junction { table, .. } | Self::Managed { table, .. } => table,
        }
    }

    /// Column holding the owner's id.
    #[must_use]
    pub fn this_column(&self) -> &str {
        match self {
            Self::Junction { this_column, .. } | Self::Managed { this_column, .. } => this_column,
        }
    }

    /// Column holding the related id.
    #[must_use]
    pub fn other_column(&self) -> &str {
        match self {
            Self::Junction { other_column, .. } | Self::Managed { other_column, .. } => {
                other_column
            }
        }
    }

    /// Entity the related ids belong to.
    #[must_use]
    pub const fn target(&self) -> EntityRef {
        match self {
            Self::Junction { target, .. } | Self::Managed { target, .. } => *target,
        }
    }

    #[must_use]
    pub const fn is_managed(&self) -> bool {
        matches!(self, Self::Managed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Id,
    Column,
    Reference,
    Relation,
}

/// A serializable property, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMeta {
    pub name: String,
    pub kind: PropertyKind,
    pub visibility: Visibility,
}

/// An enum property whose values map to display labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendingEnum {
    pub property: String,
    pub mappings: Vec<(String, String)>,
}

/// Which fields an update or insert writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowAction {
    Insert,
    Update,
}

/// Everything persisted about one entity type.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    entity: EntityRef,
    table: String,
    columns: Vec<ColumnMeta>,
    constraints: Vec<Constraint>,
    references: Vec<ReferenceMeta>,
    relations: Vec<RelationMeta>,
    properties: Vec<PropertyMeta>,
    extending: Option<ExtendingEnum>,
    entity_log: EntityLogConfig,
    predefined: Vec<EntityRecord>,
}

/// The descriptor of `entity` with every inherited field merged in.
///
/// # Errors
///
/// [`MetadataError::InheritanceCycle`], duplicate fields, or conflicting
/// inherited declarations.
pub fn resolve_descriptor(entity: EntityRef) -> Result<EntityDescriptor, MetadataError> {
    let mut descriptor = entity.describe();
    let mut chain: Vec<TypeId> = vec![entity.type_id()];
    let mut bases = Vec::new();
    let mut next = descriptor.uses;
    while let Some(base) = next {
        if chain.contains(&base.type_id()) {
            return Err(MetadataError::InheritanceCycle {
                entity: descriptor.name,
            });
        }
        chain.push(base.type_id());
        let base_descriptor = base.describe();
        next = base_descriptor.uses;
        bases.push(base_descriptor);
    }

    let own_fields = std::mem::take(&mut descriptor.fields);
    check_duplicates(&descriptor.name, &own_fields)?;
    let mut fields: Vec<Field> = Vec::new();
    let mut unique = Vec::new();
    for base in bases.into_iter().rev() {
        check_duplicates(&base.name, &base.fields)?;
        merge_fields(&descriptor.name, &mut fields, base.fields)?;
        unique.extend(base.unique);
    }
    merge_fields(&descriptor.name, &mut fields, own_fields)?;
    unique.append(&mut descriptor.unique);
    descriptor.fields = fields;
    descriptor.unique = unique;
    Ok(descriptor)
}

fn check_duplicates(entity: &str, fields: &[Field]) -> Result<(), MetadataError> {
    for (index, field) in fields.iter().enumerate() {
        if fields[..index].iter().any(|f| f.name == field.name) {
            return Err(MetadataError::DuplicateField {
                entity: String::from(entity),
                field: field.name.clone(),
            });
        }
    }
    Ok(())
}

fn merge_fields(entity: &str, fields: &mut Vec<Field>, refinements: Vec<Field>) -> Result<(), MetadataError> {
    for refinement in refinements {
        match fields.iter().position(|f| f.name == refinement.name) {
            Some(index) => {
                let base = fields.remove(index);
                fields.insert(index, base.merge(refinement, entity)?);
            }
            None => fields.push(refinement),
        }
    }
    Ok(())
}

fn column_default(entity: &str, field: &Field, default: &FieldDefault) -> Result<Option<DefaultValue>, MetadataError> {
    let value = match default {
        FieldDefault::Value(SqlValue::Null) => DefaultValue::Null,
        FieldDefault::Value(SqlValue::Bool(b)) => DefaultValue::Boolean(*b),
        FieldDefault::Value(SqlValue::Int(n)) => DefaultValue::Integer(*n),
        FieldDefault::Value(SqlValue::Float(f)) => DefaultValue::Float(*f),
        FieldDefault::Value(SqlValue::Text(s)) => DefaultValue::String(s.clone()),
        FieldDefault::Value(SqlValue::Blob(_)) => {
            return Err(invalid(entity, field, "default", "binary defaults are not supported"))
        }
        FieldDefault::Now => DefaultValue::CurrentTimestamp,
        FieldDefault::With(_) => return Ok(None),
    };
    Ok(Some(value))
}

fn invalid(entity: &str, field: &Field, attribute: &'static str, reason: &str) -> MetadataError {
    MetadataError::InvalidAttribute {
        entity: String::from(entity),
        field: field.name.clone(),
        attribute,
        reason: String::from(reason),
    }
}

impl EntityMetadata {
    /// Derives the metadata of `entity` from its descriptor.
    ///
    /// # Errors
    ///
    /// [`MetadataError`] for any missing, invalid or conflicting attribute.
    pub fn derive(entity: EntityRef) -> Result<Self, MetadataError> {
        let descriptor = resolve_descriptor(entity)?;
        let mut metadata = Self {
            entity,
            table: descriptor.name.clone(),
            columns: Vec::new(),
            constraints: Vec::new(),
            references: Vec::new(),
            relations: Vec::new(),
            properties: vec![PropertyMeta {
                name: String::from("id"),
                kind: PropertyKind::Id,
                visibility: Visibility::All,
            }],
            extending: None,
            entity_log: descriptor.entity_log,
            predefined: descriptor.predefined,
        };
        for field in &descriptor.fields {
            metadata.add_field(field)?;
        }
        for properties in &descriptor.unique {
            metadata.add_unique(properties)?;
        }
        Ok(metadata)
    }

    fn add_field(&mut self, field: &Field) -> Result<(), MetadataError> {
        if field.name == "id" {
            return Err(MetadataError::ReservedField {
                entity: self.table.clone(),
            });
        }
        if field.is_transient() {
            return Ok(());
        }
        let Some(kind) = field.kind.clone() else {
            return Err(MetadataError::MissingType {
                entity: self.table.clone(),
                field: field.name.clone(),
            });
        };
        if field.through.is_some() && !matches!(kind, FieldKind::Relation(_)) {
            return Err(invalid(&self.table, field, "through", "only many-to-many relations are managed"));
        }
        let property_kind = match kind {
            FieldKind::Reference(target) => {
                self.add_reference(field, target)?;
                PropertyKind::Reference
            }
            FieldKind::Relation(target) => {
                self.add_relation(field, target)?;
                PropertyKind::Relation
            }
            scalar => {
                self.add_column(field, &scalar)?;
                PropertyKind::Column
            }
        };
        self.properties.push(PropertyMeta {
            name: field.name.clone(),
            kind: property_kind,
            visibility: field.visibility.clone().unwrap_or_default(),
        });
        Ok(())
    }

    fn check_scalar_attributes(&self, field: &Field, kind: &FieldKind) -> Result<(), MetadataError> {
        let is_text = *kind == FieldKind::Text;
        let checks: [(bool, &'static str, &str); 6] = [
            (field.max_length.is_some() && !is_text, "max_length", "only text fields have a length"),
            (field.big == Some(true) && *kind != FieldKind::Integer, "big", "only integer fields can be big"),
            (field.unsigned == Some(true) && *kind != FieldKind::Integer, "unsigned", "only integer fields can be unsigned"),
            (field.json == Some(true) && !is_text && *kind != FieldKind::Json, "json", "only text fields hold JSON"),
            (field.values.is_some() && !is_text, "values", "only text fields can be enums"),
            (field.extending.is_some() && !is_text, "extending", "only text fields can be enums"),
        ];
        for (failed, attribute, reason) in checks {
            if failed {
                return Err(invalid(&self.table, field, attribute, reason));
            }
        }
        if field.values.is_some() && field.extending.is_some() {
            return Err(MetadataError::Conflicting {
                entity: self.table.clone(),
                field: field.name.clone(),
                what: String::from("enum values"),
            });
        }
        if field.default == Some(FieldDefault::Now) && *kind != FieldKind::DateTime {
            return Err(invalid(&self.table, field, "default", "only datetime fields default to now"));
        }
        Ok(())
    }

    fn add_column(&mut self, field: &Field, kind: &FieldKind) -> Result<(), MetadataError> {
        self.check_scalar_attributes(field, kind)?;
        let name = column_name(&field.name);
        let unsigned = field.unsigned == Some(true);
        let mut column_kind = ColumnKind::Scalar;
        let column_type = match kind {
            FieldKind::Integer if field.big == Some(true) => ColumnType::BigInt { unsigned },
            FieldKind::Integer => ColumnType::Int { unsigned },
            FieldKind::Float => ColumnType::Float,
            FieldKind::Double => ColumnType::Double,
            FieldKind::Bool => ColumnType::Bool,
            FieldKind::DateTime => {
                column_kind = ColumnKind::DateTime;
                ColumnType::DateTime
            }
            FieldKind::Json => {
                column_kind = ColumnKind::Json;
                ColumnType::Json
            }
            _ => self.text_type(field, &mut column_kind)?,
        };

        let nullable = field.nullable == Some(true);
        let default = match &field.default {
            Some(default) => Some(default.clone()),
            None if *kind == FieldKind::Bool && !nullable => {
                Some(FieldDefault::Value(SqlValue::Bool(false)))
            }
            None => None,
        };
        let mut definition = ColumnDefinition::new(name.clone(), column_type);
        if nullable {
            definition = definition.nullable();
        }
        if let Some(default) = &default {
            if let Some(value) = column_default(&self.table, field, default)? {
                definition = definition.default(value);
            }
        }
        if field.unique == Some(true) {
            self.constraints.push(Constraint::unique([name]));
        }
        self.columns.push(ColumnMeta {
            property: field.name.clone(),
            definition,
            kind: column_kind,
            default,
        });
        Ok(())
    }

    fn text_type(&mut self, field: &Field, column_kind: &mut ColumnKind) -> Result<ColumnType, MetadataError> {
        if let Some(mappings) = &field.extending {
            if self.extending.is_some() {
                return Err(MetadataError::MultipleExtending {
                    entity: self.table.clone(),
                });
            }
            self.extending = Some(ExtendingEnum {
                property: field.name.clone(),
                mappings: mappings.clone(),
            });
            let values: Vec<String> = mappings.iter().map(|(value, _)| value.clone()).collect();
            return self.enum_type(field, values);
        }
        if let Some(values) = &field.values {
            return self.enum_type(field, values.clone());
        }
        if field.json == Some(true) {
            *column_kind = ColumnKind::Json;
            return Ok(ColumnType::Json);
        }
        Ok(ColumnType::String {
            max_length: field.max_length,
        })
    }

    fn enum_type(&self, field: &Field, values: Vec<String>) -> Result<ColumnType, MetadataError> {
        if values.is_empty() {
            return Err(invalid(&self.table, field, "values", "an enum needs at least one value"));
        }
        Ok(ColumnType::Enum { values })
    }

    fn add_reference(&mut self, field: &Field, target: EntityRef) -> Result<(), MetadataError> {
        for (present, attribute) in [
            (field.max_length.is_some(), "max_length"),
            (field.big.is_some(), "big"),
            (field.unsigned.is_some(), "unsigned"),
            (field.json.is_some(), "json"),
            (field.values.is_some() || field.extending.is_some(), "values"),
        ] {
            if present {
                return Err(invalid(&self.table, field, attribute, "references hold an id"));
            }
        }
        let nullable = field.nullable == Some(true);
        let column = reference_column(&field.name);
        let target_table = target.name();
        let mut definition = ColumnDefinition::int(column.clone());
        if nullable {
            definition = definition.nullable();
        }
        if let Some(default) = &field.default {
            if let Some(value) = column_default(&self.table, field, default)? {
                definition = definition.default(value);
            }
        }
        let on_delete = if nullable {
            OnDelete::SetNull
        } else {
            OnDelete::Cascade
        };
        self.constraints.push(
            Constraint::foreign_key(&column, &target_table, "id", on_delete)
                .named(&foreign_key_name(&self.table, &target_table, &column)),
        );
        if field.unique == Some(true) {
            self.constraints.push(Constraint::unique([column.clone()]));
        }
        self.columns.push(ColumnMeta {
            property: field.name.clone(),
            definition,
            kind: ColumnKind::Reference,
            default: field.default.clone(),
        });
        self.references.push(ReferenceMeta {
            property: field.name.clone(),
            column,
            target,
            target_table,
            nullable,
        });
        Ok(())
    }

    fn add_relation(&mut self, field: &Field, target: EntityRef) -> Result<(), MetadataError> {
        for (present, attribute) in [
            (field.unique.is_some(), "unique"),
            (field.default.is_some(), "default"),
            (field.max_length.is_some(), "max_length"),
            (field.values.is_some() || field.extending.is_some(), "values"),
        ] {
            if present {
                return Err(invalid(&self.table, field, attribute, "relations have no column"));
            }
        }

        let relation = match &field.through {
            Some((this_field, other_field)) => {
                let through = resolve_descriptor(target)?;
                let reference_of = |property: &str| -> Result<(String, EntityRef), MetadataError> {
                    let declared = through.fields.iter().find(|f| f.name == property).ok_or_else(|| {
                        MetadataError::UnknownField {
                            entity: through.name.clone(),
                            field: String::from(property),
                        }
                    })?;
                    match &declared.kind {
                        Some(FieldKind::Reference(referenced)) => {
                            Ok((reference_column(property), *referenced))
                        }
                        _ => Err(invalid(
                            &self.table,
                            field,
                            "through",
                            &format!("'{property}' of '{}' is not a reference", through.name),
                        )),
                    }
                };
                let (this_column, _) = reference_of(this_field)?;
                let (other_column, far_side) = reference_of(other_field)?;
                RelationMeta::Managed {
                    property: field.name.clone(),
                    table: through.name.clone(),
                    this_column,
                    other_column,
                    through: target,
                    target: far_side,
                }
            }
            None => {
                if target == self.entity {
                    return Err(MetadataError::SelfJunction {
                        entity: self.table.clone(),
                        field: field.name.clone(),
                    });
                }
                let target_table = target.name();
                if self
                    .relations
                    .iter()
                    .any(|r| !r.is_managed() && r.target() == target)
                {
                    return Err(MetadataError::AmbiguousJunction {
                        entity: self.table.clone(),
                        target: target_table,
                    });
                }
                RelationMeta::Junction {
                    property: field.name.clone(),
                    table: junction_table(&self.table, &target_table),
                    this_column: junction_column(&self.table),
                    other_column: junction_column(&target_table),
                    target,
                }
            }
        };
        self.relations.push(relation);
        Ok(())
    }

    fn add_unique(&mut self, properties: &[String]) -> Result<(), MetadataError> {
        let columns = properties
            .iter()
            .map(|property| {
                self.column(property)
                    .map(|column| column.name().to_owned())
                    .ok_or_else(|| MetadataError::UnknownField {
                        entity: self.table.clone(),
                        field: property.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.constraints.push(Constraint::unique(columns));
        Ok(())
    }

    #[must_use]
    pub const fn entity(&self) -> EntityRef {
        self.entity
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// The column of a property.
    #[must_use]
    pub fn column(&self, property: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.property == property)
    }

    /// `Table.id` followed by every column, table-qualified.
    #[must_use]
    pub fn qualified_columns(&self) -> Vec<String> {
        std::iter::once(String::from("id"))
            .chain(self.columns.iter().map(|c| c.name().to_owned()))
            .map(|column| format!("{}.{column}", self.table))
            .collect()
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub fn references(&self) -> &[ReferenceMeta] {
        &self.references
    }

    #[must_use]
    pub fn reference(&self, property: &str) -> Option<&ReferenceMeta> {
        self.references.iter().find(|r| r.property == property)
    }

    #[must_use]
    pub fn relations(&self) -> &[RelationMeta] {
        &self.relations
    }

    #[must_use]
    pub fn relation(&self, property: &str) -> Option<&RelationMeta> {
        self.relations.iter().find(|r| r.property() == property)
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertyMeta] {
        &self.properties
    }

    #[must_use]
    pub const fn extending(&self) -> Option<&ExtendingEnum> {
        self.extending.as_ref()
    }

    /// Display label of the record's extending enum value.
    #[must_use]
    pub fn extending_label(&self, record: &EntityRecord) -> Option<&str> {
        let extending = self.extending.as_ref()?;
        let value = record.get(&extending.property)?.to_sql_value()?;
        let value = value.as_str()?;
        extending
            .mappings
            .iter()
            .find(|(candidate, _)| candidate == value)
            .map(|(_, label)| label.as_str())
    }

    #[must_use]
    pub const fn entity_log(&self) -> &EntityLogConfig {
        &self.entity_log
    }

    #[must_use]
    pub fn predefined(&self) -> &[EntityRecord] {
        &self.predefined
    }

    /// Entities whose tables must exist before this one.
    #[must_use]
    pub fn dependencies(&self) -> Vec<EntityRef> {
        let mut dependencies: Vec<EntityRef> = Vec::new();
        for reference in &self.references {
            if reference.target != self.entity && !dependencies.contains(&reference.target) {
                dependencies.push(reference.target);
            }
        }
        dependencies
    }

    /// Every entity this one mentions, references and relations alike.
    #[must_use]
    pub fn related_entities(&self) -> Vec<EntityRef> {
        let mut related = self.dependencies();
        for relation in &self.relations {
            let mentioned = match relation {
                RelationMeta::Junction { target, .. } => vec![*target],
                RelationMeta::Managed { through, target, .. } => vec![*through, *target],
            };
            for entity in mentioned {
                if entity != self.entity && !related.contains(&entity) {
                    related.push(entity);
                }
            }
        }
        related
    }

    /// The CREATE TABLE statement.
    #[must_use]
    pub fn create_table(&self) -> CreateTable {
        let table = CreateTable::new(&self.table)
            .if_not_exists()
            .serial_primary_key("id");
        let table = self
            .columns
            .iter()
            .fold(table, |table, column| table.column(column.definition.clone()));
        self.constraints
            .iter()
            .fold(table, |table, constraint| table.constraint(constraint.clone()))
    }

    /// Junction tables of the unmanaged relations.
    #[must_use]
    pub fn junction_tables(&self) -> Vec<CreateTable> {
        self.relations
            .iter()
            .filter_map(|relation| match relation {
                RelationMeta::Junction { table, target, .. } => {
                    let target_table = target.name();
                    let (first, second) = sorted_pair(&self.table, &target_table);
                    let (first_column, second_column) = (junction_column(first), junction_column(second));
                    Some(
                        CreateTable::new(table)
                            .if_not_exists()
                            .column(ColumnDefinition::int(first_column.clone()))
                            .column(ColumnDefinition::int(second_column.clone()))
                            .foreign_key(&first_column, first, OnDelete::Cascade)
                            .foreign_key(&second_column, second, OnDelete::Cascade)
                            .unique([first_column, second_column]),
                    )
                }
                RelationMeta::Managed { .. } => None,
            })
            .collect()
    }

    /// Entity-log triggers of this table.
    #[must_use]
    pub fn triggers(&self) -> Vec<CreateTrigger> {
        entity_log::triggers(&self.table, &self.entity_log)
    }

    /// Column values written for `record`.
    ///
    /// A field the record does not carry, or carries as NULL on a NOT NULL
    /// column, is uninitialized: NULL when nullable, else its default. On
    /// insert a field without either is an error, on update it is skipped.
    pub(crate) fn row_values(
        &self,
        record: &EntityRecord,
        action: RowAction,
        fields: Option<&[String]>,
    ) -> Result<Vec<(String, Expression)>, OrmError> {
        let mut row = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            if let Some(fields) = fields {
                if !fields.iter().any(|f| *f == column.property) {
                    continue;
                }
            }
            let value = record.get(&column.property).and_then(|value| {
                if value.is_null() && !column.is_nullable() {
                    None
                } else {
                    value.to_expression()
                }
            });
            let value = match value {
                Some(value) => value,
                None if action == RowAction::Update => continue,
                None if column.is_nullable() => Expression::Value(SqlValue::Null),
                None => match &column.default {
                    Some(FieldDefault::Value(value)) => Expression::Value(value.clone()),
                    Some(FieldDefault::Now) => Expression::CurrentTimestamp,
                    Some(FieldDefault::With(constructor)) => match constructor().to_expression() {
                        Some(value) => value,
                        None => continue,
                    },
                    None => {
                        return Err(OrmError::Uninitialized {
                            entity: self.table.clone(),
                            field: column.property.clone(),
                        })
                    }
                },
            };
            row.push((column.name().to_owned(), value));
        }
        Ok(row)
    }

    /// INSERT of `records`; the column list follows the first record.
    ///
    /// # Errors
    ///
    /// [`OrmError::Uninitialized`] for a NOT NULL field without value or
    /// default.
    pub fn insert_statement(&self, records: &[EntityRecord]) -> Result<Insert, OrmError> {
        let mut insert = Insert::into(&self.table);
        for (index, record) in records.iter().enumerate() {
            let mut row = self.row_values(record, RowAction::Insert, None)?;
            if let Some(id) = record.id() {
                row.insert(0, (String::from("id"), Expression::from(id)));
            }
            if row.is_empty() {
                insert = insert.default_row();
                continue;
            }
            if index == 0 {
                insert = insert.columns(row.iter().map(|(column, _)| column.clone()));
            }
            insert = insert.values(row.into_iter().map(|(_, value)| value));
        }
        Ok(insert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_sql_core::dialect::MySqlDialect;

    struct Group;
    struct User;

    fn describe_group() -> EntityDescriptor {
        EntityDescriptor::new("Group").field(Field::text("name").max_length(32).unique())
    }

    fn describe_user() -> EntityDescriptor {
        EntityDescriptor::new("User")
            .field(Field::text("fullName").max_length(64))
            .field(Field::bool("active"))
            .field(Field::reference_to("group", EntityRef::new::<Group>(describe_group)).nullable())
            .field(Field::many_to("groups", EntityRef::new::<Group>(describe_group)))
            .unique(["fullName", "group"])
    }

    fn user() -> EntityMetadata {
        EntityMetadata::derive(EntityRef::new::<User>(describe_user)).unwrap()
    }

    #[test]
    fn test_columns_and_constraints() {
        let metadata = user();
        assert_eq!(metadata.table(), "User");
        let names: Vec<&str> = metadata.columns().iter().map(ColumnMeta::name).collect();
        assert_eq!(names, ["full_name", "active", "group_id"]);
        assert_eq!(
            metadata.qualified_columns(),
            ["User.id", "User.full_name", "User.active", "User.group_id"]
        );
        assert_eq!(
            metadata.constraints(),
            [
                Constraint::foreign_key("group_id", "Group", "id", OnDelete::SetNull)
                    .named("fk_User_Group_group_id"),
                Constraint::unique(["full_name", "group_id"]),
            ]
        );
    }

    #[test]
    fn test_bool_defaults_to_false() {
        let metadata = user();
        let active = metadata.column("active").unwrap();
        assert_eq!(active.definition.default, Some(DefaultValue::Boolean(false)));
    }

    #[test]
    fn test_create_table_mysql() {
        let query = user().create_table().build(&MySqlDialect).unwrap();
        assert_eq!(
            query.sql,
            "CREATE TABLE IF NOT EXISTS `User` (`id` INTEGER AUTO_INCREMENT NOT NULL, \
             `full_name` VARCHAR(64) NOT NULL, `active` BOOLEAN NOT NULL DEFAULT FALSE, \
             `group_id` INT DEFAULT NULL, CONSTRAINT `pk_User` PRIMARY KEY (`id`), \
             CONSTRAINT `fk_User_Group_group_id` FOREIGN KEY (`group_id`) REFERENCES `Group` (`id`) ON DELETE SET NULL, \
             UNIQUE (`full_name`, `group_id`))"
        );
    }

    #[test]
    fn test_insert_requires_initialized_fields() {
        let metadata = user();
        let record = EntityRecord::new("User").with("active", true);
        assert!(matches!(
            metadata.insert_statement(&[record]),
            Err(OrmError::Uninitialized { field, .. }) if field == "fullName"
        ));

        let record = EntityRecord::new("User").with("fullName", "alice");
        let query = metadata
            .insert_statement(&[record])
            .unwrap()
            .build(&MySqlDialect)
            .unwrap();
        assert_eq!(
            query.sql,
            "INSERT INTO `User` (`full_name`, `active`, `group_id`) VALUES (?, ?, ?)"
        );
        assert_eq!(
            query.params,
            vec![SqlValue::Text("alice".into()), SqlValue::Bool(false), SqlValue::Null]
        );
    }

    #[test]
    fn test_update_skips_uninitialized() {
        let metadata = user();
        let record = EntityRecord::new("User").with_id(3).with("active", true);
        let row = metadata.row_values(&record, RowAction::Update, None).unwrap();
        assert_eq!(row, vec![(String::from("active"), Expression::from(true))]);
    }

    #[test]
    fn test_transient_fields_are_not_columns() {
        struct Cache;
        fn describe() -> EntityDescriptor {
            EntityDescriptor::new("Cache")
                .field(Field::text("key"))
                .field(Field::attributes("scratch").transient())
        }
        let metadata = EntityMetadata::derive(EntityRef::new::<Cache>(describe)).unwrap();
        assert_eq!(metadata.columns().len(), 1);
        assert_eq!(metadata.properties().len(), 2);
    }
}
