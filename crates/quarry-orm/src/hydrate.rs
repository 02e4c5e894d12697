//! Turning result rows into records.

use chrono::DateTime;
use quarry_sql_core::{ColumnType, SqlValue};

use crate::connection::Row;
use crate::entity::{parse_datetime, unparsable};
use crate::error::HydrationError;
use crate::metadata::{ColumnKind, ColumnMeta, EntityMetadata};
use crate::query::JoinedReference;
use crate::record::{EntityRecord, FieldValue};
use crate::relation::RelationHandle;

/// Which columns a row is expected to carry.
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    All,
    /// The listed properties.
    Only(&'a [String]),
    /// Every column except references; joined rows of a direct fetch.
    Scalars,
}

impl Selection<'_> {
    fn includes(&self, column: &ColumnMeta) -> bool {
        match self {
            Self::All => true,
            Self::Only(properties) => properties.iter().any(|p| *p == column.property),
            Self::Scalars => column.kind != ColumnKind::Reference,
        }
    }
}

fn missing(metadata: &EntityMetadata, column: &str) -> HydrationError {
    HydrationError::MissingColumn {
        entity: metadata.table().to_owned(),
        column: String::from(column),
    }
}

fn mismatch(metadata: &EntityMetadata, column: &str, expected: &'static str, found: &SqlValue) -> HydrationError {
    HydrationError::TypeMismatch {
        entity: metadata.table().to_owned(),
        column: String::from(column),
        expected,
        found: String::from(found.kind()),
    }
}

/// Builds a record of `metadata` from `row`.
///
/// Joined references whose key is not NULL are hydrated from their prefixed
/// columns; other references keep their id. Relations start empty.
///
/// # Errors
///
/// [`HydrationError::MissingColumn`] when the row lacks `id` or a selected
/// column, or a conversion error naming the column.
pub fn hydrate(
    metadata: &EntityMetadata,
    row: &Row,
    selection: Selection<'_>,
    joined: &[JoinedReference],
    recursive: bool,
) -> Result<EntityRecord, HydrationError> {
    let id = row.get("id").ok_or_else(|| missing(metadata, "id"))?;
    let id = id.as_i64().ok_or_else(|| mismatch(metadata, "id", "integer", id))?;
    let mut record = EntityRecord::new(metadata.table()).with_id(id);

    for column in metadata.columns() {
        if !selection.includes(column) {
            continue;
        }
        let value = row
            .get(column.name())
            .ok_or_else(|| missing(metadata, column.name()))?;
        let field = match column.kind {
            ColumnKind::Reference => {
                let join = joined.iter().find(|j| j.property == column.property);
                match (join, value) {
                    (_, SqlValue::Null) => FieldValue::Scalar(SqlValue::Null),
                    (Some(join), _) => {
                        let nested_selection = if recursive {
                            Selection::All
                        } else {
                            Selection::Scalars
                        };
                        let nested = hydrate(
                            &join.metadata,
                            &row.prefixed(&join.prefix),
                            nested_selection,
                            &join.nested,
                            recursive,
                        )?;
                        FieldValue::Reference(Box::new(nested))
                    }
                    (None, value) => FieldValue::ReferenceId(
                        value
                            .as_i64()
                            .ok_or_else(|| mismatch(metadata, column.name(), "integer", value))?,
                    ),
                }
            }
            ColumnKind::DateTime => read_datetime(metadata, column, value)?,
            ColumnKind::Json => match value {
                SqlValue::Text(text) => FieldValue::Json(
                    serde_json::from_str(text)
                        .map_err(|e| unparsable(metadata.table(), column.name(), e))?,
                ),
                SqlValue::Null => FieldValue::Scalar(SqlValue::Null),
                other => return Err(mismatch(metadata, column.name(), "json", other)),
            },
            ColumnKind::Scalar if column.definition.column_type == ColumnType::Bool => match value {
                SqlValue::Null => FieldValue::Scalar(SqlValue::Null),
                other => FieldValue::Scalar(SqlValue::Bool(
                    other
                        .as_bool()
                        .ok_or_else(|| mismatch(metadata, column.name(), "bool", other))?,
                )),
            },
            ColumnKind::Scalar => FieldValue::Scalar(value.clone()),
        };
        record.set(&column.property, field);
    }

    for relation in metadata.relations() {
        record.set(relation.property(), RelationHandle::default());
    }
    Ok(record)
}

fn read_datetime(metadata: &EntityMetadata, column: &ColumnMeta, value: &SqlValue) -> Result<FieldValue, HydrationError> {
    match value {
        SqlValue::Null => Ok(FieldValue::Scalar(SqlValue::Null)),
        SqlValue::Text(text) => parse_datetime(text)
            .map(FieldValue::DateTime)
            .map_err(|e| unparsable(metadata.table(), column.name(), e)),
        SqlValue::Int(seconds) => DateTime::from_timestamp(*seconds, 0)
            .map(|datetime| FieldValue::DateTime(datetime.naive_utc()))
            .ok_or_else(|| unparsable(metadata.table(), column.name(), format!("timestamp {seconds} is out of range"))),
        other => Err(mismatch(metadata, column.name(), "datetime", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EntityDescriptor, EntityRef, Field};

    struct Event;

    fn event() -> EntityDescriptor {
        EntityDescriptor::new("Event")
            .field(Field::text("title"))
            .field(Field::bool("public"))
            .field(Field::datetime("startsAt").nullable())
            .field(Field::json_document("payload").nullable())
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::derive(EntityRef::new::<Event>(event)).unwrap()
    }

    #[test]
    fn test_hydrate_converts_columns() {
        let row = Row::from_pairs([
            ("id", SqlValue::Int(4)),
            ("title", SqlValue::Text("launch".into())),
            ("public", SqlValue::Int(1)),
            ("starts_at", SqlValue::Text("2024-05-01 10:00:00".into())),
            ("payload", SqlValue::Text(r#"{"seats":3}"#.into())),
        ]);
        let record = hydrate(&metadata(), &row, Selection::All, &[], false).unwrap();
        assert_eq!(record.id(), Some(4));
        assert_eq!(record.get("public"), Some(&FieldValue::Scalar(SqlValue::Bool(true))));
        assert!(matches!(record.get("startsAt"), Some(FieldValue::DateTime(_))));
        assert_eq!(
            record.get("payload"),
            Some(&FieldValue::Json(serde_json::json!({"seats": 3})))
        );
    }

    #[test]
    fn test_missing_column_is_named() {
        let row = Row::from_pairs([("id", SqlValue::Int(4)), ("title", SqlValue::Text("x".into()))]);
        assert_eq!(
            hydrate(&metadata(), &row, Selection::All, &[], false),
            Err(HydrationError::MissingColumn {
                entity: "Event".into(),
                column: "public".into(),
            })
        );
        let only = [String::from("title")];
        assert!(hydrate(&metadata(), &row, Selection::Only(&only), &[], false).is_ok());
    }

    #[test]
    fn test_unparsable_datetime() {
        let row = Row::from_pairs([
            ("id", SqlValue::Int(4)),
            ("starts_at", SqlValue::Text("soon".into())),
        ]);
        let only = [String::from("startsAt")];
        assert!(matches!(
            hydrate(&metadata(), &row, Selection::Only(&only), &[], false),
            Err(HydrationError::Unparsable { column, .. }) if column == "starts_at"
        ));
    }
}
