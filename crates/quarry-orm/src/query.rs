//! Reusable entity queries with reference joins.

use std::collections::HashMap;
use std::sync::Arc;

use quarry_sql_core::ast::{col, count_all, Condition, Expression};
use quarry_sql_core::builder::{JoinType, SortOrder, TableRef};
use quarry_sql_core::{BuiltQuery, Dialect, Filtered, Select};

use crate::error::{MetadataError, Result};
use crate::metadata::EntityMetadata;
use crate::naming::reference_prefix;
use crate::record::EntityRecord;
use crate::registry::EntityRegistry;

/// How much of a record's graph a query loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Own columns only; references stay ids.
    #[default]
    None,
    /// Joins direct references and loads relation ids.
    Direct,
    /// Joins references of references, with each table joined once.
    Recursive,
}

/// Records already hydrated, keyed by table and id.
#[derive(Debug, Default)]
pub struct QueryContext {
    cache: HashMap<(String, i64), EntityRecord>,
}

impl QueryContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, table: &str, id: i64) -> Option<&EntityRecord> {
        self.cache.get(&(String::from(table), id))
    }

    /// Caches a record; records without id are ignored.
    pub fn insert(&mut self, record: EntityRecord) {
        if let Some(id) = record.id() {
            self.cache.insert((record.entity().to_owned(), id), record);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// A reference joined into an entity query.
#[derive(Debug, Clone)]
pub struct JoinedReference {
    pub property: String,
    /// Prefix of the referenced columns in the row, relative to the owner.
    pub prefix: String,
    pub metadata: Arc<EntityMetadata>,
    pub nested: Vec<JoinedReference>,
}

/// A SELECT over one entity, reusable across executions.
///
/// Selects `Table.id` and every column of the entity; reference joins add
/// the referenced columns under prefixed aliases.
#[derive(Debug, Clone)]
pub struct EntityQuery {
    metadata: Arc<EntityMetadata>,
    base: Select,
    join_columns: Vec<Expression>,
    fetch: FetchMode,
    joined: Vec<JoinedReference>,
    only: Option<Vec<String>>,
    custom: Vec<(String, Expression)>,
}

impl EntityQuery {
    #[must_use]
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        let base = Select::from(metadata.table());
        Self {
            metadata,
            base,
            join_columns: Vec::new(),
            fetch: FetchMode::None,
            joined: Vec::new(),
            only: None,
            custom: Vec::new(),
        }
    }

    /// Adds the joins `fetch` asks for.
    ///
    /// # Errors
    ///
    /// The [`MetadataError`] of a referenced entity.
    pub fn with_references(
        mut self,
        registry: &EntityRegistry,
        fetch: FetchMode,
    ) -> std::result::Result<Self, MetadataError> {
        self.fetch = fetch;
        if fetch == FetchMode::None {
            return Ok(self);
        }
        let mut visited = vec![self.metadata.table().to_owned()];
        let metadata = Arc::clone(&self.metadata);
        let owner = metadata.table().to_owned();
        self.joined =
            self.join_references(registry, &metadata, &owner, "", false, &mut visited)?;
        Ok(self)
    }

    fn join_references(
        &mut self,
        registry: &EntityRegistry,
        metadata: &EntityMetadata,
        qualifier: &str,
        path: &str,
        optional: bool,
        visited: &mut Vec<String>,
    ) -> std::result::Result<Vec<JoinedReference>, MetadataError> {
        let mut joined = Vec::new();
        for reference in metadata.references() {
            if visited.contains(&reference.target_table) {
                continue;
            }
            let target = registry.metadata_of(reference.target)?;
            visited.push(reference.target_table.clone());
            let alias = format!("t{}", visited.len() - 1);
            // Below a LEFT JOIN every join stays LEFT, or owners without
            // the optional reference would drop out of the result.
            let left = optional || reference.nullable;
            let join_type = if left {
                JoinType::Left
            } else {
                JoinType::Inner
            };
            self.base = std::mem::replace(&mut self.base, Select::from(""))
                .join(
                    join_type,
                    TableRef::aliased(target.table(), &alias),
                    col(&format!("{qualifier}.{}", reference.column))
                        .eq(col(&format!("{alias}.id"))),
                );

            let prefix = reference_prefix(&reference.property);
            let full_prefix = format!("{path}{prefix}");
            let recursive = self.fetch == FetchMode::Recursive;
            let selected = std::iter::once("id").chain(
                target
                    .columns()
                    .iter()
                    .filter(|column| recursive || target.reference(&column.property).is_none())
                    .map(|column| column.name()),
            );
            for column in selected {
                self.join_columns.push(
                    col(&format!("{alias}.{column}")).alias(&format!("{full_prefix}{column}")),
                );
            }

            let nested = if recursive {
                self.join_references(registry, &target, &alias, &full_prefix, left, visited)?
            } else {
                Vec::new()
            };
            joined.push(JoinedReference {
                property: reference.property.clone(),
                prefix,
                metadata: target,
                nested,
            });
        }
        Ok(joined)
    }

    /// Restricts the selected properties; `id` is always selected.
    #[must_use]
    pub fn only<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(properties.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn join(mut self, join_type: JoinType, table: TableRef, on: Condition) -> Self {
        self.base = self.base.join(join_type, table, on);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.base = self.base.order_by(column, order);
        self
    }

    #[must_use]
    pub fn order_by_expression(mut self, expression: Expression, order: SortOrder) -> Self {
        self.base = self.base.order_by_expression(expression, order);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.base = self.base.limit(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.base = self.base.offset(offset);
        self
    }

    /// Selects an extra value, attached to each record under `name`.
    #[must_use]
    pub fn custom_value(mut self, name: &str, expression: Expression) -> Self {
        self.custom.push((String::from(name), expression));
        self
    }

    /// Names of the custom values.
    pub fn custom_names(&self) -> impl Iterator<Item = &str> {
        self.custom.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    #[must_use]
    pub const fn fetch_mode(&self) -> FetchMode {
        self.fetch
    }

    #[must_use]
    pub fn joined(&self) -> &[JoinedReference] {
        &self.joined
    }

    #[must_use]
    pub fn selected_properties(&self) -> Option<&[String]> {
        self.only.as_deref()
    }

    fn own_columns(&self) -> Vec<Expression> {
        let table = self.metadata.table();
        let mut columns = vec![col(&format!("{table}.id"))];
        for column in self.metadata.columns() {
            let selected = self
                .only
                .as_ref()
                .map_or(true, |only| only.iter().any(|p| *p == column.property));
            if selected {
                columns.push(col(&format!("{table}.{}", column.name())));
            }
        }
        columns
    }

    /// The complete SELECT.
    #[must_use]
    pub fn to_select(&self) -> Select {
        let mut columns = self.own_columns();
        columns.extend(self.join_columns.iter().cloned());
        columns.extend(
            self.custom
                .iter()
                .map(|(name, expression)| expression.clone().alias(name)),
        );
        columns
            .into_iter()
            .fold(self.base.clone(), Select::expression)
    }

    /// `SELECT COUNT(*) AS count` over the same joins and filters.
    #[must_use]
    pub fn count_select(&self) -> Select {
        self.base.clone().reselect(vec![count_all()])
    }

    /// Compiles the SELECT.
    ///
    /// # Errors
    ///
    /// [`OrmError::Build`](crate::OrmError::Build) for an invalid filter.
    pub fn build(&self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        Ok(self.to_select().build(dialect)?)
    }
}

impl Filtered for EntityQuery {
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        self.base.conditions_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EntityDescriptor, EntityRef, Field};
    use quarry_sql_core::dialect::MySqlDialect;

    struct Country;
    struct City;
    struct Person;

    fn country() -> EntityDescriptor {
        EntityDescriptor::new("Country").field(Field::text("name"))
    }

    fn city() -> EntityDescriptor {
        EntityDescriptor::new("City")
            .field(Field::text("name"))
            .field(Field::reference_to("country", EntityRef::new::<Country>(country)))
    }

    fn person() -> EntityDescriptor {
        EntityDescriptor::new("Person")
            .field(Field::text("name"))
            .field(Field::reference_to("homeCity", EntityRef::new::<City>(city)).nullable())
    }

    fn query(fetch: FetchMode) -> EntityQuery {
        let registry = EntityRegistry::new();
        let metadata = registry.metadata_of(EntityRef::new::<Person>(person)).unwrap();
        EntityQuery::new(metadata)
            .with_references(&registry, fetch)
            .unwrap()
    }

    #[test]
    fn test_plain_select() {
        let sql = query(FetchMode::None).build(&MySqlDialect).unwrap().sql;
        assert_eq!(
            sql,
            "SELECT `Person`.`id`, `Person`.`name`, `Person`.`home_city_id` FROM `Person`"
        );
    }

    #[test]
    fn test_direct_join() {
        let built = query(FetchMode::Direct)
            .where_eq("Person.name", "bob")
            .build(&MySqlDialect)
            .unwrap();
        assert_eq!(
            built.sql,
            "SELECT `Person`.`id`, `Person`.`name`, `Person`.`home_city_id`, \
             `t1`.`id` AS `home_city_id`, `t1`.`name` AS `home_city_name` \
             FROM `Person` LEFT JOIN `City` `t1` ON (`Person`.`home_city_id` = `t1`.`id`) \
             WHERE `Person`.`name` = ?"
        );
    }

    #[test]
    fn test_recursive_join() {
        let query = query(FetchMode::Recursive);
        let sql = query.build(&MySqlDialect).unwrap().sql;
        assert!(sql.contains(
            "LEFT JOIN `Country` `t2` ON (`t1`.`country_id` = `t2`.`id`)"
        ));
        assert!(!sql.contains("INNER JOIN"));
        assert!(sql.contains("`t2`.`name` AS `home_city_country_name`"));
        assert_eq!(query.joined()[0].nested[0].prefix, "country_");
    }

    #[test]
    fn test_count_drops_paging() {
        let sql = query(FetchMode::None)
            .limit(10)
            .offset(20)
            .count_select()
            .build(&MySqlDialect)
            .unwrap()
            .sql;
        assert_eq!(sql, "SELECT COUNT(*) AS `count` FROM `Person`");
    }
}
