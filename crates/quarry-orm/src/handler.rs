//! Persistence operations of one entity.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use quarry_sql_core::ast::{col, Condition, UpdateStrategy};
use quarry_sql_core::{BuiltQuery, Delete, Filtered, Insert, Returning, Select, SqlValue, Update};
use tracing::debug;

use crate::connection::{Connection, Row};
use crate::entity::Entity;
use crate::error::{ExecutionError, OrmError, Result};
use crate::hydrate::{hydrate, Selection};
use crate::metadata::{EntityMetadata, RelationMeta, RowAction};
use crate::pagination::{Page, PageWindow, ValidatedPage};
use crate::query::{EntityQuery, FetchMode, QueryContext};
use crate::record::{EntityRecord, FieldValue};
use crate::registry::EntityRegistry;
use crate::relation::RelationHandle;
use crate::serialize::{self, sql_to_json, Projection, Viewer};

/// What [`EntityHandler::save`] writes besides the record's own columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Properties written on update; all when `None`.
    pub fields: Option<Vec<String>>,
    /// Synchronizes many-to-many relations on update.
    pub relations: bool,
}

impl SaveOptions {
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn with_relations(mut self) -> Self {
        self.relations = true;
        self
    }
}

fn execute(conn: &mut dyn Connection, query: &BuiltQuery) -> Result<u64> {
    debug!(sql = %query.shape, params = query.params.len(), "Executing statement");
    Ok(conn.execute(query)?)
}

fn fetch_rows(conn: &mut dyn Connection, query: &BuiltQuery) -> Result<Vec<Row>> {
    debug!(sql = %query.shape, params = query.params.len(), "Fetching rows");
    Ok(conn.fetch(query)?)
}

fn read_count(conn: &mut dyn Connection, select: Select) -> Result<i64> {
    let query = select.build(conn.dialect())?;
    let rows = fetch_rows(conn, &query)?;
    Ok(rows
        .first()
        .and_then(|row| row.get("count"))
        .and_then(SqlValue::as_i64)
        .unwrap_or(0))
}

/// Queries and statements of one entity.
#[derive(Debug, Clone)]
pub struct EntityHandler<'r> {
    registry: &'r EntityRegistry,
    metadata: Arc<EntityMetadata>,
}

impl<'r> EntityHandler<'r> {
    pub(crate) fn new(registry: &'r EntityRegistry, metadata: Arc<EntityMetadata>) -> Self {
        Self { registry, metadata }
    }

    #[must_use]
    pub const fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    #[must_use]
    pub const fn registry(&self) -> &'r EntityRegistry {
        self.registry
    }

    fn qualified_id(&self) -> String {
        format!("{}.id", self.metadata.table())
    }

    /// An entity query loading what `fetch` asks for.
    ///
    /// # Errors
    ///
    /// The metadata error of a referenced entity.
    pub fn create_builder(&self, fetch: FetchMode) -> Result<EntityQuery> {
        Ok(EntityQuery::new(Arc::clone(&self.metadata)).with_references(self.registry, fetch)?)
    }

    /// INSERT of `record`, returning the generated id when it has none.
    ///
    /// # Errors
    ///
    /// [`OrmError::Uninitialized`] for a NOT NULL field without value or
    /// default.
    pub fn insert_query(&self, record: &EntityRecord) -> Result<Insert> {
        let insert = self.metadata.insert_statement(std::slice::from_ref(record))?;
        Ok(if record.id().is_none() {
            insert.returning(["id"])
        } else {
            insert
        })
    }

    /// UPDATE of `record` by id; `None` when no field is written.
    ///
    /// # Errors
    ///
    /// [`OrmError::MissingId`] for a record without id.
    pub fn update_query(&self, record: &EntityRecord, fields: Option<&[String]>) -> Result<Option<Update>> {
        let id = self.require_id(record)?;
        let row = self.metadata.row_values(record, RowAction::Update, fields)?;
        if row.is_empty() {
            return Ok(None);
        }
        let update = row
            .into_iter()
            .fold(Update::table(self.metadata.table()), |update, (column, value)| {
                update.set(&column, value)
            });
        Ok(Some(update.where_eq("id", id)))
    }

    #[must_use]
    pub fn delete_query(&self, id: i64) -> Delete {
        Delete::from(self.metadata.table()).where_eq("id", id)
    }

    fn require_id(&self, record: &EntityRecord) -> Result<i64> {
        record.id().ok_or_else(|| OrmError::MissingId {
            entity: self.metadata.table().to_owned(),
        })
    }

    /// Inserts `record` with its relations and stores the new id in it.
    ///
    /// # Errors
    ///
    /// Build, execution or uninitialized-field errors.
    pub fn insert(&self, conn: &mut dyn Connection, record: &mut EntityRecord) -> Result<i64> {
        let query = self.insert_query(record)?.build(conn.dialect())?;
        let id = match (record.id(), &query.returning) {
            (Some(id), _) => {
                execute(conn, &query)?;
                id
            }
            (None, Returning::Rows(_)) => fetch_rows(conn, &query)?
                .first()
                .and_then(|row| row.get("id"))
                .and_then(SqlValue::as_i64)
                .ok_or_else(|| ExecutionError::new(query.shape.clone(), "no generated key returned"))?,
            (None, _) => {
                execute(conn, &query)?;
                conn.last_insert_id()
                    .ok_or_else(|| ExecutionError::new(query.shape.clone(), "no generated key returned"))?
            }
        };
        record.set_id(Some(id));
        debug!(entity = self.metadata.table(), id, "Inserted record");
        self.insert_relations(conn, record)?;
        Ok(id)
    }

    /// Updates `record` by id.
    ///
    /// # Errors
    ///
    /// [`OrmError::MissingId`], build or execution errors.
    pub fn update(&self, conn: &mut dyn Connection, record: &EntityRecord, options: &SaveOptions) -> Result<()> {
        if let Some(update) = self.update_query(record, options.fields.as_deref())? {
            let query = update.build(conn.dialect())?;
            execute(conn, &query)?;
        }
        if options.relations {
            self.update_relations(conn, record)?;
        }
        Ok(())
    }

    /// Inserts a record without id, updates it otherwise.
    ///
    /// # Errors
    ///
    /// As [`Self::insert`] and [`Self::update`].
    pub fn save(&self, conn: &mut dyn Connection, record: &mut EntityRecord, options: &SaveOptions) -> Result<i64> {
        match record.id() {
            None => self.insert(conn, record),
            Some(id) => {
                self.update(conn, record, options)?;
                Ok(id)
            }
        }
    }

    /// Deletes the row `id`; `false` when there was none.
    ///
    /// # Errors
    ///
    /// Build or execution errors.
    pub fn delete(&self, conn: &mut dyn Connection, id: i64) -> Result<bool> {
        let query = self.delete_query(id).build(conn.dialect())?;
        Ok(execute(conn, &query)? > 0)
    }

    /// The record `id`, without relations.
    ///
    /// # Errors
    ///
    /// Build, execution or hydration errors.
    pub fn find(&self, conn: &mut dyn Connection, id: i64) -> Result<Option<EntityRecord>> {
        let query = self
            .create_builder(FetchMode::None)?
            .where_eq(&self.qualified_id(), id)
            .limit(1);
        Ok(self.fetch(conn, &query, None)?.into_iter().next())
    }

    /// The record `id`.
    ///
    /// # Errors
    ///
    /// [`OrmError::NotFound`] when there is none.
    pub fn get(&self, conn: &mut dyn Connection, id: i64) -> Result<EntityRecord> {
        self.find(conn, id)?.ok_or_else(|| OrmError::NotFound {
            entity: self.metadata.table().to_owned(),
            id,
        })
    }

    /// Records matching `condition`, every record without one.
    ///
    /// # Errors
    ///
    /// Build, execution or hydration errors.
    pub fn find_all(&self, conn: &mut dyn Connection, condition: Option<Condition>) -> Result<Vec<EntityRecord>> {
        let mut query = self.create_builder(FetchMode::None)?;
        if let Some(condition) = condition {
            query = query.filter(condition);
        }
        self.fetch(conn, &query, None)
    }

    /// Number of records matching `condition`.
    ///
    /// # Errors
    ///
    /// Build or execution errors.
    pub fn count(&self, conn: &mut dyn Connection, condition: Option<Condition>) -> Result<i64> {
        let mut query = self.create_builder(FetchMode::None)?;
        if let Some(condition) = condition {
            query = query.filter(condition);
        }
        read_count(conn, query.count_select())
    }

    /// Whether the record `id` exists.
    ///
    /// # Errors
    ///
    /// Build or execution errors.
    pub fn exists(&self, conn: &mut dyn Connection, id: i64) -> Result<bool> {
        Ok(self.count(conn, Some(col(&self.qualified_id()).eq(id)))? > 0)
    }

    /// Runs `query` and hydrates its rows.
    ///
    /// Records found in `context` are reused instead of hydrated again and
    /// new ones are added to it. Relations are loaded unless the query's
    /// fetch mode is [`FetchMode::None`].
    ///
    /// # Errors
    ///
    /// Build, execution or hydration errors.
    pub fn fetch(
        &self,
        conn: &mut dyn Connection,
        query: &EntityQuery,
        mut context: Option<&mut QueryContext>,
    ) -> Result<Vec<EntityRecord>> {
        let built = query.build(conn.dialect())?;
        let rows = fetch_rows(conn, &built)?;
        let selection = query
            .selected_properties()
            .map_or(Selection::All, Selection::Only);
        let recursive = query.fetch_mode() == FetchMode::Recursive;
        let table = self.metadata.table();

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = row.get("id").and_then(SqlValue::as_i64);
            let cached = match (context.as_deref(), id) {
                (Some(context), Some(id)) => context.get(table, id).cloned(),
                _ => None,
            };
            if let Some(record) = cached {
                records.push(record);
                continue;
            }
            let mut record = hydrate(&self.metadata, row, selection, query.joined(), recursive)?;
            for name in query.custom_names() {
                if let Some(value) = row.get(name) {
                    record.set_extra(name, sql_to_json(value));
                }
            }
            records.push(record);
        }

        if query.fetch_mode() != FetchMode::None {
            self.fetch_relations(conn, &mut records, recursive)?;
        }
        if let Some(context) = context.as_deref_mut() {
            for record in &records {
                context.insert(record.clone());
            }
        }
        Ok(records)
    }

    /// First record of `query`.
    ///
    /// # Errors
    ///
    /// As [`Self::fetch`].
    pub fn fetch_one(&self, conn: &mut dyn Connection, query: &EntityQuery) -> Result<Option<EntityRecord>> {
        Ok(self.fetch(conn, query, None)?.into_iter().next())
    }

    /// Fills the relation handles of `records`; with `recursive`, also those
    /// of their loaded references.
    ///
    /// # Errors
    ///
    /// Build, execution or metadata errors.
    pub fn fetch_relations(&self, conn: &mut dyn Connection, records: &mut [EntityRecord], recursive: bool) -> Result<()> {
        let ids: Vec<i64> = records.iter().filter_map(EntityRecord::id).collect();
        if ids.is_empty() {
            return Ok(());
        }
        for relation in self.metadata.relations() {
            let (this, other) = (relation.this_column(), relation.other_column());
            let query = Select::from(relation.table())
                .columns([this, other])
                .where_in(this, ids.iter().copied())
                .build(conn.dialect())?;
            let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
            for row in fetch_rows(conn, &query)? {
                let owner = row.get(this).and_then(SqlValue::as_i64);
                let related = row.get(other).and_then(SqlValue::as_i64);
                if let (Some(owner), Some(related)) = (owner, related) {
                    grouped.entry(owner).or_default().push(related);
                }
            }
            for record in records.iter_mut() {
                let related = record
                    .id()
                    .and_then(|id| grouped.remove(&id))
                    .unwrap_or_default();
                record.set(relation.property(), RelationHandle::new(related));
            }
        }

        if recursive {
            for record in records.iter_mut() {
                for reference in self.metadata.references() {
                    if let Some(FieldValue::Reference(nested)) = record.get_mut(&reference.property) {
                        self.registry.handler_for(reference.target)?.fetch_relations(
                            conn,
                            std::slice::from_mut(&mut **nested),
                            true,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes the relation ids the record carries.
    ///
    /// Junction rows are upserted; rows of a managed table are only
    /// inserted when missing.
    ///
    /// # Errors
    ///
    /// [`OrmError::MissingId`], build or execution errors.
    pub fn insert_relations(&self, conn: &mut dyn Connection, record: &EntityRecord) -> Result<()> {
        let id = self.require_id(record)?;
        for relation in self.metadata.relations() {
            let Some(handle) = record.relation(relation.property()) else {
                continue;
            };
            if handle.is_empty() {
                continue;
            }
            let (this, other) = (relation.this_column(), relation.other_column());
            let missing: Vec<i64> = match relation {
                RelationMeta::Junction { .. } => handle.ids().to_vec(),
                RelationMeta::Managed { .. } => {
                    let query = Select::from(relation.table())
                        .column(other)
                        .where_eq(this, id)
                        .where_in(other, handle.ids().iter().copied())
                        .build(conn.dialect())?;
                    let existing: Vec<i64> = fetch_rows(conn, &query)?
                        .iter()
                        .filter_map(|row| row.get(other).and_then(SqlValue::as_i64))
                        .collect();
                    handle
                        .ids()
                        .iter()
                        .copied()
                        .filter(|related| !existing.contains(related))
                        .collect()
                }
            };
            if missing.is_empty() {
                continue;
            }
            let mut insert = missing
                .iter()
                .fold(Insert::into(relation.table()).columns([this, other]), |insert, related| {
                    insert.values([id, *related])
                });
            if !relation.is_managed() {
                insert = insert.on_conflict(UpdateStrategy::on([this, other]).set_from_insert(this));
            }
            let query = insert.build(conn.dialect())?;
            execute(conn, &query)?;
        }
        Ok(())
    }

    /// Makes the stored relation rows match the ids the record carries.
    ///
    /// # Errors
    ///
    /// [`OrmError::MissingId`], build or execution errors.
    pub fn update_relations(&self, conn: &mut dyn Connection, record: &EntityRecord) -> Result<()> {
        let id = self.require_id(record)?;
        for relation in self.metadata.relations() {
            let Some(handle) = record.relation(relation.property()) else {
                continue;
            };
            let mut delete = Delete::from(relation.table()).where_eq(relation.this_column(), id);
            if !handle.is_empty() {
                delete = delete.filter(
                    col(relation.other_column()).not_in_list(handle.ids().iter().copied()),
                );
            }
            let query = delete.build(conn.dialect())?;
            execute(conn, &query)?;
        }
        self.insert_relations(conn, record)
    }

    /// One page of `query`, ordered and sliced as `page` asks.
    ///
    /// # Errors
    ///
    /// As [`Self::fetch`].
    pub fn find_page(&self, conn: &mut dyn Connection, query: EntityQuery, page: &ValidatedPage) -> Result<Page<EntityRecord>> {
        let total = read_count(conn, query.count_select())?;
        let window = PageWindow::new(total, page.page, page.page_size);
        let mut query = query;
        if let Some(order) = &page.order_by {
            let selected = query.to_select().selected_names();
            let column = order.resolve(&selected, self.metadata.table());
            query = query.order_by(&column, page.sort_order);
        }
        let query = query.limit(page.page_size).offset(window.offset);
        let items = self.fetch(conn, &query, None)?;
        Ok(Page {
            items,
            pagination: window.info(),
        })
    }

    /// JSON form of `record` as `viewer` may see it.
    ///
    /// # Errors
    ///
    /// The metadata error of a nested reference.
    pub fn serialize(
        &self,
        record: &EntityRecord,
        viewer: Option<&Viewer>,
        projection: Option<&Projection>,
    ) -> Result<serde_json::Value> {
        serialize::serialize(self.registry, &self.metadata, record, viewer, projection)
    }
}

/// Typed access to the records of `T`.
#[derive(Debug, Clone)]
pub struct Repository<'r, T> {
    handler: EntityHandler<'r>,
    marker: PhantomData<fn() -> T>,
}

impl<'r, T: Entity> Repository<'r, T> {
    #[must_use]
    pub(crate) fn new(handler: EntityHandler<'r>) -> Self {
        Self {
            handler,
            marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn handler(&self) -> &EntityHandler<'r> {
        &self.handler
    }

    fn typed(records: Vec<EntityRecord>) -> Result<Vec<T>> {
        records
            .iter()
            .map(|record| T::from_record(record).map_err(OrmError::from))
            .collect()
    }

    /// # Errors
    ///
    /// As [`EntityHandler::find`], or a hydration error.
    pub fn find(&self, conn: &mut dyn Connection, id: i64) -> Result<Option<T>> {
        self.handler
            .find(conn, id)?
            .map(|record| T::from_record(&record).map_err(OrmError::from))
            .transpose()
    }

    /// # Errors
    ///
    /// [`OrmError::NotFound`] when there is none.
    pub fn get(&self, conn: &mut dyn Connection, id: i64) -> Result<T> {
        Ok(T::from_record(&self.handler.get(conn, id)?)?)
    }

    /// The entities with the given ids, in the order of `ids`; unknown ids
    /// are skipped.
    ///
    /// # Errors
    ///
    /// As [`EntityHandler::fetch`].
    pub fn find_many(&self, conn: &mut dyn Connection, ids: &[i64]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = self
            .handler
            .create_builder(FetchMode::None)?
            .where_in(&self.handler.qualified_id(), ids.iter().copied());
        let mut records = self.handler.fetch(conn, &query, None)?;
        records.sort_by_key(|record| {
            record
                .id()
                .and_then(|id| ids.iter().position(|candidate| *candidate == id))
        });
        Self::typed(records)
    }

    /// # Errors
    ///
    /// As [`EntityHandler::find_all`].
    pub fn find_all(&self, conn: &mut dyn Connection, condition: Option<Condition>) -> Result<Vec<T>> {
        Self::typed(self.handler.find_all(conn, condition)?)
    }

    /// Entities of a query built with [`EntityHandler::create_builder`].
    ///
    /// # Errors
    ///
    /// As [`EntityHandler::fetch`].
    pub fn find_by(&self, conn: &mut dyn Connection, query: &EntityQuery) -> Result<Vec<T>> {
        Self::typed(self.handler.fetch(conn, query, None)?)
    }

    /// Saves `entity` and stores its id.
    ///
    /// # Errors
    ///
    /// As [`EntityHandler::save`].
    pub fn save(&self, conn: &mut dyn Connection, entity: &mut T, options: &SaveOptions) -> Result<i64> {
        let mut record = entity.to_record();
        let id = self.handler.save(conn, &mut record, options)?;
        entity.set_id(id);
        Ok(id)
    }

    /// # Errors
    ///
    /// [`OrmError::MissingId`] for an unsaved entity.
    pub fn delete(&self, conn: &mut dyn Connection, entity: &T) -> Result<bool> {
        let id = entity.id().ok_or_else(|| OrmError::MissingId {
            entity: self.handler.metadata().table().to_owned(),
        })?;
        self.handler.delete(conn, id)
    }

    /// # Errors
    ///
    /// As [`EntityHandler::count`].
    pub fn count(&self, conn: &mut dyn Connection, condition: Option<Condition>) -> Result<i64> {
        self.handler.count(conn, condition)
    }

    /// # Errors
    ///
    /// As [`EntityHandler::exists`].
    pub fn exists(&self, conn: &mut dyn Connection, id: i64) -> Result<bool> {
        self.handler.exists(conn, id)
    }
}
