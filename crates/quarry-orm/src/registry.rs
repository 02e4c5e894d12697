//! Shared cache of derived entity metadata.

use std::any::TypeId;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use quarry_sql_core::Statement;
use tracing::debug;

use crate::descriptor::EntityRef;
use crate::entity::Entity;
use crate::entity_log;
use crate::error::{MetadataError, OrmError};
use crate::handler::{EntityHandler, Repository};
use crate::metadata::EntityMetadata;

type Slot = Arc<OnceLock<Result<Arc<EntityMetadata>, MetadataError>>>;

#[derive(Default)]
struct Arena {
    index: HashMap<TypeId, usize>,
    slots: Vec<(EntityRef, Slot)>,
}

/// Derived metadata, keyed by entity type.
///
/// Each entity is derived at most once, even under concurrent first
/// access; afterwards lookups only take a read lock.
#[derive(Default)]
pub struct EntityRegistry {
    arena: RwLock<Arena>,
    derivations: AtomicUsize,
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("registered", &self.registered())
            .field("derivations", &self.derivation_count())
            .finish()
    }
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, entity: EntityRef) -> Slot {
        {
            let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&index) = arena.index.get(&entity.type_id()) {
                return Arc::clone(&arena.slots[index].1);
            }
        }
        let mut arena = self.arena.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&index) = arena.index.get(&entity.type_id()) {
            return Arc::clone(&arena.slots[index].1);
        }
        let slot = Slot::default();
        let index = arena.slots.len();
        arena.slots.push((entity, Arc::clone(&slot)));
        arena.index.insert(entity.type_id(), index);
        slot
    }

    /// Metadata of `entity`, derived on first access.
    ///
    /// # Errors
    ///
    /// The [`MetadataError`] of the derivation; a failed derivation is
    /// cached like a successful one.
    pub fn metadata_of(&self, entity: EntityRef) -> Result<Arc<EntityMetadata>, MetadataError> {
        let slot = self.slot(entity);
        slot.get_or_init(|| {
            self.derivations.fetch_add(1, Ordering::SeqCst);
            let metadata = EntityMetadata::derive(entity).map(Arc::new);
            match &metadata {
                Ok(metadata) => debug!(
                    entity = metadata.table(),
                    columns = metadata.columns().len(),
                    "Derived entity metadata"
                ),
                Err(e) => debug!(entity = ?entity, error = %e, "Entity metadata rejected"),
            }
            metadata
        })
        .clone()
    }

    /// Metadata of `T`.
    ///
    /// # Errors
    ///
    /// As [`Self::metadata_of`].
    pub fn metadata<T: Entity>(&self) -> Result<Arc<EntityMetadata>, MetadataError> {
        self.metadata_of(EntityRef::of::<T>())
    }

    /// Registers `T` and every entity it mentions.
    ///
    /// # Errors
    ///
    /// The first [`MetadataError`] met.
    pub fn register<T: Entity>(&self) -> Result<Arc<EntityMetadata>, MetadataError> {
        self.register_ref(EntityRef::of::<T>())
    }

    /// Registers `entity` and every entity it mentions.
    ///
    /// # Errors
    ///
    /// The first [`MetadataError`] met.
    pub fn register_ref(&self, entity: EntityRef) -> Result<Arc<EntityMetadata>, MetadataError> {
        let metadata = self.metadata_of(entity)?;
        let mut visited = HashSet::from([entity]);
        let mut queue: VecDeque<EntityRef> = metadata.related_entities().into();
        while let Some(next) = queue.pop_front() {
            if !visited.insert(next) {
                continue;
            }
            queue.extend(self.metadata_of(next)?.related_entities());
        }
        Ok(metadata)
    }

    /// How many derivations ran.
    #[must_use]
    pub fn derivation_count(&self) -> usize {
        self.derivations.load(Ordering::SeqCst)
    }

    /// Registered entities, in registration order.
    #[must_use]
    pub fn registered(&self) -> Vec<EntityRef> {
        let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
        arena.slots.iter().map(|(entity, _)| *entity).collect()
    }

    /// Registered entities ordered so that every table comes after the
    /// tables it references. Ties keep registration order.
    ///
    /// # Errors
    ///
    /// A failed derivation, or [`MetadataError::DependencyCycle`] when
    /// references form a cycle.
    pub fn creation_order(&self) -> Result<Vec<Arc<EntityMetadata>>, MetadataError> {
        let entities = self
            .registered()
            .into_iter()
            .map(|entity| self.metadata_of(entity))
            .collect::<Result<Vec<_>, _>>()?;
        let position: HashMap<EntityRef, usize> = entities
            .iter()
            .enumerate()
            .map(|(index, metadata)| (metadata.entity(), index))
            .collect();

        let mut pending: Vec<usize> = entities
            .iter()
            .map(|metadata| {
                metadata
                    .dependencies()
                    .iter()
                    .filter(|dependency| position.contains_key(dependency))
                    .count()
            })
            .collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); entities.len()];
        for (index, metadata) in entities.iter().enumerate() {
            for dependency in metadata.dependencies() {
                if let Some(&target) = position.get(&dependency) {
                    dependents[target].push(index);
                }
            }
        }

        let mut ordered = Vec::with_capacity(entities.len());
        let mut done = vec![false; entities.len()];
        while ordered.len() < entities.len() {
            let Some(next) = (0..entities.len()).find(|&i| !done[i] && pending[i] == 0) else {
                let entities = (0..entities.len())
                    .filter(|&i| !done[i])
                    .map(|i| entities[i].table().to_owned())
                    .collect();
                return Err(MetadataError::DependencyCycle { entities });
            };
            done[next] = true;
            for &dependent in &dependents[next] {
                pending[dependent] -= 1;
            }
            ordered.push(Arc::clone(&entities[next]));
        }
        Ok(ordered)
    }

    /// Statements creating the whole schema: the entity-log table and
    /// procedures when any entity is logged, then tables in dependency
    /// order, each followed by its predefined rows and entity-log triggers,
    /// then the junction tables.
    ///
    /// # Errors
    ///
    /// [`OrmError::Metadata`] from the ordering, or an uninitialized field
    /// in a predefined row.
    pub fn create_queries(&self) -> Result<Vec<Statement>, OrmError> {
        let order = self.creation_order()?;
        let mut statements = if order.iter().any(|metadata| metadata.entity_log().is_enabled()) {
            self.entity_log_queries()
        } else {
            Vec::new()
        };
        let mut junctions: Vec<String> = Vec::new();
        let mut junction_statements = Vec::new();
        for metadata in &order {
            statements.push(Statement::from(metadata.create_table()));
            if !metadata.predefined().is_empty() {
                statements.push(Statement::from(metadata.insert_statement(metadata.predefined())?));
            }
            if metadata.entity_log().is_enabled() {
                statements.extend(metadata.triggers().into_iter().map(Statement::from));
            }
            for junction in metadata.junction_tables() {
                if !junctions.iter().any(|name| name == junction.name()) {
                    junctions.push(junction.name().to_owned());
                    junction_statements.push(Statement::from(junction));
                }
            }
        }
        statements.extend(junction_statements);
        Ok(statements)
    }

    /// Whether any registered entity writes to the entity log.
    #[must_use]
    pub fn uses_entity_log(&self) -> bool {
        self.registered().into_iter().any(|entity| {
            self.metadata_of(entity)
                .is_ok_and(|metadata| metadata.entity_log().is_enabled())
        })
    }

    /// Statements creating the entity-log table and procedures.
    #[must_use]
    pub fn entity_log_queries(&self) -> Vec<Statement> {
        std::iter::once(Statement::from(entity_log::log_table()))
            .chain(entity_log::procedures().into_iter().map(Statement::from))
            .collect()
    }

    /// Handler of `T`.
    ///
    /// # Errors
    ///
    /// The [`MetadataError`] of its registration.
    pub fn handler<T: Entity>(&self) -> Result<EntityHandler<'_>, MetadataError> {
        self.handler_for(EntityRef::of::<T>())
    }

    /// Handler of `entity`.
    ///
    /// # Errors
    ///
    /// The [`MetadataError`] of its registration.
    pub fn handler_for(&self, entity: EntityRef) -> Result<EntityHandler<'_>, MetadataError> {
        let metadata = self.register_ref(entity)?;
        Ok(EntityHandler::new(self, metadata))
    }

    /// Typed repository of `T`.
    ///
    /// # Errors
    ///
    /// The [`MetadataError`] of its registration.
    pub fn repository<T: Entity>(&self) -> Result<Repository<'_, T>, MetadataError> {
        Ok(Repository::new(self.handler::<T>()?))
    }
}
