//! Values of reference and many-to-many fields.

use crate::connection::Connection;
use crate::entity::Entity;
use crate::error::Result;
use crate::registry::EntityRegistry;

/// A one-to-many reference: the referenced id, or the loaded entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference<T> {
    Id(i64),
    Loaded(Box<T>),
}

impl<T: Entity> Reference<T> {
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Loaded(entity) => entity.id(),
        }
    }

    #[must_use]
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Loaded(entity) => Some(entity),
        }
    }

    #[must_use]
    pub fn into_loaded(self) -> Option<T> {
        match self {
            Self::Id(_) => None,
            Self::Loaded(entity) => Some(*entity),
        }
    }

    /// The referenced entity, loading it when only the id is known.
    ///
    /// # Errors
    ///
    /// Any error of the lookup; [`OrmError::NotFound`](crate::OrmError::NotFound)
    /// for a dangling id.
    pub fn resolve(&self, registry: &EntityRegistry, conn: &mut dyn Connection) -> Result<T>
    where
        T: Clone,
    {
        match self {
            Self::Loaded(entity) => Ok((**entity).clone()),
            Self::Id(id) => registry.repository::<T>()?.get(conn, *id),
        }
    }
}

impl<T> From<T> for Reference<T> {
    fn from(entity: T) -> Self {
        Self::Loaded(Box::new(entity))
    }
}

/// The ids of a many-to-many collection.
///
/// Loading the related entities is explicit, through [`Self::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationHandle {
    ids: Vec<i64>,
}

impl RelationHandle {
    /// Creates a handle; duplicate ids are dropped.
    #[must_use]
    pub fn new<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        let mut handle = Self::default();
        for id in ids {
            handle.add(id);
        }
        handle
    }

    #[must_use]
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn add(&mut self, id: i64) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    pub fn remove(&mut self, id: i64) {
        self.ids.retain(|existing| *existing != id);
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Loads the related entities, in id order of the handle.
    ///
    /// # Errors
    ///
    /// Any error of the lookup.
    pub fn resolve<T: Entity>(
        &self,
        registry: &EntityRegistry,
        conn: &mut dyn Connection,
    ) -> Result<Vec<T>> {
        if self.ids.is_empty() {
            return Ok(Vec::new());
        }
        registry.repository::<T>()?.find_many(conn, &self.ids)
    }
}
