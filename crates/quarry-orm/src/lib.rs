//! # quarry-orm
//!
//! Descriptor-driven entity mapping on top of `quarry-sql-core`.
//!
//! Entities describe their fields once, by hand or with
//! `#[derive(Entity)]`. The [`EntityRegistry`] derives table metadata from
//! these descriptors, once per entity type, and hands out
//! [`EntityHandler`]s that build, run and hydrate queries over any
//! [`Connection`].
//!
//! ## Describing an entity
//!
//! ```rust
//! use quarry_orm::{EntityDescriptor, EntityMetadata, EntityRef, Field};
//! use quarry_sql_core::dialect::PostgresDialect;
//!
//! struct Tag;
//!
//! fn describe_tag() -> EntityDescriptor {
//!     EntityDescriptor::new("Tag")
//!         .field(Field::text("label").max_length(32).unique())
//!         .field(Field::bool("pinned"))
//! }
//!
//! let metadata = EntityMetadata::derive(EntityRef::new::<Tag>(describe_tag)).unwrap();
//! let query = metadata.create_table().build(&PostgresDialect).unwrap();
//!
//! assert_eq!(
//!     query.sql,
//!     r#"CREATE TABLE IF NOT EXISTS "Tag" ("id" SERIAL NOT NULL, "label" VARCHAR(32) NOT NULL, "pinned" BOOLEAN NOT NULL DEFAULT FALSE, CONSTRAINT "pk_Tag" PRIMARY KEY ("id"), UNIQUE ("label"))"#
//! );
//! ```
//!
//! ## Typed entities
//!
//! ```ignore
//! use quarry_orm::{Entity, EntityRegistry, SaveOptions};
//!
//! #[derive(Entity)]
//! struct Tag {
//!     id: Option<i64>,
//!     #[entity(max_length = 32, unique)]
//!     label: String,
//! }
//!
//! let registry = EntityRegistry::new();
//! let tags = registry.repository::<Tag>()?;
//! let mut tag = Tag { id: None, label: "rust".into() };
//! tags.save(&mut conn, &mut tag, &SaveOptions::default())?;
//! ```

pub mod connection;
pub mod descriptor;
pub mod entity;
pub mod entity_log;
pub mod error;
pub mod handler;
pub mod hydrate;
pub mod metadata;
pub mod naming;
pub mod pagination;
pub mod query;
pub mod record;
pub mod registry;
pub mod relation;
pub mod serialize;

pub use connection::{Connection, Row};
pub use descriptor::{EntityDescriptor, EntityRef, Field, FieldDefault, FieldKind, Visibility};
pub use entity::{Entity, FieldType};
pub use entity_log::EntityLogConfig;
pub use error::{ExecutionError, HydrationError, MetadataError, OrmError, PaginationError, Result};
pub use handler::{EntityHandler, Repository, SaveOptions};
pub use metadata::{ColumnKind, ColumnMeta, EntityMetadata, PropertyMeta, ReferenceMeta, RelationMeta};
pub use pagination::{
    OrderColumn, OrderColumns, Page, PageRequest, PageWindow, PaginationConfig, PaginationInfo,
    ValidatedPage,
};
pub use query::{EntityQuery, FetchMode, QueryContext};
pub use record::{EntityRecord, FieldValue};
pub use registry::EntityRegistry;
pub use relation::{Reference, RelationHandle};
pub use serialize::{Projection, Viewer};

/// Derives [`Entity`] for a struct with an `id: Option<i64>` field.
pub use quarry_sql_derive::Entity;
