//! Ordered, ledger-tracked schema patches for quarry.
//!
//! `quarry-migrate` applies named patches in declaration order, each at
//! most once per database:
//!
//! - **Patches** - named lists of builder statements ([`StatementPatch`]),
//!   including the entity-log setup ([`EntityLogPatch`])
//! - **Ledger** - the `quarry_patches` table recording applied patches
//! - **Sequencer** - runs pending patches and stops at the first failing
//!   statement, reporting the patch and the statement index
//! - **Connection** - a blocking [`quarry_orm::Connection`] over sqlx
//!
//! # Example
//!
//! ```rust
//! use quarry_migrate::{Sequencer, StatementPatch};
//! use quarry_sql_core::dialect::PostgresDialect;
//! use quarry_sql_core::{ColumnDefinition, CreateTable};
//!
//! let sequencer = Sequencer::new()
//!     .with(
//!         StatementPatch::new("0001_tag").statement(
//!             CreateTable::new("Tag")
//!                 .serial_primary_key("id")
//!                 .column(ColumnDefinition::string("label", Some(32))),
//!         ),
//!     )
//!     .unwrap();
//!
//! let rendered = sequencer.render(&PostgresDialect).unwrap();
//! assert_eq!(
//!     rendered[0].queries[0].sql,
//!     r#"CREATE TABLE "Tag" ("id" SERIAL NOT NULL, "label" VARCHAR(32) NOT NULL, CONSTRAINT "pk_Tag" PRIMARY KEY ("id"))"#
//! );
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Create the entity log and the triggers listed in quarry.json
//! quarry-migrate --database-url mysql://root@localhost/app --config quarry.json apply
//!
//! # Print the SQL instead
//! quarry-migrate --dialect postgres --config quarry.json apply --dry-run
//!
//! # Show which patches ran
//! quarry-migrate status
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod ledger;
pub mod patch;
pub mod sequencer;

pub use config::MigrateConfig;
pub use connection::{DialectKind, SqlxConnection};
pub use error::{MigrateError, Result, StatementError};
pub use ledger::{AppliedPatch, Ledger, MemoryLedger, TableLedger, LEDGER_TABLE};
pub use patch::{EntityLogPatch, LoggedTable, Patch, StatementPatch};
pub use sequencer::{ApplyReport, PatchStatus, RenderedPatch, Sequencer};
