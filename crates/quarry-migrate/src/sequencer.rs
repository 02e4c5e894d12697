//! Ordered application of patches.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use quarry_orm::Connection;
use quarry_sql_core::{BuiltQuery, Dialect};
use tracing::{debug, info, warn};

use crate::error::{MigrateError, Result, StatementError};
use crate::ledger::Ledger;
use crate::patch::Patch;

/// Whether a patch has been applied to a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchStatus {
    Applied(Option<NaiveDateTime>),
    Pending,
}

/// Outcome of [`Sequencer::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Patches applied by this run, in order.
    pub applied: Vec<String>,
    /// Patches found in the ledger and left alone.
    pub skipped: Vec<String>,
}

/// The statements of one patch, rendered for a dialect.
#[derive(Debug, Clone)]
pub struct RenderedPatch {
    pub name: String,
    pub queries: Vec<BuiltQuery>,
}

/// Applies patches in declaration order, each at most once per ledger.
#[derive(Default)]
pub struct Sequencer {
    patches: Vec<Box<dyn Patch>>,
}

impl Sequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a patch.
    ///
    /// # Errors
    ///
    /// [`MigrateError::DuplicatePatch`] when a patch of the same name was
    /// already added.
    pub fn add(&mut self, patch: impl Patch + 'static) -> Result<()> {
        if self.patches.iter().any(|known| known.name() == patch.name()) {
            return Err(MigrateError::DuplicatePatch(patch.name().to_owned()));
        }
        self.patches.push(Box::new(patch));
        Ok(())
    }

    /// Appends a patch, builder style.
    ///
    /// # Errors
    ///
    /// See [`Sequencer::add`].
    pub fn with(mut self, patch: impl Patch + 'static) -> Result<Self> {
        self.add(patch)?;
        Ok(self)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.patches.iter().map(|patch| patch.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Status of every patch, in declaration order.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Ledger`] when the ledger cannot be read.
    pub fn status(
        &self,
        conn: &mut dyn Connection,
        ledger: &mut dyn Ledger,
    ) -> Result<Vec<(String, PatchStatus)>> {
        ledger.ensure(conn)?;
        let applied: HashMap<String, Option<NaiveDateTime>> = ledger
            .applied(conn)?
            .into_iter()
            .map(|patch| (patch.name, patch.applied_at))
            .collect();
        Ok(self
            .patches
            .iter()
            .map(|patch| {
                let status = match applied.get(patch.name()) {
                    Some(at) => PatchStatus::Applied(*at),
                    None => PatchStatus::Pending,
                };
                (patch.name().to_owned(), status)
            })
            .collect())
    }

    /// Names of the patches not yet applied, in declaration order.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Ledger`] when the ledger cannot be read.
    pub fn pending(
        &self,
        conn: &mut dyn Connection,
        ledger: &mut dyn Ledger,
    ) -> Result<Vec<String>> {
        Ok(self
            .status(conn, ledger)?
            .into_iter()
            .filter(|(_, status)| *status == PatchStatus::Pending)
            .map(|(name, _)| name)
            .collect())
    }

    /// Renders every patch without touching a database.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Prepare`] or [`MigrateError::Patch`] when a
    /// statement cannot be prepared or built.
    pub fn render(&self, dialect: &dyn Dialect) -> Result<Vec<RenderedPatch>> {
        self.patches
            .iter()
            .map(|patch| {
                let mut queries = Vec::new();
                for (index, statement) in patch.statements()?.into_iter().enumerate() {
                    queries.extend(
                        statement
                            .build_all(dialect)
                            .map_err(|error| patch_error(patch.name(), index, error))?,
                    );
                }
                Ok(RenderedPatch {
                    name: patch.name().to_owned(),
                    queries,
                })
            })
            .collect()
    }

    /// Applies the pending patches in order and records each one in the
    /// ledger once all of its statements succeeded.
    ///
    /// The run stops at the first failing statement. Patches applied before
    /// the failure stay recorded.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Patch`] naming the patch and the statement index,
    /// or any ledger error.
    pub fn apply(
        &self,
        conn: &mut dyn Connection,
        ledger: &mut dyn Ledger,
    ) -> Result<ApplyReport> {
        ledger.ensure(conn)?;
        let applied: Vec<String> = ledger
            .applied(conn)?
            .into_iter()
            .map(|patch| patch.name)
            .collect();

        let mut report = ApplyReport::default();
        for patch in &self.patches {
            let name = patch.name();
            if applied.iter().any(|known| known == name) {
                warn!(patch = %name, "Patch already applied, skipping");
                report.skipped.push(name.to_owned());
                continue;
            }

            info!(patch = %name, "Applying patch");
            run_patch(patch.as_ref(), conn)?;
            ledger.record(conn, name)?;
            report.applied.push(name.to_owned());
        }
        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "Patches done"
        );
        Ok(report)
    }
}

fn patch_error(patch: &str, index: usize, error: impl Into<StatementError>) -> MigrateError {
    MigrateError::Patch {
        patch: patch.to_owned(),
        index,
        source: error.into(),
    }
}

fn run_patch(patch: &dyn Patch, conn: &mut dyn Connection) -> Result<()> {
    let name = patch.name();
    for (index, statement) in patch.statements()?.into_iter().enumerate() {
        let queries = statement
            .build_all(conn.dialect())
            .map_err(|error| patch_error(name, index, error))?;
        for query in &queries {
            debug!(patch = %name, sql = %query.shape, "Executing statement");
            conn.execute(query)
                .map_err(|error| patch_error(name, index, error))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::StatementPatch;
    use quarry_sql_core::dialect::MySqlDialect;
    use quarry_sql_core::CreateTable;
    use quarry_sql_core::BuildError;

    #[test]
    fn test_duplicate_patch_is_rejected() {
        let mut sequencer = Sequencer::new();
        sequencer.add(StatementPatch::new("0001")).unwrap();
        let error = sequencer.add(StatementPatch::new("0001")).unwrap_err();
        assert!(matches!(error, MigrateError::DuplicatePatch(name) if name == "0001"));
        assert_eq!(sequencer.len(), 1);
    }

    #[test]
    fn test_render_reports_statement_index() {
        let sequencer = Sequencer::new()
            .with(
                StatementPatch::new("0001_broken")
                    .raw("SELECT 1")
                    .statement(CreateTable::new("Empty")),
            )
            .unwrap();
        let error = sequencer.render(&MySqlDialect).unwrap_err();
        match error {
            MigrateError::Patch {
                patch,
                index,
                source: StatementError::Build(BuildError::EmptyTable { table }),
            } => {
                assert_eq!(patch, "0001_broken");
                assert_eq!(index, 1);
                assert_eq!(table, "Empty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_in_order() {
        let sequencer = Sequencer::new()
            .with(StatementPatch::new("a").raw("SELECT 1"))
            .unwrap()
            .with(StatementPatch::new("b").raw("SELECT 2").raw("SELECT 3"))
            .unwrap();
        let rendered = sequencer.render(&MySqlDialect).unwrap();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].name, "a");
        let sql: Vec<&str> = rendered[1].queries.iter().map(|q| q.sql.as_str()).collect();
        assert_eq!(sql, ["SELECT 2", "SELECT 3"]);
    }
}
