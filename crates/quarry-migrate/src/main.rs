//! quarry-migrate CLI
//!
//! Applies the entity-log patch configured in a JSON file.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use quarry_migrate::{
    DialectKind, MigrateConfig, PatchStatus, Sequencer, SqlxConnection, TableLedger,
};

/// Ordered schema patches for quarry databases.
#[derive(Parser)]
#[command(name = "quarry-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (mysql://... or postgres://...).
    #[arg(short, long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// SQL dialect; inferred from the database URL when absent.
    #[arg(long, value_enum)]
    dialect: Option<DialectKind>,

    /// JSON file listing the tables whose modifications are logged.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending patches.
    Apply {
        /// Print the SQL of the pending patches without executing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which patches are applied.
    Status,

    /// Print the SQL of every patch. Needs no database.
    Sql,
}

impl Cli {
    fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("a database URL is required (--database-url or DATABASE_URL)")
    }

    fn dialect(&self) -> anyhow::Result<DialectKind> {
        match self.dialect {
            Some(kind) => Ok(kind),
            None => Ok(DialectKind::from_url(self.database_url()?)?),
        }
    }

    fn connect(&self) -> anyhow::Result<SqlxConnection> {
        Ok(SqlxConnection::connect(self.database_url()?, self.dialect)?)
    }

    fn sequencer(&self) -> anyhow::Result<Sequencer> {
        let config = match &self.config {
            Some(path) => MigrateConfig::load(path)?,
            None => MigrateConfig::default(),
        };
        if config.entity_log.is_empty() {
            info!("No table configured for the entity log");
        }
        Ok(Sequencer::new().with(config.entity_log_patch())?)
    }
}

fn print_patches(
    sequencer: &Sequencer,
    dialect: DialectKind,
    only: Option<&[String]>,
) -> anyhow::Result<()> {
    for patch in sequencer.render(dialect.dialect())? {
        if only.is_some_and(|names| !names.contains(&patch.name)) {
            continue;
        }
        println!("-- {}", patch.name);
        for query in &patch.queries {
            println!("{};", query.sql);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let sequencer = cli.sequencer()?;

    match &cli.command {
        Commands::Apply { dry_run: true } => {
            info!("Dry run mode - SQL will be printed but not executed.");
            let mut conn = cli.connect()?;
            let pending = sequencer.pending(&mut conn, &mut TableLedger::new())?;
            print_patches(&sequencer, conn.kind(), Some(pending.as_slice()))?;
        }

        Commands::Apply { dry_run: false } => {
            let mut conn = cli.connect()?;
            let report = sequencer.apply(&mut conn, &mut TableLedger::new())?;
            if report.applied.is_empty() {
                info!("No patch to apply.");
            }
            for name in &report.applied {
                info!(patch = %name, "Applied");
            }
        }

        Commands::Status => {
            let mut conn = cli.connect()?;
            let mut ledger = TableLedger::new();
            println!("\nPatches:");
            println!("{:-<60}", "");
            for (name, status) in sequencer.status(&mut conn, &mut ledger)? {
                match status {
                    PatchStatus::Applied(Some(at)) => {
                        println!(" [X] {name} ({})", at.format("%Y-%m-%d %H:%M:%S"));
                    }
                    PatchStatus::Applied(None) => println!(" [X] {name}"),
                    PatchStatus::Pending => println!(" [ ] {name}"),
                }
            }
            println!();
        }

        Commands::Sql => {
            print_patches(&sequencer, cli.dialect()?, None)?;
        }
    }

    Ok(())
}
