//! schema-sync CLI
//!
//! Command-line tool for synchronizing schema sources with a database.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use schema_sync::files::{apply_file_changes, migration_file_name, read_code_schema, read_schema_dir};
use schema_sync::{ExecutorOptions, MigrationExecutor, SnapshotClient};
use schema_sync_core::extract::{extract_script, introspect};
use schema_sync_core::{Direction, PlanOptions, Warnings, compare, plan};

/// Keeps declarative schema sources and a SurrealDB schema in sync.
#[derive(Parser)]
#[command(name = "schema-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database snapshot (JSON answers to INFO FOR DB / INFO FOR TABLE).
    #[arg(short, long, env = "SCHEMA_SYNC_SNAPSHOT", default_value = "snapshot.json")]
    snapshot: PathBuf,

    /// Directory of generated schema sources.
    #[arg(short = 'd', long, env = "SCHEMA_SYNC_DIR", default_value = "schema")]
    schema_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write schema sources from the database schema.
    Pull {
        /// Code-side schema as JSON; enables merging instead of overwriting.
        #[arg(short, long)]
        code_schema: Option<PathBuf>,

        /// Also write mod.rs.
        #[arg(long)]
        index: bool,

        /// Show planned file changes without writing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the changes between code and database.
    Diff {
        /// Code-side schema as JSON.
        #[arg(short, long)]
        code_schema: PathBuf,

        /// Describe the changes from the database's point of view.
        #[arg(long)]
        pull: bool,

        /// Print changes as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render the statements that bring the database in line with code.
    Migrate {
        /// Code-side schema as JSON.
        #[arg(short, long)]
        code_schema: PathBuf,

        /// Directory to write a timestamped migration script to.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Apply the statements to the database.
        #[arg(long)]
        apply: bool,

        /// Show statements without applying them (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Parse a SurrealQL script and report what cannot be synchronized.
    Check {
        /// Script to check.
        file: PathBuf,
    },
}

fn report(warnings: &Warnings) {
    for warning in warnings.iter() {
        warn!(kind = ?warning.kind, "{warning}");
    }
}

async fn load_database(path: &Path) -> anyhow::Result<schema_sync_core::SchemaAst> {
    let client = SnapshotClient::from_path(path)?;
    let (schema, warnings) = introspect(&client).await?;
    report(&warnings);
    Ok(schema)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
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

    match cli.command {
        Commands::Pull {
            code_schema,
            index,
            dry_run,
        } => {
            let database = load_database(&cli.snapshot).await?;
            let existing = read_schema_dir(&cli.schema_dir)?;
            let code = code_schema.as_deref().map(read_code_schema).transpose()?;

            let mut options = PlanOptions::new();
            if index {
                options = options.with_index();
            }
            let changes = plan(&database, &existing, code.as_ref(), &options);

            if changes.is_empty() {
                info!("Schema sources are up to date.");
                return Ok(());
            }
            for change in &changes {
                println!("{:>7} {}", change.action.to_string(), change.file);
                for note in &change.notes {
                    println!("        {note}");
                }
            }
            if dry_run {
                info!("Dry run mode - no files written.");
            } else {
                let written = apply_file_changes(&cli.schema_dir, &changes)?;
                info!("Updated {} file(s) in {}", written, cli.schema_dir.display());
            }
        }

        Commands::Diff {
            code_schema,
            pull,
            json,
        } => {
            let database = load_database(&cli.snapshot).await?;
            let code = read_code_schema(&code_schema)?;
            let changes = if pull {
                compare(&database, &code, Direction::Pull)
            } else {
                compare(&code, &database, Direction::Push)
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&changes)?);
            } else if changes.is_empty() {
                info!("No changes detected.");
            } else {
                for change in &changes {
                    println!("{:<24} {}", change.kind.as_str(), change.description);
                }
            }
        }

        Commands::Migrate {
            code_schema,
            output,
            apply,
            dry_run,
        } => {
            let client = SnapshotClient::from_path(&cli.snapshot)?;
            let code = read_code_schema(&code_schema)?;
            let executor =
                MigrationExecutor::new(client).with_options(ExecutorOptions::new().dry_run(dry_run));

            let migration = executor.plan(&code).await?;
            report(&migration.warnings);
            if migration.is_empty() {
                info!("Database schema is up to date.");
                return Ok(());
            }

            let script = migration.script();
            match output {
                Some(dir) => {
                    let path = dir.join(migration_file_name(chrono::Utc::now()));
                    if dry_run {
                        println!("Would create migration: {}", path.display());
                        println!("\n{script}");
                    } else {
                        std::fs::create_dir_all(&dir)?;
                        std::fs::write(&path, &script)?;
                        info!("Created migration: {}", path.display());
                    }
                }
                None => print!("{script}"),
            }

            if apply {
                let applied = executor.apply(&migration).await?;
                info!("Applied {} statement(s).", applied);
            }
        }

        Commands::Check { file } => {
            let script = std::fs::read_to_string(&file)?;
            let (schema, warnings) = extract_script(&script);
            for table in &schema.tables {
                println!(
                    "{} ({}): {} field(s), {} index(es), {} event(s)",
                    table.name,
                    table.kind,
                    table.fields.len(),
                    table.indexes.len(),
                    table.events.len()
                );
            }
            report(&warnings);
            if warnings.is_empty() {
                info!("No problems found in {}.", file.display());
            } else {
                info!("{} warning(s) in {}.", warnings.len(), file.display());
            }
        }
    }

    Ok(())
}
