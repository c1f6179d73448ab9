//! tern CLI
//!
//! Command-line tool for generating, checking and applying SQL migrations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tern_migrate::prelude::*;

/// Snapshot-diffing SQL migrations.
#[derive(Parser)]
#[command(name = "tern")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (`sqlite:` path or `postgres://` connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:tern.db")]
    database: String,

    /// Migrations directory.
    #[arg(short, long, default_value = "migrations")]
    migrations_dir: PathBuf,

    /// Journal file (defaults to `<migrations-dir>/journal.json`).
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Stored schema snapshot (defaults to `<migrations-dir>/snapshot.json`).
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn journal_path(&self) -> PathBuf {
        self.journal
            .clone()
            .unwrap_or_else(|| self.migrations_dir.join("journal.json"))
    }

    fn snapshot_path(&self) -> PathBuf {
        self.snapshot
            .clone()
            .unwrap_or_else(|| self.migrations_dir.join("snapshot.json"))
    }

    fn dialect(&self) -> &'static dyn Dialect {
        DialectKind::from_url(&self.database).dialect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the history table, migrations directory and journal.
    Init,

    /// Show applied and pending migrations.
    Status,

    /// Apply pending migrations.
    Migrate {
        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate the next migration from a schema file.
    Generate {
        /// Migration description, e.g. "add user emails".
        description: String,

        /// Schema snapshot (JSON) describing the desired state.
        #[arg(short, long, default_value = "schema.json")]
        schema: PathBuf,
    },

    /// Check for journal collisions, drift and out-of-order migrations.
    Check,

    /// Read the live schema into a snapshot.
    Introspect {
        /// Write the snapshot here instead of printing it.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the SQL between two snapshot files.
    Diff {
        /// Snapshot to migrate from.
        #[arg(long)]
        from: PathBuf,

        /// Snapshot to migrate to.
        #[arg(long)]
        to: PathBuf,

        /// Target dialect (`postgres` or `sqlite`).
        #[arg(long, default_value = "postgres")]
        dialect: DialectKind,

        /// Print rollback SQL instead of forward SQL.
        #[arg(long)]
        rollback: bool,
    },
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

    match &cli.command {
        Commands::Init => init(&cli).await,
        Commands::Status => status(&cli).await,
        Commands::Migrate { dry_run } => migrate(&cli, *dry_run).await,
        Commands::Generate {
            description,
            schema,
        } => generate(&cli, description, schema),
        Commands::Check => check(&cli).await,
        Commands::Introspect { out } => introspect_schema(&cli, out.as_deref()).await,
        Commands::Diff {
            from,
            to,
            dialect,
            rollback,
        } => diff(from, to, *dialect, *rollback),
    }
}

async fn connect(cli: &Cli) -> anyhow::Result<Database> {
    Database::connect(&cli.database)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.database))
}

async fn init(cli: &Cli) -> anyhow::Result<()> {
    info!("Initializing migrations system...");
    let db = connect(cli).await?;
    MigrationRunner::new(db.dialect())
        .create_history_table(&db)
        .await?;

    std::fs::create_dir_all(&cli.migrations_dir)?;
    let journal_path = cli.journal_path();
    if journal_path.exists() {
        info!("Journal already exists: {}", journal_path.display());
    } else {
        write_journal(&journal_path, &create_journal())?;
        info!("Created journal: {}", journal_path.display());
    }
    info!("Migrations table created successfully.");
    Ok(())
}

async fn status(cli: &Cli) -> anyhow::Result<()> {
    let db = connect(cli).await?;
    let runner = MigrationRunner::new(db.dialect());
    runner.create_history_table(&db).await?;

    let files = read_migration_dir(&cli.migrations_dir)?;
    let applied = runner.get_applied(&db).await?;
    let pending = get_pending(&files, &applied);

    if applied.is_empty() {
        info!("No migrations have been applied yet.");
    } else {
        println!("\nApplied migrations:");
        println!("{:-<60}", "");
        for migration in &applied {
            println!(
                " [X] {} ({})",
                migration.name,
                migration.applied_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    if !pending.is_empty() {
        println!("\nPending migrations:");
        println!("{:-<60}", "");
        for file in &pending {
            println!(" [ ] {}", file.name);
        }
    }
    println!();

    for name in detect_drift(&files, &applied) {
        warn!("Migration {name} was modified after it was applied");
    }
    for name in detect_out_of_order(&files, &applied) {
        warn!("Migration {name} is sequenced before an applied migration");
    }
    Ok(())
}

async fn migrate(cli: &Cli, dry_run: bool) -> anyhow::Result<()> {
    let db = connect(cli).await?;
    let runner = MigrationRunner::new(db.dialect());
    let files = read_migration_dir(&cli.migrations_dir)?;

    if dry_run {
        info!("Dry run mode - SQL will be printed but not executed.");
    } else {
        runner.create_history_table(&db).await?;
    }

    // A dry run never creates the history table, so it may be missing.
    let applied = if runner.history_table_exists(&db).await? {
        runner.get_applied(&db).await?
    } else {
        Vec::new()
    };

    let drifted = detect_drift(&files, &applied);
    if !drifted.is_empty() {
        return Err(MigrateError::Drift(drifted).into());
    }
    for name in detect_out_of_order(&files, &applied) {
        warn!("Migration {name} is sequenced before an applied migration");
    }

    let pending = get_pending(&files, &applied);
    if pending.is_empty() {
        info!("No pending migrations.");
        return Ok(());
    }

    let options = if dry_run {
        ApplyOptions::dry_run()
    } else {
        ApplyOptions::default()
    };
    for file in pending {
        let result = runner.apply(&db, &file.sql, &file.name, options).await?;
        if dry_run {
            println!("-- {}\n{}\n", result.name, result.sql);
        } else {
            info!("Applied {}", result.name);
        }
    }
    Ok(())
}

fn generate(cli: &Cli, description: &str, schema: &Path) -> anyhow::Result<()> {
    let target = read_snapshot(schema)?
        .with_context(|| format!("Schema file not found: {}", schema.display()))?;
    let snapshot_path = cli.snapshot_path();
    let current = read_snapshot(&snapshot_path)?.unwrap_or_default();

    let diff = compute_diff(&current, &target);
    if diff.is_empty() {
        info!("No changes detected.");
        return Ok(());
    }

    let dialect = cli.dialect();
    for reason in unsupported_changes(&diff.changes, dialect) {
        warn!("{reason}; the generated migration will not apply it");
    }
    let sql = generate_migration_sql(&diff.changes, &SqlContext::new(&current, &target), dialect);

    let journal_path = cli.journal_path();
    let journal = read_journal(&journal_path)?;
    let on_disk = read_migration_dir(&cli.migrations_dir)?
        .iter()
        .filter_map(MigrationFile::sequence)
        .max()
        .map_or(Some(1), |max| max.checked_add(1));
    let sequence = next_sequence(&journal)
        .zip(on_disk)
        .map(|(journaled, on_disk)| journaled.max(on_disk))
        .context("Migration sequence numbers are exhausted")?;
    let file_name = migration_file_name(sequence, description);

    if let Some(collision) = detect_collisions(&journal, &[&file_name]).first() {
        bail!(
            "Migration {} collides with journaled {}; use {}",
            collision.conflicting_name,
            collision.existing_name,
            collision.suggested_name
        );
    }

    for change in diff.destructive() {
        warn!("Destructive change: {change}");
    }

    std::fs::create_dir_all(&cli.migrations_dir)?;
    let file_path = cli.migrations_dir.join(&file_name);
    std::fs::write(&file_path, &sql)?;

    let entry = JournalEntry {
        name: file_name.trim_end_matches(".sql").to_string(),
        description: description.to_string(),
        created_at: Utc::now(),
        checksum: checksum(&sql),
    };
    write_journal(&journal_path, &add_journal_entry(&journal, entry))?;
    write_snapshot(&snapshot_path, &target)?;

    info!("Created migration: {} ({} change(s))", file_path.display(), diff.len());
    Ok(())
}

async fn check(cli: &Cli) -> anyhow::Result<()> {
    let journal = read_journal(&cli.journal_path())?;
    let files = read_migration_dir(&cli.migrations_dir)?;
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();

    let mut problems = 0;
    for collision in detect_collisions(&journal, &names) {
        warn!(
            "Sequence {} of {} is already journaled as {}; rename to {}",
            collision.sequence_number,
            collision.conflicting_name,
            collision.existing_name,
            collision.suggested_name
        );
        problems += 1;
    }

    let db = connect(cli).await?;
    let runner = MigrationRunner::new(db.dialect());
    runner.create_history_table(&db).await?;
    let applied = runner.get_applied(&db).await?;

    for name in detect_drift(&files, &applied) {
        warn!("Migration {name} was modified after it was applied");
        problems += 1;
    }
    for name in detect_out_of_order(&files, &applied) {
        warn!("Migration {name} is sequenced before an applied migration");
        problems += 1;
    }

    if problems > 0 {
        bail!("{problems} problem(s) found");
    }
    info!("No problems found.");
    Ok(())
}

async fn introspect_schema(cli: &Cli, out: Option<&Path>) -> anyhow::Result<()> {
    let db = connect(cli).await?;
    let snapshot = introspect(&db, db.kind()).await?;
    match out {
        Some(path) => {
            write_snapshot(path, &snapshot)?;
            info!("Wrote snapshot: {}", path.display());
        }
        None => println!("{}", snapshot.to_json()?),
    }
    Ok(())
}

fn diff(from: &Path, to: &Path, dialect: DialectKind, rollback: bool) -> anyhow::Result<()> {
    let before = read_snapshot(from)?.with_context(|| format!("Snapshot not found: {}", from.display()))?;
    let after = read_snapshot(to)?.with_context(|| format!("Snapshot not found: {}", to.display()))?;

    let diff = compute_diff(&before, &after);
    if diff.is_empty() {
        info!("No changes detected.");
        return Ok(());
    }

    let ctx = SqlContext::new(&before, &after);
    let sql = if rollback {
        generate_rollback_sql(&diff.changes, &ctx, dialect.dialect())
    } else {
        generate_migration_sql(&diff.changes, &ctx, dialect.dialect())
    };
    println!("{sql}");
    Ok(())
}
