/// Rao CLI - Import Eagle libraries into the Rao Pics database
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crate::config::AppConfig;
use rao_core::types::{CreateLibrary, LibraryId, SourceType};
use rao_importer::{LibrarySync, SyncProgress, SyncSummary};
use rao_storage::SqliteLibraryStore;
use sqlx::SqlitePool;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Failures listed after a sync before the rest are summarized
const MAX_LISTED_FAILURES: usize = 10;

#[derive(Parser)]
#[command(name = "rao-cli")]
#[command(about = "Rao Pics library importer", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./rao.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an Eagle library
    AddLibrary {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Path to the `*.library` directory
        path: PathBuf,
    },
    /// List registered libraries
    ListLibraries,
    /// Synchronize one library into the database
    Sync {
        /// Library ID
        library_id: LibraryId,
        /// Remove images whose asset disappeared from disk
        #[arg(long)]
        prune: bool,
    },
    /// Show the sync run history of a library
    History {
        /// Library ID
        library_id: LibraryId,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rao_cli=info,rao_importer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;

    let pool = open_database(&config.database_url).await?;

    match cli.command {
        Commands::AddLibrary { name, path } => {
            add_library(&pool, &name, &path).await?;
        }
        Commands::ListLibraries => {
            list_libraries(&pool).await?;
        }
        Commands::Sync { library_id, prune } => {
            let mut sync_config = config.sync.clone();
            sync_config.prune_missing |= prune;
            sync_library(pool, library_id, sync_config).await?;
        }
        Commands::History { library_id } => {
            show_history(&pool, library_id).await?;
        }
    }

    Ok(())
}

async fn open_database(database_url: &str) -> anyhow::Result<SqlitePool> {
    // create_if_missing does not create parent directories
    if let Some(parent) = database_url
        .strip_prefix("sqlite://")
        .filter(|path| !path.starts_with(':'))
        .and_then(|path| Path::new(path).parent())
    {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let pool = rao_storage::create_pool(database_url).await?;
    rao_storage::run_migrations(&pool).await?;
    tracing::debug!("Database ready at {}", database_url);

    Ok(pool)
}

async fn add_library(pool: &SqlitePool, name: &str, path: &Path) -> anyhow::Result<()> {
    let root = std::fs::canonicalize(path)
        .with_context(|| format!("Library path {} is not accessible", path.display()))?;

    if !root.join(rao_importer::manifest::MANIFEST_FILE).is_file() {
        tracing::warn!(
            "{} has no {}, sync will fail until it exists",
            root.display(),
            rao_importer::manifest::MANIFEST_FILE
        );
    }

    let library = rao_storage::libraries::create(
        pool,
        &CreateLibrary {
            name: name.to_string(),
            path: root.to_string_lossy().into_owned(),
            source_type: SourceType::Eagle,
        },
    )
    .await?;

    println!(
        "✓ Library registered: {} (ID: {}, {})",
        library.name, library.id, library.path
    );

    Ok(())
}

async fn list_libraries(pool: &SqlitePool) -> anyhow::Result<()> {
    let libraries = rao_storage::libraries::get_all(pool).await?;

    if libraries.is_empty() {
        println!("No libraries registered");
        return Ok(());
    }

    println!("Libraries:");
    for library in libraries {
        let images = rao_storage::images::count_by_library(pool, library.id).await?;
        let synced = library
            .last_synced_at
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map_or_else(|| "never".to_string(), |dt| dt.to_rfc3339());

        println!(
            "  [{}] {} ({}) - {} images, last synced {}",
            library.id, library.name, library.path, images, synced
        );
    }

    Ok(())
}

async fn sync_library(
    pool: SqlitePool,
    library_id: LibraryId,
    sync_config: rao_importer::SyncConfig,
) -> anyhow::Result<()> {
    let store = Arc::new(SqliteLibraryStore::new(pool));
    let sync = LibrarySync::new(store, sync_config).with_progress(|progress: &SyncProgress| {
        if progress.processed % 100 == 0 || progress.processed == progress.total {
            tracing::info!(
                "Processed {}/{} assets ({:.0}%)",
                progress.processed,
                progress.total,
                progress.percentage()
            );
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after in-flight assets");
                cancel.cancel();
            }
        }
    });

    let result = sync.sync_library(library_id, cancel).await;
    ctrl_c.abort();

    let summary = result?;
    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &SyncSummary) {
    let status = if summary.cancelled {
        "Sync cancelled"
    } else {
        "Sync complete"
    };

    println!(
        "✓ {} for library {} in {} ms (run {})",
        status, summary.library_id, summary.duration_ms, summary.run_id
    );
    println!(
        "  Images: {} created, {} updated, {} deleted, {} pruned, {} unchanged, {} skipped",
        summary.created,
        summary.updated,
        summary.deleted,
        summary.pruned,
        summary.unchanged,
        summary.skipped
    );
    println!(
        "  Folders: {} created, {} updated, {} unchanged",
        summary.folders.created, summary.folders.updated, summary.folders.unchanged
    );
    println!(
        "  Tags: {} groups created, {} groups updated, {} tags created, {} memberships changed",
        summary.tags.groups_created,
        summary.tags.groups_updated,
        summary.tags.tags_created,
        summary.tags.memberships_changed
    );

    if !summary.failures.is_empty() {
        println!("  Failures:");
        for failure in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            println!("    [{}] {}: {}", failure.kind, failure.path, failure.message);
        }
        if summary.failures.len() > MAX_LISTED_FAILURES {
            println!(
                "    ... and {} more",
                summary.failures.len() - MAX_LISTED_FAILURES
            );
        }
    }
}

async fn show_history(pool: &SqlitePool, library_id: LibraryId) -> anyhow::Result<()> {
    let runs = rao_storage::sync_runs::get_by_library(pool, library_id).await?;

    if runs.is_empty() {
        println!("No sync runs for library {}", library_id);
        return Ok(());
    }

    for run in runs {
        let started = chrono::DateTime::from_timestamp(run.started_at, 0)
            .map_or_else(|| run.started_at.to_string(), |dt| dt.to_rfc3339());

        println!(
            "  #{} {} {} - {} created, {} updated, {} deleted, {} unchanged, {} skipped",
            run.id,
            started,
            run.status,
            run.counts.created,
            run.counts.updated,
            run.counts.deleted,
            run.counts.unchanged,
            run.counts.skipped
        );
        if let Some(message) = run.error_message {
            println!("      error: {}", message);
        }
    }

    Ok(())
}
