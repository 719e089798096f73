//! Command-line entry points
//!
//! One operational command: rebuild every registered collection and reload
//! it from the primary store. The command always exits zero; per-collection
//! failures are logged and must not break a deployment pipeline that runs
//! the rebuild as a post-migrate step.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{CONFIG_FILE, Settings};
use crate::registry::CollectionRegistry;

#[derive(Parser, Debug)]
#[command(name = "build-index", about = "Rebuild search collections from the primary store")]
pub struct BuildIndexArgs {
    /// Prepare and encode documents in batches instead of one at a time
    #[arg(long)]
    pub use_batch: bool,

    /// Path to the configuration file
    #[arg(long, env = "DOCSYNC_CONFIG", default_value = CONFIG_FILE)]
    pub config: PathBuf,
}

/// Install the global tracing subscriber, honoring `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load settings for the build-index command
pub fn load_settings(args: &BuildIndexArgs) -> Option<Settings> {
    match Settings::load_from(&args.config) {
        Ok(settings) => Some(settings),
        Err(err) => {
            error!(config = %args.config.display(), "failed to load configuration: {err}");
            None
        }
    }
}

/// Rebuild and refill every registered collection.
///
/// Always exits success; rebuild and fill failures are already logged at
/// the indexer level.
pub fn run_build_index(registry: &Arc<CollectionRegistry>, args: &BuildIndexArgs) -> ExitCode {
    for indexer in registry.indexers() {
        info!(
            collection = indexer.collection_name(),
            use_batch = args.use_batch,
            "rebuilding collection"
        );
        indexer.init_collection(args.use_batch);
    }
    ExitCode::SUCCESS
}
