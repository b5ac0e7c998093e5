//! # Newscast
//!
//! A news pipeline that reads announcements from a game publisher's CMS,
//! classifies each article, works out when the thing it announces starts and
//! ends, and keeps a set of community wiki pages up to date without ever
//! posting the same item twice.
//!
//! ## Features
//!
//! - Classifies articles into maintenance, update, event, sale, art corner
//!   and unknown, skipping aggregate patch notes
//! - Resolves year-less, zone-abbreviated date fragments into zoned timestamps
//! - Merges newly postable items into a day-bucketed news page, idempotently
//! - Folds active events and sales into "current" tables keyed by name
//! - Keeps the maintenance banner pointed at the next maintenance
//!
//! ## Usage
//!
//! ```sh
//! NEXON_API_KEY=... WIKI_USERNAME=... WIKI_PASSWORD=... newscast -c newscast.yaml
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Ingest**: list recent articles and classify the unseen ones into the ledger
//! 2. **News**: merge postable records into the news page
//! 3. **Banner**: rewrite the maintenance notice
//! 4. **Lists**: fold active events and sales into their tables
//! 5. **Save**: persist the ledger with the advanced publication states

use std::error::Error;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Parser;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod classifier;
mod cli;
mod config;
mod error;
mod ledger;
mod markup;
mod models;
mod outputs;
mod pipeline;
mod render;
mod selector;
mod sources;
mod store;
mod temporal;
mod utils;

use api::{JsonFetcher, RetryFetch};
use cli::Cli;
use config::{Backend, load_config};
use error::NewscastError;
use pipeline::{Pipeline, RunOptions};
use sources::nexon::NexonSource;
use store::{Documents, LocalStore, WikiStore, ledger_file};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("newscast starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(config = %args.config.display(), dry_run = args.dry_run, skip_ingest = args.skip_ingest, force = ?args.force, "Parsed CLI arguments");

    let config = load_config(&args.config).await?;
    let normalizer = config.normalizer()?;
    info!(timezone = %config.timezone, aliases = ?config.zone_aliases, "Using timezone");

    // Early check: the archive dir must be writable if one is configured
    if let Some(dir) = &config.archive_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir.display(), error = %e, "Archive directory is not writable (fix perms or choose a different path)");
            return Err(e.into());
        }
    }

    // ---- Article source ----
    let api_key = args.api_key.as_deref().or(config.source.api_key.as_deref());
    if api_key.is_none() {
        warn!("No publisher API key configured; requests may be rejected");
    }
    let fetcher = RetryFetch::new(
        JsonFetcher::new(api_key)?,
        config.http.max_retries,
        Duration::from_millis(config.http.base_delay_ms),
    );
    let source = NexonSource::new(fetcher, config.source.clone(), config.archive_dir.clone());

    // ---- Document store ----
    let documents = match config.documents.backend {
        Backend::Local => {
            info!(dir = %config.documents.local_dir.display(), "Using local document store");
            Documents::Local(LocalStore::new(config.documents.local_dir.clone()))
        }
        Backend::Wiki => {
            let wiki = &config.documents.wiki;
            let store = WikiStore::new(&wiki.api_url)?;
            let username = args.wiki_username.as_deref().or(wiki.username.as_deref());
            let password = args.wiki_password.as_deref().or(wiki.password.as_deref());
            match (username, password) {
                (Some(username), Some(password)) => store.login(username, password).await?,
                _ if args.dry_run => warn!("No wiki credentials; reading pages anonymously"),
                _ => {
                    return Err(
                        NewscastError::Config("the wiki backend needs WIKI_USERNAME and WIKI_PASSWORD".to_string()).into(),
                    );
                }
            }
            info!(api = %wiki.api_url, "Using wiki document store");
            Documents::Wiki(store)
        }
    };

    // ---- Run ----
    let mut ledger = ledger_file::load(&config.ledger_path).await?;
    let options = RunOptions {
        dry_run: args.dry_run,
        skip_ingest: args.skip_ingest,
        force: args.force.into_iter().collect(),
    };
    let pipeline = Pipeline::new(
        source,
        documents,
        normalizer,
        config.pages.clone(),
        config.source.public_article_url.clone(),
        options,
    );
    let now = Utc::now().fixed_offset();
    let outcome = pipeline.run(&mut ledger, &now).await;

    // Steps that did finish have advanced the ledger; keep that progress even
    // if a later step failed.
    if args.dry_run {
        info!(records = ledger.len(), "Dry run; ledger not saved");
    } else if let Err(e) = ledger_file::save(&config.ledger_path, &ledger).await {
        error!(path = %config.ledger_path.display(), error = %e, "Failed to save ledger");
        return Err(e.into());
    }

    if let Err(e) = outcome {
        error!(error = %e, "Run aborted");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
