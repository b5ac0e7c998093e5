//! One batch run: ingest, merge, fold.
//!
//! Steps run strictly in order against a single mutable [`Ledger`]:
//!
//! 1. **Ingest**: list recent articles, classify the ones not seen before
//! 2. **News page**: merge postable records into the day-bucketed page
//! 3. **Maintenance notice**: rewrite the banner for the next maintenance
//! 4. **Current events / sales**: fold active records into their tables
//!
//! Ledger state is advanced only after the document that justifies it has
//! been written. In dry-run mode documents are logged instead of written and
//! the ledger is left alone. A document without its managed-region markers
//! (or with an unreadable day header) is skipped; the other documents still
//! update.

use std::collections::BTreeSet;

use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

use crate::classifier::{Classifier, catalog_ids};
use crate::config::PagesConfig;
use crate::error::{NewscastError, Result};
use crate::ledger::Ledger;
use crate::markup::parse_html;
use crate::models::{Kind, PublicationState, Timestamp};
use crate::outputs::region::partition;
use crate::outputs::{current_list, maintenance, news_page};
use crate::render::Renderer;
use crate::selector::{PriorityTable, find_postable};
use crate::sources::{ArticleSource, prefetch_catalog};
use crate::store::DocumentStore;
use crate::temporal::Normalizer;
use crate::utils::truncate_for_log;

const NEWS_NOTE: &str = "Automatically updated news. Check my work please!";
const MAINTENANCE_NOTE: &str = "Automatically updated notice. Check my work please!";

/// Switches that change what a run does.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Log rendered documents instead of writing them; never advance state.
    pub dry_run: bool,
    /// Skip step 1 and work from the ledger alone.
    pub skip_ingest: bool,
    /// Article ids to classify again even though they are known.
    pub force: BTreeSet<String>,
}

/// What a run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ingested: usize,
    pub news_lines: usize,
    pub maintenance_updated: bool,
    pub events_listed: usize,
    pub sales_listed: usize,
}

pub struct Pipeline<S, D> {
    source: S,
    documents: D,
    classifier: Classifier,
    normalizer: Normalizer,
    pages: PagesConfig,
    article_url: String,
    table: PriorityTable,
    options: RunOptions,
}

/// Conditions that only cost the current document its update.
fn skips_document(e: &NewscastError) -> bool {
    matches!(e, NewscastError::MissingMarkers { .. } | NewscastError::MalformedDate(_))
}

impl<S: ArticleSource, D: DocumentStore> Pipeline<S, D> {
    pub fn new(
        source: S,
        documents: D,
        normalizer: Normalizer,
        pages: PagesConfig,
        article_url: impl Into<String>,
        options: RunOptions,
    ) -> Self {
        Pipeline {
            source,
            documents,
            classifier: Classifier::new(normalizer.clone()),
            normalizer,
            pages,
            article_url: article_url.into(),
            table: PriorityTable::default(),
            options,
        }
    }

    /// Run every step once, as of `now`.
    #[instrument(level = "info", skip_all, fields(dry_run = self.options.dry_run))]
    pub async fn run(&self, ledger: &mut Ledger, now: &Timestamp) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        if self.options.skip_ingest {
            info!("Skipping ingest");
        } else {
            summary.ingested = self.ingest(ledger).await?;
        }

        summary.news_lines = self.update_news(ledger, now).await?;
        summary.maintenance_updated = self.update_maintenance(ledger, now).await?;
        summary.events_listed = self.update_current(ledger, Kind::Event, &self.pages.events, now).await?;
        summary.sales_listed = self.update_current(ledger, Kind::Sale, &self.pages.sales, now).await?;

        info!(
            ingested = summary.ingested,
            news_lines = summary.news_lines,
            maintenance_updated = summary.maintenance_updated,
            events_listed = summary.events_listed,
            sales_listed = summary.sales_listed,
            "Run finished"
        );
        Ok(summary)
    }

    /// Classify every listed article that is new (or forced). Returns how
    /// many records were created or replaced.
    #[instrument(level = "info", skip_all)]
    pub async fn ingest(&self, ledger: &mut Ledger) -> Result<usize> {
        let articles = self.source.list_recent().await?;
        let mut count = 0;
        // The listing can repeat an article across categories.
        for meta in articles.into_iter().unique_by(|meta| meta.id.clone()) {
            let forced = self.options.force.contains(&meta.id);
            if ledger.contains(&meta.id) && !forced {
                debug!(id = %meta.id, "Already known");
                continue;
            }

            let body = match self.source.fetch_body(&meta.id).await {
                Ok(body) => body,
                Err(e) => {
                    error!(id = %meta.id, title = %meta.title, error = %e, "Failed to fetch article; skipping");
                    continue;
                }
            };
            let tree = parse_html(&body);
            let catalog = if meta.category.eq_ignore_ascii_case("sales") {
                prefetch_catalog(&self.source, &catalog_ids(&tree)).await
            } else {
                Default::default()
            };

            let record = self.classifier.classify(&meta, &tree, &catalog);
            info!(id = %record.id, kind = %record.kind, title = %record.title, forced, "Classified article");
            if forced {
                ledger.replace_classification(record);
            } else {
                ledger.put(record);
            }
            count += 1;
        }
        info!(count, known = ledger.len(), "Ingest complete");
        Ok(count)
    }

    /// Write `text` unless this is a dry run. Returns whether it was written.
    async fn write(&self, name: &str, text: &str, note: &str) -> Result<bool> {
        if self.options.dry_run {
            info!(document = %name, text = %truncate_for_log(text, 2000), "Dry run; not writing");
            return Ok(false);
        }
        self.documents.write_text(name, text, note).await?;
        Ok(true)
    }

    /// Merge postable records into the news page. Returns the number of lines added.
    #[instrument(level = "info", skip_all, fields(document = %self.pages.news))]
    pub async fn update_news(&self, ledger: &mut Ledger, now: &Timestamp) -> Result<usize> {
        let postable = find_postable(ledger, now, &self.normalizer, &self.table);
        if postable.is_empty() {
            info!("Nothing postable");
            return Ok(0);
        }

        let text = self.documents.read_text(&self.pages.news).await?;
        let renderer = Renderer::new(&self.normalizer, &self.article_url);
        let merged = partition(&text, news_page::REGION, &self.pages.news)
            .and_then(|p| news_page::merge_document(&p, &postable, ledger, &renderer, &self.table));
        let (new_text, outcome) = match merged {
            Ok(merged) => merged,
            Err(e) if skips_document(&e) => {
                error!(error = %e, "Skipping news page");
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let written = match &new_text {
            Some(new_text) => self.write(&self.pages.news, new_text, NEWS_NOTE).await?,
            None => {
                info!(already_present = outcome.already_present.len(), "Nothing to update");
                !self.options.dry_run
            }
        };
        if written {
            ledger.advance_all(&outcome.emitted, PublicationState::EmittedToPage)?;
            ledger.advance_all(&outcome.already_present, PublicationState::EmittedToPage)?;
        }
        Ok(outcome.emitted.len())
    }

    /// Rewrite the maintenance banner when it changed. Returns whether it was written.
    #[instrument(level = "info", skip_all, fields(document = %self.pages.maintenance))]
    pub async fn update_maintenance(&self, ledger: &Ledger, now: &Timestamp) -> Result<bool> {
        let Some(notice) = maintenance::render_notice(ledger, now, &self.normalizer) else {
            info!("No upcoming maintenance");
            return Ok(false);
        };
        let current = self.documents.read_text(&self.pages.maintenance).await?;
        if current.trim() == notice.trim() {
            info!("Maintenance notice unchanged");
            return Ok(false);
        }
        self.write(&self.pages.maintenance, &notice, MAINTENANCE_NOTE).await
    }

    /// Fold active records of `kind` into the table at `document`. Returns
    /// the number of rows added.
    #[instrument(level = "info", skip_all, fields(%kind, %document))]
    pub async fn update_current(&self, ledger: &mut Ledger, kind: Kind, document: &str, now: &Timestamp) -> Result<usize> {
        let text = self.documents.read_text(document).await?;
        let region = match partition(&text, current_list::REGION, document) {
            Ok(region) => region,
            Err(e) if skips_document(&e) => {
                error!(error = %e, "Skipping current list");
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let outcome = current_list::fold_current(&region.body, ledger, kind, now, &self.normalizer);
        let Some(body) = outcome.body else {
            info!("Nothing to update");
            return Ok(0);
        };
        let note = format!("Automatically updated current {kind}s. Check my work please!");
        if self.write(document, &region.assemble(&body), &note).await? {
            ledger.advance_all(&outcome.added, PublicationState::EmittedToList)?;
        } else {
            warn!(rows = outcome.added.len(), "Rows not written; ledger left as is");
        }
        Ok(outcome.added.len())
    }
}
