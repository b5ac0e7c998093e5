//! Article and catalog sources.
//!
//! The pipeline consumes two collaborators:
//!
//! 1. an [`ArticleSource`] that lists recent articles and fetches their bodies
//! 2. a catalog that maps a linked shop item id to its display title
//!
//! Catalog lookups happen over the network, but classification is pure, so
//! the pipeline resolves every id an article links to first and hands the
//! classifier a synchronous [`CatalogLookup`] (usually a `HashMap`).
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | Publisher CMS | [`nexon`] | JSON news list, article bodies, shop item details |

use std::collections::{BTreeSet, HashMap};

use futures::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::models::ArticleMeta;

pub mod nexon;

/// Listing and body access for publisher articles.
pub trait ArticleSource {
    /// Recently published articles, newest first as the publisher reports them.
    async fn list_recent(&self) -> Result<Vec<ArticleMeta>>;

    /// Raw markup body of one article.
    async fn fetch_body(&self, id: &str) -> Result<String>;

    /// Display title of a shop catalog item; `Ok(None)` when the item is unknown.
    async fn resolve_item(&self, catalog_id: &str) -> Result<Option<String>>;
}

/// Synchronous catalog view used during classification.
pub trait CatalogLookup {
    fn resolve_item(&self, catalog_id: &str) -> Option<String>;
}

impl CatalogLookup for HashMap<String, String> {
    fn resolve_item(&self, catalog_id: &str) -> Option<String> {
        self.get(catalog_id).cloned()
    }
}

/// Resolve every id through `source`, skipping ids that are absent or fail.
///
/// Lookups run one after another; a failure only loses that one title.
#[instrument(level = "debug", skip_all, fields(count = ids.len()))]
pub async fn prefetch_catalog<S: ArticleSource>(source: &S, ids: &BTreeSet<String>) -> HashMap<String, String> {
    let resolved: Vec<(String, String)> = stream::iter(ids.iter())
        .then(|id| async move {
            match source.resolve_item(id).await {
                Ok(Some(title)) => {
                    debug!(%id, %title, "Resolved catalog item");
                    Some((id.clone(), title))
                }
                Ok(None) => {
                    debug!(%id, "Catalog item not found");
                    None
                }
                Err(e) => {
                    warn!(%id, error = %e, "Catalog lookup failed; skipping item");
                    None
                }
            }
        })
        .filter_map(std::future::ready)
        .collect()
        .await;
    resolved.into_iter().collect()
}
