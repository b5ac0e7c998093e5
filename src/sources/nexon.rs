//! Publisher CMS source.
//!
//! The CMS exposes three JSON endpoints:
//!
//! - the news list: an array of `{Id, Title, LiveDate, Category}`
//! - one article: an object whose `Body` holds the article HTML
//! - shop item detail: `{Item: {ProductTitle}}`
//!
//! URLs come from configuration as templates with an `{id}` placeholder.
//! When an archive directory is configured, each payload is also written to
//! `<archive>/news/<id>.json` or `<archive>/shop/<id>.json`.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use tokio::fs;
use tracing::{info, instrument, warn};
use url::Url;

use crate::api::FetchAsync;
use crate::config::SourceConfig;
use crate::error::{NewscastError, Result};
use crate::models::{ArticleMeta, Timestamp};
use crate::sources::ArticleSource;

const SOURCE_NAME: &str = "publisher CMS";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedArticle {
    id: Value,
    title: String,
    live_date: String,
    #[serde(default)]
    category: String,
}

/// Parse a CMS `LiveDate`. Offset-less stamps are UTC.
pub fn parse_live_date(text: &str) -> Result<Timestamp> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    Err(NewscastError::MalformedDate(text.to_string()))
}

fn id_text(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Publisher CMS client on top of any [`FetchAsync`].
#[derive(Debug)]
pub struct NexonSource<F> {
    fetcher: F,
    config: SourceConfig,
    archive_dir: Option<PathBuf>,
}

impl<F: FetchAsync> NexonSource<F> {
    pub fn new(fetcher: F, config: SourceConfig, archive_dir: Option<PathBuf>) -> Self {
        NexonSource {
            fetcher,
            config,
            archive_dir,
        }
    }

    fn url_for(template: &str, id: &str) -> Result<Url> {
        Ok(Url::parse(&template.replace("{id}", &urlencoding::encode(id)))?)
    }

    async fn archive(&self, folder: &str, id: &str, payload: &Value) {
        let Some(root) = &self.archive_dir else {
            return;
        };
        let dir = root.join(folder);
        let path = dir.join(format!("{id}.json"));
        let written = async {
            fs::create_dir_all(&dir).await?;
            fs::write(&path, serde_json::to_vec_pretty(payload)?).await?;
            Ok::<_, NewscastError>(())
        };
        if let Err(e) = written.await {
            warn!(path = %path.display(), error = %e, "Failed to archive payload");
        }
    }
}

impl<F: FetchAsync> ArticleSource for NexonSource<F> {
    #[instrument(level = "info", skip_all)]
    async fn list_recent(&self) -> Result<Vec<ArticleMeta>> {
        let url = Url::parse(&self.config.list_url)?;
        let payload = self.fetcher.fetch_json(&url).await?;
        let listed: Vec<ListedArticle> = serde_json::from_value(payload)?;

        let mut articles = Vec::with_capacity(listed.len());
        for item in listed {
            let Some(id) = id_text(&item.id) else {
                warn!(id = ?item.id, title = %item.title, "Listed article has no usable id; skipping");
                continue;
            };
            let posted_at = match parse_live_date(&item.live_date) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(%id, error = %e, "Listed article has an unreadable LiveDate; skipping");
                    continue;
                }
            };
            articles.push(ArticleMeta {
                id,
                title: item.title,
                category: item.category,
                posted_at,
            });
        }
        info!(count = articles.len(), source = %self.config.list_url, "Listed recent articles");
        Ok(articles)
    }

    #[instrument(level = "info", skip_all, fields(%id))]
    async fn fetch_body(&self, id: &str) -> Result<String> {
        let url = Self::url_for(&self.config.article_url, id)?;
        let payload = self.fetcher.fetch_json(&url).await?;
        self.archive("news", id, &payload).await;
        payload
            .get("Body")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| NewscastError::UnexpectedPayload {
                source_name: SOURCE_NAME.to_string(),
                details: format!("article {id} has no Body"),
            })
    }

    #[instrument(level = "debug", skip_all, fields(%catalog_id))]
    async fn resolve_item(&self, catalog_id: &str) -> Result<Option<String>> {
        let url = Self::url_for(&self.config.shop_item_url, catalog_id)?;
        let payload = match self.fetcher.fetch_json(&url).await {
            Ok(payload) => payload,
            Err(NewscastError::HttpStatus { status, .. }) if status >= 400 => return Ok(None),
            Err(e) => return Err(e),
        };
        self.archive("shop", catalog_id, &payload).await;
        Ok(payload
            .pointer("/Item/ProductTitle")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}
