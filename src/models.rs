//! Data models for classified articles and their publication state.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ArticleMeta`]: Listing metadata for one raw publisher article
//! - [`Record`]: A classified, dated article as kept in the ledger
//! - [`Window`]: The activity window of maintenance, events and sales
//! - [`Kind`], [`PublishPolicy`], [`PublicationState`]: closed vocabularies
//!
//! Timestamps are `DateTime<FixedOffset>` so the offset each one was recorded
//! with survives a save/load cycle unchanged.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A zoned timestamp as stored in records.
pub type Timestamp = DateTime<FixedOffset>;

/// Listing metadata for one publisher article.
///
/// This is what the article source reports before the body is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMeta {
    /// Publisher-assigned article id.
    pub id: String,
    /// Raw article title.
    pub title: String,
    /// Coarse publisher category (`maintenance`, `updates`, `events`, `sales`, ...).
    pub category: String,
    /// When the article went live.
    pub posted_at: Timestamp,
}

/// Content kind assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    Maintenance,
    Update,
    Event,
    Sale,
    ArtCorner,
    Unknown,
    /// Intentionally excluded, e.g. aggregate patch notes.
    Skip,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Maintenance => "maintenance",
            Kind::Update => "update",
            Kind::Event => "event",
            Kind::Sale => "sale",
            Kind::ArtCorner => "art-corner",
            Kind::Unknown => "unknown",
            Kind::Skip => "skip",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a record becomes eligible for the news page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPolicy {
    Never,
    /// Eligible once the article itself is live.
    OnPost,
    /// Eligible once the activity window has started.
    OnStart,
}

/// Forward-only publication state of a record.
///
/// The only legal moves are `Pending -> EmittedToPage -> EmittedToList`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationState {
    Pending,
    EmittedToPage,
    EmittedToList,
}

impl PublicationState {
    /// The state that directly follows this one, if any.
    pub fn successor(self) -> Option<PublicationState> {
        match self {
            PublicationState::Pending => Some(PublicationState::EmittedToPage),
            PublicationState::EmittedToPage => Some(PublicationState::EmittedToList),
            PublicationState::EmittedToList => None,
        }
    }

    /// True when `next` is exactly the successor of `self`.
    pub fn can_advance_to(self, next: PublicationState) -> bool {
        self.successor() == Some(next)
    }
}

impl fmt::Display for PublicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PublicationState::Pending => "pending",
            PublicationState::EmittedToPage => "emitted_to_page",
            PublicationState::EmittedToList => "emitted_to_list",
        })
    }
}

/// Activity window of a maintenance, event or sale.
///
/// Either endpoint may be unknown; when both are known `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl Window {
    /// A window with both endpoints. Endpoints given in the wrong order are swapped.
    pub fn between(start: Timestamp, end: Timestamp) -> Self {
        if end < start {
            Window {
                start: Some(end),
                end: Some(start),
            }
        } else {
            Window {
                start: Some(start),
                end: Some(end),
            }
        }
    }

    /// Two-character `(has_start, has_end)` signature, e.g. `"11"` or `"01"`.
    pub fn signature(window: Option<&Window>) -> &'static str {
        let start = window.is_some_and(|w| w.start.is_some());
        let end = window.is_some_and(|w| w.end.is_some());
        match (start, end) {
            (false, false) => "00",
            (false, true) => "01",
            (true, false) => "10",
            (true, true) => "11",
        }
    }
}

/// One classified article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub category: String,
    pub kind: Kind,
    pub posted_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Window>,
    pub publish_policy: PublishPolicy,
    /// Kind-specific rendering parameters, in template order.
    #[serde(default)]
    pub args: Vec<String>,
    pub state: PublicationState,
}

impl Record {
    /// Build a fresh `Pending` record, normalising the policy so that the
    /// record invariants hold: `skip` never posts and `on_start` needs a
    /// window start.
    pub fn new(
        meta: &ArticleMeta,
        kind: Kind,
        window: Option<Window>,
        publish_policy: PublishPolicy,
        args: Vec<String>,
    ) -> Self {
        let publish_policy = match (kind, publish_policy) {
            (Kind::Skip, _) => PublishPolicy::Never,
            (_, PublishPolicy::OnStart) if window.and_then(|w| w.start).is_none() => {
                PublishPolicy::OnPost
            }
            (_, policy) => policy,
        };
        Record {
            id: meta.id.clone(),
            title: meta.title.clone(),
            category: meta.category.clone(),
            kind,
            posted_at: meta.posted_at,
            window,
            publish_policy,
            args,
            state: PublicationState::Pending,
        }
    }

    pub fn start(&self) -> Option<Timestamp> {
        self.window.and_then(|w| w.start)
    }

    pub fn end(&self) -> Option<Timestamp> {
        self.window.and_then(|w| w.end)
    }

    /// The date that decides when this record may be posted, if it ever may.
    pub fn trigger_date(&self) -> Option<Timestamp> {
        match self.publish_policy {
            PublishPolicy::Never => None,
            PublishPolicy::OnPost => Some(self.posted_at),
            PublishPolicy::OnStart => self.start(),
        }
    }

    /// Positional argument `index`, if the classifier produced it.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}
