//! Error type shared by the classification, merge and I/O layers.
//!
//! Recoverable conditions (a malformed date in one article, a document missing
//! its managed-region markers) are logged and skipped by the pipeline. The
//! ledger and template variants signal logic bugs and abort the run.

use std::io;

use thiserror::Error;

use crate::models::{Kind, PublicationState};

/// Every failure the pipeline can surface.
#[derive(Debug, Error)]
pub enum NewscastError {
    #[error("malformed date text: {0:?}")]
    MalformedDate(String),
    #[error("document {document:?} is missing its <!-- {label} Start/End --> markers")]
    MissingMarkers { document: String, label: String },
    #[error("record {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: PublicationState,
        to: PublicationState,
    },
    #[error("record {0} is not in the ledger")]
    UnknownRecord(String),
    #[error("template for {kind} needs field {field:?} which record {id} does not have")]
    MissingTemplateField {
        id: String,
        kind: Kind,
        field: &'static str,
    },
    #[error("{url} answered with HTTP {status}")]
    HttpStatus { status: u16, url: String },
    #[error("unexpected payload from {source_name}: {details}")]
    UnexpectedPayload { source_name: String, details: String },
    #[error("wiki API error: {0}")]
    Wiki(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl NewscastError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Client errors (4xx) and everything that is not transport related are
    /// final.
    pub fn is_retryable(&self) -> bool {
        match self {
            NewscastError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            NewscastError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, NewscastError>;
