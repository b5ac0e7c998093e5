//! Document and ledger persistence.
//!
//! # Submodules
//!
//! - [`local`]: one text file per document under a directory
//! - [`wiki`]: MediaWiki action API with bot-password login
//! - [`ledger_file`]: JSON load/save of the [`Ledger`](crate::ledger::Ledger)
//!
//! Documents are opaque text. A document that does not exist yet reads as
//! the empty string.

use crate::error::Result;

pub mod ledger_file;
pub mod local;
pub mod wiki;

pub use local::LocalStore;
pub use wiki::WikiStore;

/// Read/write access to named text documents.
pub trait DocumentStore {
    async fn read_text(&self, name: &str) -> Result<String>;

    /// Replace the whole document. `note` is the change summary.
    async fn write_text(&self, name: &str, text: &str, note: &str) -> Result<()>;
}

/// The configured backend.
#[derive(Debug)]
pub enum Documents {
    Wiki(WikiStore),
    Local(LocalStore),
}

impl DocumentStore for Documents {
    async fn read_text(&self, name: &str) -> Result<String> {
        match self {
            Documents::Wiki(store) => store.read_text(name).await,
            Documents::Local(store) => store.read_text(name).await,
        }
    }

    async fn write_text(&self, name: &str, text: &str, note: &str) -> Result<()> {
        match self {
            Documents::Wiki(store) => store.write_text(name, text, note).await,
            Documents::Local(store) => store.write_text(name, text, note).await,
        }
    }
}
