//! Directory-backed document store.
//!
//! Document `Wiki_Home/WikiUpdates` lives at `<dir>/Wiki_Home%2FWikiUpdates.txt`.

use std::path::PathBuf;

use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;
use crate::store::DocumentStore;
use crate::utils::ensure_writable_dir;

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LocalStore { dir: dir.into() }
    }

    /// File holding document `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", urlencoding::encode(name)))
    }
}

impl DocumentStore for LocalStore {
    #[instrument(level = "debug", skip_all, fields(%name))]
    async fn read_text(&self, name: &str) -> Result<String> {
        match fs::read_to_string(self.path_for(name)).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(level = "info", skip_all, fields(%name))]
    async fn write_text(&self, name: &str, text: &str, note: &str) -> Result<()> {
        ensure_writable_dir(&self.dir).await?;
        let path = self.path_for(name);
        fs::write(&path, text).await?;
        info!(path = %path.display(), bytes = text.len(), %note, "Wrote document");
        Ok(())
    }
}
