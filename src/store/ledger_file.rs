//! JSON ledger file.
//!
//! Records are stored as a JSON object keyed by id. Timestamps serialize as
//! RFC 3339 with the offset they were recorded with. Saving writes a sibling
//! temporary file first and renames it over the ledger.

use std::path::Path;

use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;
use crate::ledger::Ledger;

/// Load the ledger. A missing file is an empty ledger.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load(path: &Path) -> Result<Ledger> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No ledger yet; starting empty");
            return Ok(Ledger::new());
        }
        Err(e) => return Err(e.into()),
    };
    let ledger: Ledger = serde_json::from_slice(&bytes)?;
    info!(records = ledger.len(), "Loaded ledger");
    Ok(ledger)
}

/// Save the ledger, replacing the file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), records = ledger.len()))]
pub async fn save(path: &Path, ledger: &Ledger) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(ledger)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    info!("Saved ledger");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleMeta, Kind, PublicationState, PublishPolicy, Record, Window};
    use chrono::DateTime;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = load(&dir.path().join("known.json")).await.unwrap();
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_keeps_zones_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("known.json");

        let meta = ArticleMeta {
            id: "12345".to_string(),
            title: "Scheduled Maintenance".to_string(),
            category: "maintenance".to_string(),
            posted_at: DateTime::parse_from_rfc3339("2024-06-01T16:00:00Z").unwrap(),
        };
        let window = Window::between(
            DateTime::parse_from_rfc3339("2024-06-03T10:00:00-07:00").unwrap(),
            DateTime::parse_from_rfc3339("2024-06-03T14:00:00-07:00").unwrap(),
        );
        let args = vec!["y".to_string(), "n".to_string(), "4 hours".to_string(), "n".to_string()];
        let mut ledger = Ledger::new();
        ledger.put(Record::new(&meta, Kind::Maintenance, Some(window), PublishPolicy::OnPost, args));
        ledger.advance("12345", PublicationState::EmittedToPage).unwrap();

        save(&path, &ledger).await.unwrap();
        let back = load(&path).await.unwrap();
        assert_eq!(back, ledger);
        let record = back.get("12345").unwrap();
        assert_eq!(record.start().unwrap().offset().local_minus_utc(), -7 * 3600);
        assert_eq!(record.posted_at.offset().local_minus_utc(), 0);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load(&path).await.is_err());
    }
}
