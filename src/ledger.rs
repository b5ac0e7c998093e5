//! In-memory ledger of classified records.
//!
//! The ledger owns no I/O. It enforces two rules: ingestion is create-only
//! unless a caller explicitly replaces a classification, and publication
//! state only moves one step forward at a time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NewscastError, Result};
use crate::models::{PublicationState, Record};

/// All known records, keyed by article id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    records: BTreeMap<String, Record>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless its id is already known. Returns whether it was inserted.
    pub fn put(&mut self, record: Record) -> bool {
        if self.records.contains_key(&record.id) {
            return false;
        }
        self.records.insert(record.id.clone(), record);
        true
    }

    /// Replace the classification of a forced re-ingest, keeping the
    /// publication state already reached.
    pub fn replace_classification(&mut self, mut record: Record) {
        if let Some(existing) = self.records.get(&record.id) {
            record.state = existing.state;
        }
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Every record, ordered by id.
    pub fn all(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Move record `id` to `next`, which must directly follow its current state.
    pub fn advance(&mut self, id: &str, next: PublicationState) -> Result<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| NewscastError::UnknownRecord(id.to_string()))?;
        if !record.state.can_advance_to(next) {
            return Err(NewscastError::InvalidTransition {
                id: id.to_string(),
                from: record.state,
                to: next,
            });
        }
        debug!(%id, from = %record.state, to = %next, "Advancing record");
        record.state = next;
        Ok(())
    }

    /// Advance each id in turn, stopping at the first violation.
    pub fn advance_all<'a, I>(&mut self, ids: I, next: PublicationState) -> Result<usize>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut count = 0;
        for id in ids {
            self.advance(id, next)?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleMeta, Kind, PublishPolicy};
    use chrono::DateTime;

    fn record(id: &str, kind: Kind) -> Record {
        let meta = ArticleMeta {
            id: id.to_string(),
            title: format!("Article {id}"),
            category: "updates".to_string(),
            posted_at: DateTime::parse_from_rfc3339("2024-06-01T09:00:00-07:00").unwrap(),
        };
        Record::new(&meta, kind, None, PublishPolicy::OnPost, vec![])
    }

    #[test]
    fn test_put_is_create_only() {
        let mut ledger = Ledger::new();
        assert!(ledger.put(record("1", Kind::Update)));
        assert!(!ledger.put(record("1", Kind::Sale)));
        assert_eq!(ledger.get("1").unwrap().kind, Kind::Update);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_advance_moves_one_step() {
        let mut ledger = Ledger::new();
        ledger.put(record("1", Kind::Update));
        ledger.advance("1", PublicationState::EmittedToPage).unwrap();
        ledger.advance("1", PublicationState::EmittedToList).unwrap();
        assert_eq!(ledger.get("1").unwrap().state, PublicationState::EmittedToList);
    }

    #[test]
    fn test_advance_rejects_skips_and_regressions() {
        let mut ledger = Ledger::new();
        ledger.put(record("1", Kind::Update));
        let err = ledger.advance("1", PublicationState::EmittedToList).unwrap_err();
        assert!(matches!(
            err,
            NewscastError::InvalidTransition {
                from: PublicationState::Pending,
                to: PublicationState::EmittedToList,
                ..
            }
        ));

        ledger.advance("1", PublicationState::EmittedToPage).unwrap();
        assert!(ledger.advance("1", PublicationState::Pending).is_err());
        assert!(ledger.advance("1", PublicationState::EmittedToPage).is_err());
    }

    #[test]
    fn test_advance_unknown_record() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.advance("404", PublicationState::EmittedToPage),
            Err(NewscastError::UnknownRecord(_))
        ));
    }

    #[test]
    fn test_replace_keeps_state() {
        let mut ledger = Ledger::new();
        ledger.put(record("1", Kind::Unknown));
        ledger.advance("1", PublicationState::EmittedToPage).unwrap();
        ledger.replace_classification(record("1", Kind::Event));
        let stored = ledger.get("1").unwrap();
        assert_eq!(stored.kind, Kind::Event);
        assert_eq!(stored.state, PublicationState::EmittedToPage);
    }

    #[test]
    fn test_serializes_as_map() {
        let mut ledger = Ledger::new();
        ledger.put(record("7", Kind::Update));
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["7"]["kind"], "update");
        let back: Ledger = serde_json::from_value(json).unwrap();
        assert_eq!(back, ledger);
    }
}
