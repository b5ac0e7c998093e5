//! "Currently active" table fold.
//!
//! The managed region holds one wiki table row per active event or sale:
//!
//! ```text
//! |-
//! |Jun 1
//! |Jun 10
//! |[[Foo Bar]]
//! ```
//!
//! Rows are keyed by display name, compared case-insensitively, so a row
//! entered by hand suppresses the automated one for the same name.

use std::cmp::Ordering;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::classifier::BAD_IN_WIKI_LINK;
use crate::ledger::Ledger;
use crate::models::{Kind, Record, Timestamp};
use crate::selector::upcoming;
use crate::temporal::Normalizer;

/// Label of a current list's managed region.
pub const REGION: &str = "List";

static ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\|-\n\|(.*)\n\|(.*)\n\|(.*)").unwrap());
static WIKI_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[(?:([^|\]]+)\|)?([^\]]+)\]\]").unwrap());

/// A date cell: resolved, or kept as written when it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Date(Timestamp),
    Raw(String),
}

impl Cell {
    fn render(&self, normalizer: &Normalizer) -> String {
        match self {
            Cell::Date(ts) => normalizer.in_zone(ts).format("%b %-d").to_string(),
            Cell::Raw(text) => text.clone(),
        }
    }
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub start: Cell,
    pub end: Cell,
    pub name: String,
    /// Link target when it differs from `name`.
    pub target: Option<String>,
}

impl Row {
    fn render(&self, normalizer: &Normalizer) -> String {
        let link = match &self.target {
            Some(target) if *target != self.name => format!("[[{}|{}]]", target, self.name),
            _ => format!("[[{}]]", self.name),
        };
        format!(
            "|-\n|{}\n|{}\n|{}",
            self.start.render(normalizer),
            self.end.render(normalizer),
            link
        )
    }
}

/// Parse table rows. Rows without a wiki link are dropped; dates that cannot
/// be read are kept as written.
pub fn parse_rows(body: &str, now: &Timestamp, normalizer: &Normalizer) -> Vec<Row> {
    let mut rows = Vec::new();
    for caps in ROW.captures_iter(body) {
        let Some(link) = WIKI_LINK.captures(&caps[3]) else {
            warn!(cell = %&caps[3], "Dropping row without a wiki link");
            continue;
        };
        let (start_text, end_text) = (caps[1].trim(), caps[2].trim());
        let (start, end) = match normalizer.resolve_range(start_text, end_text, now) {
            Ok((start, end)) => (Cell::Date(start), Cell::Date(end)),
            Err(e) => {
                debug!(start = %start_text, end = %end_text, error = %e, "Keeping unreadable row dates as written");
                (Cell::Raw(start_text.to_string()), Cell::Raw(end_text.to_string()))
            }
        };
        rows.push(Row {
            start,
            end,
            name: link[2].trim().to_string(),
            target: link.get(1).map(|m| m.as_str().trim().to_string()),
        });
    }
    rows
}

/// Result of one fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldOutcome {
    /// New region body, or `None` when no row was added.
    pub body: Option<String>,
    /// Records whose rows were added.
    pub added: Vec<String>,
}

fn by_end(a: &Row, b: &Row) -> Ordering {
    match (&a.end, &b.end) {
        (Cell::Date(x), Cell::Date(y)) => x.cmp(y),
        (Cell::Date(_), Cell::Raw(_)) => Ordering::Less,
        (Cell::Raw(_), Cell::Date(_)) => Ordering::Greater,
        (Cell::Raw(_), Cell::Raw(_)) => Ordering::Equal,
    }
}

/// Display name and link target for a record's row.
///
/// A sale whose catalog title differs from the short name keeps the short
/// name on display and links to the catalog title.
fn link_names(record: &Record, kind: Kind) -> (String, Option<String>) {
    let clean = |text: &str| BAD_IN_WIKI_LINK.replace_all(text, "").trim().to_string();
    match kind {
        Kind::Sale => {
            let catalog = clean(record.arg(0).unwrap_or(record.title.as_str()));
            match record.arg(2).map(clean) {
                Some(short) if !short.is_empty() && short != catalog => (short, Some(catalog)),
                _ => (catalog, None),
            }
        }
        Kind::Event => (clean(record.arg(0).unwrap_or(record.title.as_str())), None),
        _ => (clean(&record.title), None),
    }
}

/// Fold started, not yet ended records of `kind` into the table `body`.
///
/// Ended rows are pruned, new rows are appended, and the whole table is
/// stable-sorted by end date. The ledger is only read.
///
/// # Arguments
///
/// * `body` - Current table rows from the managed region
/// * `ledger` - Records to draw from; only those on the news page count
/// * `kind` - `Event` or `Sale`
/// * `now` - Decides which rows have ended and which records have started
/// * `normalizer` - Reads row dates and writes them back in the configured zone
///
/// # Returns
///
/// A [`FoldOutcome`] with the new body and the ids of the records that
/// contributed rows. `body` is `None` when no row was added.
///
/// # Examples
///
/// ```ignore
/// let outcome = fold_current("|-\n|Jun 1\n|Jun 10\n|[[Foo Bar]]", &ledger, Kind::Event, &now, &normalizer);
/// assert!(outcome.body.is_none() || !outcome.added.is_empty());
/// ```
#[instrument(level = "info", skip_all, fields(%kind))]
pub fn fold_current(body: &str, ledger: &Ledger, kind: Kind, now: &Timestamp, normalizer: &Normalizer) -> FoldOutcome {
    let mut rows: Vec<Row> = parse_rows(body, now, normalizer)
        .into_iter()
        .filter(|row| match &row.end {
            Cell::Date(end) => end > now,
            Cell::Raw(_) => true,
        })
        .collect();

    let mut names: HashSet<String> = rows.iter().map(|row| row.name.to_lowercase()).collect();
    let mut added = Vec::new();
    for record in upcoming(ledger, kind, now, true) {
        let (Some(start), Some(end)) = (record.start(), record.end()) else {
            continue;
        };
        let (name, target) = link_names(record, kind);
        let listed = |text: &str| names.contains(&text.to_lowercase());
        if name.is_empty() || listed(&name) || target.as_deref().is_some_and(listed) {
            debug!(id = %record.id, %name, "Already listed");
            continue;
        }
        names.insert(name.to_lowercase());
        info!(id = %record.id, %name, target = ?target, "Adding current row");
        rows.push(Row {
            start: Cell::Date(start),
            end: Cell::Date(end),
            name,
            target,
        });
        added.push(record.id.clone());
    }

    if added.is_empty() {
        return FoldOutcome::default();
    }

    rows.sort_by(by_end);
    let body = rows
        .iter()
        .map(|row| row.render(normalizer))
        .collect::<Vec<_>>()
        .join("\n");
    FoldOutcome {
        body: Some(body),
        added,
    }
}
