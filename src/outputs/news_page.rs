//! Day-bucketed news page merge.
//!
//! The managed region of the news page is a list of day blocks, newest first:
//!
//! ```text
//! ''June 3<sup>rd</sup>, 2024''
//! {{:Wiki Home/Maintenance (new)|...|src=12345|...}}
//! *The [[Foo Bar]] event has started. ...
//!
//! ''June 1<sup>st</sup>, 2024''
//! *A line someone wrote by hand.
//! ```
//!
//! Merging never rewrites an existing line. A candidate whose id already
//! appears in the text of its day (or any more recent candidate day) is
//! treated as published, which keeps re-runs idempotent even when the ledger
//! was not advanced.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::error::{NewscastError, Result};
use crate::ledger::Ledger;
use crate::outputs::region::Partition;
use crate::render::{Renderer, ordinal};
use crate::selector::{Candidate, PriorityTable, TEMPLATE_RANK};

/// Label of the news page's managed region.
pub const REGION: &str = "News";

static DAY_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^''([^']+)''(.*)$").unwrap());
static SUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<sup>.*?</sup>").unwrap());

/// The managed region parsed into day buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsPage {
    /// Lines before the first day header, kept as they are.
    pub preamble: Vec<String>,
    pub days: BTreeMap<NaiveDate, Vec<String>>,
}

/// `June 3<sup>rd</sup>, 2024` (or without the `<sup>`) to a date.
fn parse_header(text: &str) -> Result<NaiveDate> {
    let plain = SUP.replace_all(text, "");
    let plain = plain.trim();
    NaiveDate::parse_from_str(plain, "%B %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(plain, "%b %d, %Y"))
        .map_err(|_| NewscastError::MalformedDate(text.to_string()))
}

fn format_header(day: NaiveDate) -> String {
    format!(
        "''{} {}<sup>{}</sup>, {}''",
        day.format("%B"),
        day.day(),
        ordinal(day.day()),
        day.year()
    )
}

/// Parse the region body into day buckets.
pub fn parse_news(body: &str) -> Result<NewsPage> {
    let mut page = NewsPage::default();
    let mut current: Option<NaiveDate> = None;
    for line in body.lines().map(str::trim_end) {
        if let Some(caps) = DAY_HEADER.captures(line) {
            let day = parse_header(&caps[1])?;
            let bucket = page.days.entry(day).or_default();
            let rest = caps[2].trim();
            if !rest.is_empty() {
                bucket.push(rest.to_string());
            }
            current = Some(day);
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        match current {
            Some(day) => page.days.entry(day).or_default().push(line.to_string()),
            None => page.preamble.push(line.to_string()),
        }
    }
    if !page.preamble.is_empty() {
        warn!(lines = page.preamble.len(), "News region has lines before the first day header");
    }
    Ok(page)
}

/// True when `id` occurs in `text` with no ASCII letter or digit directly
/// on either side, so `123` does not match inside `41234`.
pub fn mentions_id(text: &str, id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    text.match_indices(id).any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after = text[at + id.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric()) && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

/// Result of one news merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsMerge {
    /// The new region body, or `None` when nothing was appended.
    pub body: Option<String>,
    /// Ids whose lines were appended.
    pub emitted: Vec<String>,
    /// Ids skipped because the page already mentions them.
    pub already_present: Vec<String>,
}

/// Fold `postable` into `page`.
///
/// The ledger is only read; the caller advances the returned ids once the
/// document has been written.
///
/// # Arguments
///
/// * `page` - The parsed news region
/// * `postable` - Output of [`find_postable`](crate::selector::find_postable)
/// * `ledger` - Source of the records behind each candidate
/// * `renderer` - Turns a record into its news line
/// * `table` - Ranks used to order each day's lines
///
/// # Returns
///
/// A [`NewsMerge`] whose `body` is `None` when every candidate was already
/// mentioned on the page, so the caller can skip the write.
///
/// # Errors
///
/// `MissingTemplateField` when a record lacks an argument its template needs.
#[instrument(level = "info", skip_all, fields(days = postable.len()))]
pub fn merge_news(
    page: NewsPage,
    postable: &BTreeMap<NaiveDate, Vec<Candidate>>,
    ledger: &Ledger,
    renderer: &Renderer<'_>,
    table: &PriorityTable,
) -> Result<NewsMerge> {
    let mut outcome = NewsMerge::default();

    let bullet = table.bullet_rank();
    let mut days: BTreeMap<NaiveDate, Vec<(String, usize)>> = page
        .days
        .into_iter()
        .map(|(day, lines)| {
            let ranked = lines
                .into_iter()
                .map(|line| {
                    let rank = if line.starts_with('*') { bullet } else { TEMPLATE_RANK };
                    (line, rank)
                })
                .collect();
            (day, ranked)
        })
        .collect();

    let mut seen = String::new();
    for (day, candidates) in postable.iter().rev() {
        let lines = days.entry(*day).or_default();
        for (line, _) in lines.iter() {
            seen.push_str(line);
            seen.push('\n');
        }

        let mut ordered: Vec<&Candidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

        for candidate in ordered {
            if mentions_id(&seen, &candidate.id) {
                debug!(id = %candidate.id, %day, "Already on the page; skipping");
                outcome.already_present.push(candidate.id.clone());
                continue;
            }
            let record = ledger
                .get(&candidate.id)
                .ok_or_else(|| NewscastError::UnknownRecord(candidate.id.clone()))?;
            let line = renderer.render(record)?;
            info!(id = %candidate.id, kind = %record.kind, %day, "Appending news line");
            lines.push((line, candidate.priority));
            outcome.emitted.push(candidate.id.clone());
        }

        lines.sort_by_key(|(_, rank)| *rank);
    }

    if outcome.emitted.is_empty() {
        return Ok(outcome);
    }

    let mut body = String::new();
    for line in &page.preamble {
        body.push_str(line);
        body.push('\n');
    }
    if !page.preamble.is_empty() {
        body.push('\n');
    }
    for (day, lines) in days.iter().rev() {
        let content = lines.iter().map(|(line, _)| line.as_str()).collect::<Vec<_>>().join("\n");
        if content.trim().is_empty() {
            continue;
        }
        body.push_str(&format_header(*day));
        body.push('\n');
        body.push_str(&content);
        body.push_str("\n\n");
    }
    outcome.body = Some(body.trim().to_string());
    Ok(outcome)
}

/// Merge into a whole partitioned document. Returns the new document text
/// alongside the merge outcome.
pub fn merge_document(
    partition: &Partition,
    postable: &BTreeMap<NaiveDate, Vec<Candidate>>,
    ledger: &Ledger,
    renderer: &Renderer<'_>,
    table: &PriorityTable,
) -> Result<(Option<String>, NewsMerge)> {
    let page = parse_news(&partition.body)?;
    let outcome = merge_news(page, postable, ledger, renderer, table)?;
    let text = outcome.body.as_deref().map(|body| partition.assemble(body));
    Ok((text, outcome))
}
