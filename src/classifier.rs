//! Article classification.
//!
//! Turns one article (listing metadata plus parsed body) into a [`Record`].
//! The rules are ordered and the first match wins:
//!
//! 1. patch notes are skipped, their items are announced individually
//! 2. maintenance notices get a window parsed from the zone-labelled time block
//! 3. update notices get a short display name
//! 4. sales get a name (catalog title when unambiguous) and an optional sale window
//! 5. events get a short name and an optional event window
//! 6. art corner posts
//! 7. everything else is `unknown`
//!
//! A malformed date anywhere degrades the article to `unknown` instead of
//! failing the run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::error::{NewscastError, Result};
use crate::markup::{MarkupNode, MarkupTree};
use crate::models::{ArticleMeta, Kind, PublishPolicy, Record, Timestamp, Window};
use crate::sources::CatalogLookup;
use crate::temporal::{MONTH_DAY, Normalizer, month_from_name};

/// Link markup and stray brackets that cannot appear inside a wiki link.
pub static BAD_IN_WIKI_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]|[\[\]|]").unwrap());

static SHOP_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"/shop/webshop/detail/cash/(\d+)").unwrap());
static ITEM_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(\d+\)$").unwrap());
static ZONE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^(]*\(\s*([A-Za-z]+)[^)]*\)").unwrap());

/// Sale and event ranges marked "after maintenance" start this much later.
const AFTER_MAINTENANCE: i64 = 7;

const SALE_LABEL: &str = "sale date";
const EVENT_LABEL: &str = "event date";

/// Best-effort display name for an article title.
///
/// Strips link markup, a leading "return of", a leading article or shop
/// prefix, and a trailing "returns" / "is back" / "preview".
pub fn short_name(title: &str) -> String {
    let cleaned = BAD_IN_WIKI_LINK.replace_all(title, "");
    let mut name = cleaned.trim();

    if let Some(rest) = strip_prefix_ci(name, "return of ") {
        name = rest;
    }
    for prefix in ["the ", "a ", "shopkeeper's sale: "] {
        if let Some(rest) = strip_prefix_ci(name, prefix) {
            name = rest;
            break;
        }
    }
    'ends: for ending in ["returns", "is back", "preview"] {
        for tail in ["", "!", ".", "?"] {
            let suffix = format!(" {ending}{tail}");
            if let Some(rest) = strip_suffix_ci(name, &suffix) {
                name = rest;
                break 'ends;
            }
        }
    }
    name.trim().to_string()
}

fn strip_prefix_ci<'s>(text: &'s str, prefix: &str) -> Option<&'s str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn strip_suffix_ci<'s>(text: &'s str, suffix: &str) -> Option<&'s str> {
    let at = text.len().checked_sub(suffix.len())?;
    let tail = text.get(at..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &text[..at])
}

/// Distinct catalog item ids linked from the article body.
pub fn catalog_ids(body: &MarkupTree) -> BTreeSet<String> {
    let Some(root) = body.root() else {
        return BTreeSet::new();
    };
    root.descendants()
        .into_iter()
        .filter_map(|n| n.attr("href"))
        .filter_map(|href| SHOP_LINK.captures(href).map(|c| c[1].to_string()))
        .collect()
}

/// Outcome of one classification rule before it is stamped onto a [`Record`].
struct Classified {
    kind: Kind,
    window: Option<Window>,
    policy: PublishPolicy,
    args: Vec<String>,
}

impl Classified {
    fn posted(kind: Kind, args: Vec<String>) -> Self {
        Classified {
            kind,
            window: None,
            policy: PublishPolicy::OnPost,
            args,
        }
    }

    fn dated(kind: Kind, window: Option<Window>, args: Vec<String>) -> Self {
        let policy = if window.is_some() {
            PublishPolicy::OnStart
        } else {
            PublishPolicy::OnPost
        };
        Classified {
            kind,
            window,
            policy,
            args,
        }
    }
}

/// Rule-based article classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    normalizer: Normalizer,
}

impl Classifier {
    pub fn new(normalizer: Normalizer) -> Self {
        Classifier { normalizer }
    }

    /// Classify one article. Never fails: malformed dates degrade to `unknown`.
    #[instrument(level = "debug", skip_all, fields(id = %meta.id))]
    pub fn classify<C: CatalogLookup>(&self, meta: &ArticleMeta, body: &MarkupTree, catalog: &C) -> Record {
        let classified = match self.apply_rules(meta, body, catalog) {
            Ok(classified) => classified,
            Err(e) => {
                warn!(id = %meta.id, title = %meta.title, error = %e, "Could not date article; marking unknown");
                Classified::posted(Kind::Unknown, Vec::new())
            }
        };
        debug!(id = %meta.id, kind = %classified.kind, "Classified article");
        Record::new(meta, classified.kind, classified.window, classified.policy, classified.args)
    }

    fn apply_rules<C: CatalogLookup>(&self, meta: &ArticleMeta, body: &MarkupTree, catalog: &C) -> Result<Classified> {
        let title = meta.title.to_lowercase();
        let category = meta.category.to_lowercase();
        let Some(root) = body.root() else {
            return Ok(Classified::posted(Kind::Unknown, Vec::new()));
        };

        if title.contains("patch note") {
            return Ok(Classified {
                kind: Kind::Skip,
                window: None,
                policy: PublishPolicy::Never,
                args: Vec::new(),
            });
        }

        if (category == "maintenance" || title.contains("maintenance")) && !title.contains("launcher") {
            return Ok(match self.maintenance(meta, root)? {
                Some((window, args)) => Classified {
                    kind: Kind::Maintenance,
                    window: Some(window),
                    policy: PublishPolicy::OnPost,
                    args,
                },
                None => Classified::posted(Kind::Unknown, Vec::new()),
            });
        }

        match category.as_str() {
            "updates" => {
                let name = first_segment(&short_name(&meta.title));
                let suffix = if name.to_lowercase().ends_with("update") { "" } else { " update" };
                return Ok(Classified::posted(Kind::Update, vec![name, suffix.to_string()]));
            }
            "sales" => {
                let window = self.labelled_window(root, SALE_LABEL, &meta.posted_at)?;
                let titles: BTreeSet<String> = catalog_ids(body)
                    .iter()
                    .filter_map(|id| catalog.resolve_item(id))
                    .map(|t| ITEM_COUNT.replace(&t, "").into_owned())
                    .collect();
                let short = first_segment(short_name(&meta.title).trim_end_matches('!'));
                let suffix = if title.contains("shopkeeper's sale") { " sale" } else { "" };
                // args: [display name, suffix, short name when the catalog title differs]
                let args = match titles.len() {
                    1 => {
                        let name = titles.into_iter().next().unwrap_or_default();
                        if name == short {
                            vec![name, suffix.to_string()]
                        } else {
                            vec![name, suffix.to_string(), short]
                        }
                    }
                    _ => vec![short, suffix.to_string()],
                };
                return Ok(Classified::dated(Kind::Sale, window, args));
            }
            "events" => {
                let window = self.labelled_window(root, EVENT_LABEL, &meta.posted_at)?;
                let name = short_name(&meta.title);
                let suffix = if name.to_lowercase().ends_with(" event") { "" } else { " event" };
                return Ok(Classified::dated(Kind::Event, window, vec![name, suffix.to_string()]));
            }
            _ => {}
        }

        if title.contains("art corner") {
            return Ok(Classified::posted(Kind::ArtCorner, Vec::new()));
        }
        Ok(Classified::posted(Kind::Unknown, Vec::new()))
    }

    /// Locate the maintenance day heading, read its zone-labelled time block
    /// and produce the window plus the four maintenance arguments.
    fn maintenance<'a, N: MarkupNode<'a>>(&self, meta: &ArticleMeta, root: N) -> Result<Option<(Window, Vec<String>)>> {
        let Some((mut element, day)) = self.maintenance_heading(root, &meta.posted_at)? else {
            return Ok(None);
        };

        let time_block = loop {
            if let Some(next) = element.next_element_sibling() {
                break next;
            }
            match element.parent() {
                Some(parent) => element = parent,
                None => return Ok(None),
            }
        };

        let mut block_text = String::new();
        for child in time_block.children() {
            match child.tag() {
                Some("br") => block_text.push('\n'),
                _ => block_text.push_str(&child.text()),
            }
        }

        let day_text = day.format("%B %-d, %Y").to_string();
        let mut windows: BTreeMap<String, (String, String, bool)> = BTreeMap::new();
        for line in block_text.lines() {
            let Some(caps) = ZONE_LABEL.captures(line) else {
                continue;
            };
            let label = caps[1].to_ascii_uppercase();
            let rest = &line[caps.get(0).map_or(0, |m| m.end())..];
            let Some((_, times)) = rest.split_once(':') else {
                continue;
            };
            let Some((start, end)) = times.split_once('-') else {
                continue;
            };
            let (start, end) = (start.trim(), end.trim());
            let start = format!("{day_text} {start}");
            let (end, own_date) = if end.contains(',') {
                // e.g. "10:00 AM, Tuesday, June 4th"
                let parts: Vec<&str> = end.split(',').map(str::trim).collect();
                let last = parts.last().copied().unwrap_or_default();
                (format!("{last} {}", parts[0]), true)
            } else {
                (format!("{day_text} {end}"), false)
            };
            windows.insert(label, (start, end, own_date));
        }

        let aliases = self.normalizer.aliases();
        let in_effect = self.normalizer.abbreviation_on(day);
        let preference = std::iter::once(&in_effect).chain(aliases.iter().filter(|a| **a != in_effect));
        let Some((label, (mut start, mut end, own_date))) = preference
            .filter_map(|label| windows.get(label).map(|w| (label.clone(), w.clone())))
            .next()
        else {
            debug!(id = %meta.id, "No zone-labelled maintenance times found");
            return Ok(None);
        };

        if !start.contains(&label) && !aliases.iter().any(|a| start.contains(a.as_str())) {
            start = format!("{start} {label}");
        }
        if !aliases.iter().any(|a| end.contains(a.as_str())) {
            end = format!("{end} {label}");
        }

        let start = self.normalizer.parse_zoned(&start, day.year())?;
        let mut end = self.normalizer.parse_zoned(&end, day.year())?;
        if end < start && own_date {
            end = self.normalizer.shift_years(&end, 1)?;
        }
        if end < start {
            // Overnight maintenance.
            end += Duration::days(1);
        }

        let seconds = (end - start).num_seconds();
        let hours = (seconds + 3599) / 3600;
        let title = meta.title.to_lowercase();
        let is_update = root
            .find_all("a")
            .into_iter()
            .any(|a| a.text().trim_end().to_lowercase().ends_with("update"));
        let flag = |b: bool| (if b { "y" } else { "n" }).to_string();

        let args = vec![
            flag(!title.contains("unscheduled")),
            flag(is_update),
            format!("{hours} hours"),
            flag(title.contains("complete")),
        ];
        Ok(Some((Window::between(start, end), args)))
    }

    /// First `<strong>` then `<h4>` whose text names a month and day.
    ///
    /// The day takes the posting year unless the whole day is already over at
    /// posting time, in which case it is next year.
    fn maintenance_heading<'a, N: MarkupNode<'a>>(&self, root: N, posted: &Timestamp) -> Result<Option<(N, NaiveDate)>> {
        let posted_year = self.normalizer.in_zone(posted).year();
        let candidates = root.find_all("strong").into_iter().chain(root.find_all("h4"));
        for element in candidates {
            let text = element.text();
            let Some(caps) = MONTH_DAY.captures(&text) else {
                continue;
            };
            let Some(month) = month_from_name(&caps[1]) else {
                continue;
            };
            let Ok(day) = caps[2].parse::<u32>() else {
                continue;
            };
            let Some(date) = NaiveDate::from_ymd_opt(posted_year, month, day) else {
                continue;
            };
            let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
            let end_of_day = self.normalizer.localize(date.and_time(last_second))?;
            let date = if end_of_day < *posted {
                date.with_year(posted_year + 1).unwrap_or(date)
            } else {
                date
            };
            return Ok(Some((element, date)));
        }
        Ok(None)
    }

    /// Find a `"<label>: X - Y"` range near any element flagged `notice`.
    ///
    /// For each notice the label is searched among its preceding siblings,
    /// then among the preceding siblings of up to two further ancestors.
    fn labelled_window<'a, N: MarkupNode<'a>>(&self, root: N, label: &str, posted: &Timestamp) -> Result<Option<Window>> {
        let has_dash = |n: N| n.string().is_some_and(|s| s.contains('-'));

        for notice in root.find_all_with_class("notice") {
            let mut node = notice;
            let mut labelled = false;
            for _ in 0..3 {
                if node
                    .previous_siblings()
                    .into_iter()
                    .any(|s| s.text().to_lowercase().contains(label))
                {
                    labelled = true;
                    break;
                }
                match node.parent() {
                    Some(parent) => node = parent,
                    None => break,
                }
            }
            if !has_dash(node) {
                if let Some(child) = node.children().into_iter().find(|c| has_dash(*c)) {
                    node = child;
                }
            }
            if !labelled {
                continue;
            }
            let Some(range) = node.string().filter(|s| s.contains('-')) else {
                continue;
            };
            let (start, end) = range.split_once('-').unwrap_or((range.as_str(), ""));
            return self.resolve_labelled_range(start, end, posted).map(Some);
        }
        Ok(None)
    }

    fn resolve_labelled_range(&self, start: &str, end: &str, posted: &Timestamp) -> Result<Window> {
        let endpoint = |text: &str| -> Result<Timestamp> {
            let fragment = MONTH_DAY
                .find(text)
                .ok_or_else(|| NewscastError::MalformedDate(text.trim().to_string()))?;
            let mut ts = self.normalizer.resolve_month_day(fragment.as_str(), posted)?;
            if text.to_lowercase().contains("maintenance") {
                ts += Duration::hours(AFTER_MAINTENANCE);
            }
            Ok(ts)
        };
        let mut start = endpoint(start)?;
        let end = endpoint(end)?;
        if start > end {
            // The range began before the post went live.
            start = self.normalizer.shift_years(&start, -1)?;
        }
        Ok(Window::between(start, end))
    }
}

fn first_segment(name: &str) -> String {
    name.split(" - ").next().unwrap_or(name).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_html;
    use crate::models::PublicationState;
    use std::collections::HashMap;

    fn classifier() -> Classifier {
        Classifier::new(Normalizer::new(chrono_tz::America::Los_Angeles, ["PST", "PDT"]))
    }

    fn posted(y: i32, m: u32, d: u32) -> Timestamp {
        classifier()
            .normalizer
            .localize(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(9, 0, 0).unwrap())
            .unwrap()
    }

    fn meta(title: &str, category: &str, at: Timestamp) -> ArticleMeta {
        ArticleMeta {
            id: "12345".to_string(),
            title: title.to_string(),
            category: category.to_string(),
            posted_at: at,
        }
    }

    fn no_catalog() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("The Foo Bar Returns!"), "Foo Bar");
        assert_eq!(short_name("Return of the Golden Week"), "Golden Week");
        assert_eq!(short_name("A Winter Festival is back"), "Winter Festival");
        assert_eq!(short_name("Shopkeeper's Sale: Bunny Ears"), "Bunny Ears");
        assert_eq!(short_name("[Event] Winter Preview"), "Winter");
        assert_eq!(short_name("Pipe | Dream"), "Pipe  Dream");
        assert_eq!(short_name("Theater Update"), "Theater Update");
    }

    #[test]
    fn test_patch_notes_are_skipped() {
        let body = parse_html("<p>Everything changed</p>");
        let r = classifier().classify(&meta("Patch Notes - June 3", "maintenance", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::Skip);
        assert_eq!(r.publish_policy, PublishPolicy::Never);
    }

    #[test]
    fn test_maintenance_window() {
        let html = r#"
            <p><strong>June 3</strong></p>
            <p>(PDT): 10:00 AM - 2:00 PM<br>(UTC): 5:00 PM - 9:00 PM</p>
            <p>Patch notes: <a href="/news/1">Summer Update</a></p>
        "#;
        let body = parse_html(html);
        let r = classifier().classify(
            &meta("Scheduled Maintenance", "maintenance", posted(2024, 6, 1)),
            &body,
            &no_catalog(),
        );
        assert_eq!(r.kind, Kind::Maintenance);
        assert_eq!(r.publish_policy, PublishPolicy::OnPost);
        assert_eq!(r.start().unwrap().to_rfc3339(), "2024-06-03T10:00:00-07:00");
        assert_eq!(r.end().unwrap().to_rfc3339(), "2024-06-03T14:00:00-07:00");
        assert_eq!(r.args, vec!["y", "y", "4 hours", "n"]);
        assert_eq!(r.state, PublicationState::Pending);
    }

    #[test]
    fn test_maintenance_prefers_zone_in_effect() {
        // DST ends on November 3rd, so the PST line is the one that applies.
        let html = "<p><strong>November 3</strong></p><p>(PDT): 10:00 AM - 2:00 PM<br>(PST): 9:00 AM - 1:00 PM</p>";
        let r = classifier().classify(&meta("Maintenance", "maintenance", posted(2024, 11, 1)), &parse_html(html), &no_catalog());
        assert_eq!(r.start().unwrap().to_rfc3339(), "2024-11-03T09:00:00-08:00");
        assert_eq!(r.end().unwrap().to_rfc3339(), "2024-11-03T13:00:00-08:00");
        assert_eq!(r.args[2], "4 hours");

        // DST starts on March 10th, so the PDT line wins even when listed second.
        let html = "<p><strong>March 10</strong></p><p>(PST): 8:00 AM - 12:00 PM<br>(PDT): 9:00 AM - 1:00 PM</p>";
        let r = classifier().classify(&meta("Maintenance", "maintenance", posted(2024, 3, 8)), &parse_html(html), &no_catalog());
        assert_eq!(r.start().unwrap().to_rfc3339(), "2024-03-10T09:00:00-07:00");
        assert_eq!(r.end().unwrap().to_rfc3339(), "2024-03-10T13:00:00-07:00");
    }

    #[test]
    fn test_maintenance_alternate_zone_text_maps_to_zone() {
        // The chosen PST line writes its start with the other alias.
        let html = "<p><strong>November 3</strong></p><p>(PDT): 10:00 AM - 2:00 PM<br>(PST): 9:00 AM PDT - 1:00 PM</p>";
        let r = classifier().classify(&meta("Maintenance", "maintenance", posted(2024, 11, 1)), &parse_html(html), &no_catalog());
        assert_eq!(r.start().unwrap().to_rfc3339(), "2024-11-03T09:00:00-08:00");
        assert_eq!(r.end().unwrap().to_rfc3339(), "2024-11-03T13:00:00-08:00");

        // Only the alternate zone is listed; its times are read in the configured zone.
        let html = "<p><strong>December 4</strong></p><p>(PDT): 10:00 AM - 2:00 PM</p>";
        let r = classifier().classify(&meta("Maintenance", "maintenance", posted(2024, 12, 1)), &parse_html(html), &no_catalog());
        assert_eq!(r.start().unwrap().to_rfc3339(), "2024-12-04T10:00:00-08:00");
        assert_eq!(r.end().unwrap().to_rfc3339(), "2024-12-04T14:00:00-08:00");
    }

    #[test]
    fn test_maintenance_overnight_rolls_end() {
        let html = "<h4>Dec 10</h4><p>Pacific (PST, UTC-8): 11:00 PM - 3:30 AM</p>";
        let body = parse_html(html);
        let r = classifier().classify(
            &meta("Unscheduled Maintenance Complete", "maintenance", posted(2024, 12, 9)),
            &body,
            &no_catalog(),
        );
        assert_eq!(r.kind, Kind::Maintenance);
        assert_eq!(r.start().unwrap().to_rfc3339(), "2024-12-10T23:00:00-08:00");
        assert_eq!(r.end().unwrap().to_rfc3339(), "2024-12-11T03:30:00-08:00");
        assert_eq!(r.args, vec!["n", "n", "5 hours", "y"]);
    }

    #[test]
    fn test_maintenance_end_with_own_date() {
        let html = "<p><strong>June 3</strong></p><p>(PDT): 10:00 PM - 10:00 AM, Tuesday, June 4th</p>";
        let body = parse_html(html);
        let r = classifier().classify(&meta("Extended Maintenance", "news", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::Maintenance);
        assert_eq!(r.end().unwrap().to_rfc3339(), "2024-06-04T10:00:00-07:00");
        assert_eq!(r.args[2], "12 hours");
    }

    #[test]
    fn test_maintenance_heading_in_past_rolls_year() {
        let html = "<p><strong>Jan 2</strong></p><p>(PST): 1:00 AM - 2:00 AM</p>";
        let body = parse_html(html);
        let r = classifier().classify(&meta("Maintenance", "maintenance", posted(2024, 12, 28)), &body, &no_catalog());
        assert_eq!(r.start().unwrap().to_rfc3339(), "2025-01-02T01:00:00-08:00");
    }

    #[test]
    fn test_maintenance_without_times_is_unknown() {
        let body = parse_html("<p><strong>June 3</strong></p><p>We will be back soon.</p>");
        let r = classifier().classify(&meta("Maintenance", "maintenance", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::Unknown);
        assert_eq!(r.publish_policy, PublishPolicy::OnPost);
        assert!(r.window.is_none());
    }

    #[test]
    fn test_launcher_notice_is_not_maintenance() {
        let body = parse_html("<p>Launcher maintenance</p>");
        let r = classifier().classify(&meta("Launcher Maintenance", "notices", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::Unknown);
    }

    #[test]
    fn test_update_name_and_suffix() {
        let body = parse_html("<p>Details</p>");
        let c = classifier();
        let r = c.classify(&meta("The Dragon Raid - Part 2", "updates", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::Update);
        assert_eq!(r.args, vec!["Dragon Raid", " update"]);
        let r = c.classify(&meta("Summer Update Preview", "updates", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.args, vec!["Summer Update", ""]);
    }

    #[test]
    fn test_event_with_labelled_dates() {
        let html = r#"<p><strong>Event Date:</strong></p><p class="notice">June 1 - June 10</p>"#;
        let body = parse_html(html);
        let r = classifier().classify(&meta("The Foo Bar Returns!", "events", posted(2024, 5, 28)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::Event);
        assert_eq!(r.args, vec!["Foo Bar", " event"]);
        assert_eq!(r.publish_policy, PublishPolicy::OnStart);
        assert_eq!(r.start().unwrap().to_rfc3339(), "2024-06-01T00:00:00-07:00");
        assert_eq!(r.end().unwrap().to_rfc3339(), "2024-06-10T00:00:00-07:00");
    }

    #[test]
    fn test_event_label_found_on_ancestor() {
        let html = r#"
            <div><h3>Event Date</h3>
              <div><p><span class="notice">June 5 after maintenance - June 20</span></p></div>
            </div>"#;
        let body = parse_html(html);
        let r = classifier().classify(&meta("Fishing Event", "events", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.publish_policy, PublishPolicy::OnStart);
        assert_eq!(r.start().unwrap().to_rfc3339(), "2024-06-05T07:00:00-07:00");
        assert_eq!(r.args, vec!["Fishing Event", ""]);
    }

    #[test]
    fn test_event_without_dates_posts_immediately() {
        let body = parse_html("<p>Soon!</p>");
        let r = classifier().classify(&meta("Summer Event", "events", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::Event);
        assert_eq!(r.publish_policy, PublishPolicy::OnPost);
        assert!(r.window.is_none());
    }

    #[test]
    fn test_event_with_broken_dates_is_unknown() {
        let html = r#"<p>Event Date:</p><p class="notice">Soon - Later</p>"#;
        let body = parse_html(html);
        let r = classifier().classify(&meta("Summer Event", "events", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::Unknown);
    }

    #[test]
    fn test_sale_single_catalog_title_wins() {
        let html = r#"
            <p>Sale Date:</p><p class="notice">June 3 - June 17</p>
            <a href="https://example.com/shop/webshop/detail/cash/11">A</a>
            <a href="https://example.com/shop/webshop/detail/cash/12">B</a>"#;
        let body = parse_html(html);
        let catalog: HashMap<String, String> = [
            ("11".to_string(), "Potion Pack (10)".to_string()),
            ("12".to_string(), "Potion Pack (20)".to_string()),
        ]
        .into_iter()
        .collect();
        let r = classifier().classify(&meta("Shopkeeper's Sale: Potions!", "sales", posted(2024, 6, 1)), &body, &catalog);
        assert_eq!(r.kind, Kind::Sale);
        assert_eq!(r.args, vec!["Potion Pack", " sale", "Potions"]);
        assert_eq!(r.publish_policy, PublishPolicy::OnStart);
        assert_eq!(r.start().unwrap().to_rfc3339(), "2024-06-03T00:00:00-07:00");
    }

    #[test]
    fn test_sale_keeps_short_name_when_catalog_title_differs() {
        let body = parse_html(r#"<a href="/shop/webshop/detail/cash/11">Buy</a>"#);
        let catalog: HashMap<String, String> = [("11".to_string(), "Potion Pack (10)".to_string())].into_iter().collect();

        let r = classifier().classify(&meta("The Alchemy Bundle Returns!", "sales", posted(2024, 6, 1)), &body, &catalog);
        assert_eq!(r.args, vec!["Potion Pack", "", "Alchemy Bundle"]);

        let r = classifier().classify(&meta("Potion Pack Returns!", "sales", posted(2024, 6, 1)), &body, &catalog);
        assert_eq!(r.args, vec!["Potion Pack", ""]);
    }

    #[test]
    fn test_sale_falls_back_to_short_name() {
        let html = r#"
            <a href="/shop/webshop/detail/cash/11">A</a>
            <a href="/shop/webshop/detail/cash/12">B</a>
            <a href="/shop/webshop/detail/cash/13">C</a>"#;
        let body = parse_html(html);
        let catalog: HashMap<String, String> = [
            ("11".to_string(), "Hat".to_string()),
            ("12".to_string(), "Boots".to_string()),
        ]
        .into_iter()
        .collect();
        let r = classifier().classify(&meta("The Outfit Sale Returns! - Limited", "sales", posted(2024, 6, 1)), &body, &catalog);
        assert_eq!(r.args, vec!["Outfit Sale Returns!", ""]);
        assert_eq!(r.publish_policy, PublishPolicy::OnPost);
    }

    #[test]
    fn test_catalog_ids_are_distinct() {
        let body = parse_html(
            r#"<a href="/shop/webshop/detail/cash/7">x</a><a href="/shop/webshop/detail/cash/7">y</a><a href="/news/9">z</a>"#,
        );
        let ids: Vec<String> = catalog_ids(&body).into_iter().collect();
        assert_eq!(ids, vec!["7"]);
    }

    #[test]
    fn test_art_corner_and_unknown() {
        let body = parse_html("<p>Art!</p>");
        let c = classifier();
        let r = c.classify(&meta("Art Corner: June", "community", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::ArtCorner);
        assert_eq!(r.publish_policy, PublishPolicy::OnPost);
        let r = c.classify(&meta("Community Spotlight", "community", posted(2024, 6, 1)), &body, &no_catalog());
        assert_eq!(r.kind, Kind::Unknown);
    }
}
