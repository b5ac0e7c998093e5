//! News line rendering.
//!
//! Each kind has a fixed wiki-markup template. Maintenance, event and sale
//! templates are further picked by the window signature (`"11"` when both
//! endpoints are known, `"01"` for an end only, ...).

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use crate::classifier::BAD_IN_WIKI_LINK;
use crate::error::{NewscastError, Result};
use crate::models::{Kind, Record, Timestamp, Window};
use crate::temporal::Normalizer;

const ORDINAL: [&str; 10] = ["th", "st", "nd", "rd", "th", "th", "th", "th", "th", "th"];

/// English ordinal suffix for a day of the month.
pub fn ordinal(day: u32) -> &'static str {
    if (10..=20).contains(&day) {
        "th"
    } else {
        ORDINAL[(day % 10) as usize]
    }
}

/// `June 3<sup>rd</sup>`
pub fn long_day(date: &DateTime<Tz>) -> String {
    format!("{} {}<sup>{}</sup>", date.format("%B"), date.day(), ordinal(date.day()))
}

fn utc_iso(ts: &Timestamp) -> String {
    ts.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Renders news lines for records.
#[derive(Debug, Clone)]
pub struct Renderer<'a> {
    normalizer: &'a Normalizer,
    article_url: &'a str,
}

impl<'a> Renderer<'a> {
    /// `article_url` is the public article URL with an `{id}` placeholder.
    pub fn new(normalizer: &'a Normalizer, article_url: &'a str) -> Self {
        Renderer { normalizer, article_url }
    }

    fn link(&self, record: &Record) -> String {
        self.article_url.replace("{id}", &record.id)
    }

    fn arg<'r>(record: &'r Record, index: usize) -> Result<&'r str> {
        const NAMES: [&str; 4] = ["arg0", "arg1", "arg2", "arg3"];
        record.arg(index).ok_or_else(|| NewscastError::MissingTemplateField {
            id: record.id.clone(),
            kind: record.kind,
            field: NAMES.get(index).copied().unwrap_or("arg"),
        })
    }

    fn endpoint(record: &Record, value: Option<Timestamp>, field: &'static str) -> Result<Timestamp> {
        value.ok_or_else(|| NewscastError::MissingTemplateField {
            id: record.id.clone(),
            kind: record.kind,
            field,
        })
    }

    /// The news line for `record`.
    ///
    /// A template field the record does not carry is a
    /// [`NewscastError::MissingTemplateField`].
    pub fn render(&self, record: &Record) -> Result<String> {
        let link = self.link(record);
        let signature = Window::signature(record.window.as_ref());
        let start = record.start().map(|ts| self.normalizer.in_zone(&ts));
        let end = record.end().map(|ts| self.normalizer.in_zone(&ts));

        match record.kind {
            Kind::Maintenance => {
                let start = Self::endpoint(record, record.start(), "start")?;
                let end = Self::endpoint(record, record.end(), "end")?;
                Ok(format!(
                    "{{{{:Wiki Home/Maintenance (new)|isScheduled={}|isUpdate={}|startUTC={}|endUTC={}|length={}|src={}|ended={}}}}}",
                    Self::arg(record, 0)?,
                    Self::arg(record, 1)?,
                    utc_iso(&start),
                    utc_iso(&end),
                    Self::arg(record, 2)?,
                    record.id,
                    Self::arg(record, 3)?,
                ))
            }
            Kind::Event => {
                let (name, suffix) = (Self::arg(record, 0)?, Self::arg(record, 1)?);
                match (signature, end) {
                    ("01" | "11", Some(end)) => Ok(format!(
                        "*The [[{name}]]{suffix} has started and runs until {}. For more information, see [{link} here.]",
                        long_day(&end)
                    )),
                    _ => Ok(format!(
                        "*The [[{name}]]{suffix} has started. For more information, see [{link} here.]"
                    )),
                }
            }
            Kind::Sale => {
                let (name, suffix) = (Self::arg(record, 0)?, Self::arg(record, 1)?);
                let from = start.as_ref().map(long_day).unwrap_or_else(|| "???".to_string());
                let to = end.as_ref().map(long_day).unwrap_or_else(|| "???".to_string());
                Ok(format!(
                    "*The [[{name}]]{suffix} is now available for a limited time from {from} to {to}. For more information, see [{link} here.]"
                ))
            }
            Kind::Update => Ok(format!(
                "*The {}{} has been announced. For more information, see [{link} here.]",
                Self::arg(record, 0)?,
                Self::arg(record, 1)?,
            )),
            Kind::ArtCorner => {
                let posted = self.normalizer.in_zone(&record.posted_at);
                Ok(format!(
                    "*The art corner for {} is up! Check out the featured artists [{link} here.]",
                    posted.format("%B")
                ))
            }
            Kind::Unknown | Kind::Skip => {
                let name_safe = BAD_IN_WIKI_LINK.replace_all(&record.title, "");
                Ok(format!("*[{link} {name_safe}] (Please add details.)"))
            }
        }
    }
}
