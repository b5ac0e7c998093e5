//! Resolution of partial, year-less and loosely zoned date fragments.
//!
//! Publisher posts write dates like `June 3`, `Tuesday, June 4th 10:00 AM` or
//! `June 3, 2024 2:00 PM PDT`. [`Normalizer`] turns those into zoned
//! timestamps:
//!
//! - zone abbreviations listed as aliases map onto one configured IANA zone
//! - `UTC`/`GMT`/`Z` map onto UTC
//! - any other zone-looking word leaves the stamp naive, and naive stamps are
//!   localised into the configured zone before they are compared to anything
//!
//! Year inference follows two rules. A lone month/day is placed in the
//! posting year unless that day has already passed, in which case it belongs
//! to the following year. A start/end pair that comes out inverted is assumed
//! to straddle New Year, and whichever endpoint is impossible relative to the
//! current time is moved by one year.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{NewscastError, Result};
use crate::models::Timestamp;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

const FILLER: [&str; 6] = ["at", "on", "of", "the", "from", "until"];

/// A `Month day` pair such as `June 3` or `Sept 14`.
pub static MONTH_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-zA-Z]{3,}) (\d+)").unwrap());

static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?(?::(\d{2}))?(am|pm|a\.m\.|p\.m\.)?$").unwrap());

static ORDINAL_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,4})(st|nd|rd|th)?$").unwrap());

/// Month number (1-12) for a full or abbreviated English month name.
pub fn month_from_name(token: &str) -> Option<u32> {
    let token = token.trim_end_matches('.').to_ascii_lowercase();
    if token.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|name| name.starts_with(&token))
        .map(|i| i as u32 + 1)
}

fn is_weekday(token: &str) -> bool {
    token.len() >= 3 && WEEKDAYS.iter().any(|day| day.starts_with(token))
}

/// Add `years` to a local date-time, pinning Feb 29 to Feb 28 when needed.
fn shift_naive_years(naive: NaiveDateTime, years: i32) -> NaiveDateTime {
    let year = naive.year() + years;
    naive.with_year(year).unwrap_or_else(|| {
        let date = NaiveDate::from_ymd_opt(year, naive.month(), 28).unwrap_or(naive.date());
        date.and_time(naive.time())
    })
}

/// A parsed fragment before it has been pinned to a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedStamp {
    pub naive: NaiveDateTime,
    /// `None` when the text named no zone or a zone we do not recognise.
    pub zone: Option<Tz>,
    /// Whether the text itself carried a year.
    pub has_year: bool,
}

/// Date fragment resolver bound to one configured zone.
#[derive(Debug, Clone)]
pub struct Normalizer {
    zone: Tz,
    aliases: Vec<String>,
}

impl Normalizer {
    pub fn new<I, S>(zone: Tz, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Normalizer {
            zone,
            aliases: aliases
                .into_iter()
                .map(|alias| alias.as_ref().to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Zone abbreviations that resolve to the configured zone.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The abbreviation in effect in the configured zone on `date` (e.g. `PDT`).
    pub fn abbreviation_on(&self, date: NaiveDate) -> String {
        let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());
        match self.zone.from_local_datetime(&noon).earliest() {
            Some(dt) => dt.format("%Z").to_string(),
            None => String::new(),
        }
    }

    fn zone_for(&self, token: &str) -> Option<Option<Tz>> {
        let upper = token.to_ascii_uppercase();
        if self.aliases.iter().any(|alias| *alias == upper) {
            return Some(Some(self.zone));
        }
        match upper.as_str() {
            "UTC" | "GMT" | "Z" => Some(Some(chrono_tz::UTC)),
            _ if (2..=5).contains(&token.len())
                && token.chars().all(|c| c.is_ascii_uppercase()) =>
            {
                // Looks like a zone, but not one we know: stay naive.
                Some(None)
            }
            _ => None,
        }
    }

    /// Parse free-form date text, filling a missing year with `default_year`.
    pub fn parse(&self, text: &str, default_year: i32) -> Result<ParsedStamp> {
        let malformed = || NewscastError::MalformedDate(text.to_string());

        let mut month = None;
        let mut day = None;
        let mut year = None;
        let mut time: Option<(u32, u32, u32)> = None;
        let mut meridiem: Option<bool> = None;
        let mut zone = None;

        let cleaned = text.replace([',', '(', ')'], " ");
        for raw in cleaned.split_whitespace() {
            let lower = raw.to_ascii_lowercase();
            let lower = lower.trim_end_matches(':');

            if let Some(caps) = CLOCK.captures(lower).filter(|c| c.get(2).is_some() || c.get(4).is_some()) {
                let hour = caps[1].parse::<u32>().map_err(|_| malformed())?;
                let minute = caps.get(2).map_or(Ok(0), |m| m.as_str().parse()).map_err(|_| malformed())?;
                let second = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).map_err(|_| malformed())?;
                time = Some((hour, minute, second));
                if let Some(m) = caps.get(4) {
                    meridiem = Some(m.as_str().starts_with('p'));
                }
                continue;
            }
            if let Some(caps) = ORDINAL_DAY.captures(lower) {
                let digits = &caps[1];
                let value = digits.parse::<u32>().map_err(|_| malformed())?;
                if digits.len() == 4 || value > 31 {
                    year = Some(value as i32);
                } else if day.is_none() {
                    day = Some(value);
                } else {
                    return Err(malformed());
                }
                continue;
            }
            match lower {
                "am" | "a.m." => {
                    meridiem = Some(false);
                    continue;
                }
                "pm" | "p.m." => {
                    meridiem = Some(true);
                    continue;
                }
                "noon" => {
                    time = Some((12, 0, 0));
                    continue;
                }
                "midnight" => {
                    time = Some((0, 0, 0));
                    continue;
                }
                _ => {}
            }
            if month.is_none() {
                if let Some(m) = month_from_name(lower) {
                    month = Some(m);
                    continue;
                }
            }
            if is_weekday(lower) || FILLER.contains(&lower) {
                continue;
            }
            if let Some(z) = self.zone_for(raw.trim_end_matches(':')) {
                zone = z;
                continue;
            }
            return Err(malformed());
        }

        let month = month.ok_or_else(malformed)?;
        let day = day.ok_or_else(malformed)?;
        let (mut hour, minute, second) = time.unwrap_or((0, 0, 0));
        match meridiem {
            Some(true) if hour < 12 => hour += 12,
            Some(false) if hour == 12 => hour = 0,
            _ => {}
        }
        let has_year = year.is_some();
        let date = NaiveDate::from_ymd_opt(year.unwrap_or(default_year), month, day).ok_or_else(malformed)?;
        let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(malformed)?;

        Ok(ParsedStamp {
            naive: date.and_time(time),
            zone,
            has_year,
        })
    }

    /// Pin a local date-time to `zone`, moving past a DST gap if necessary.
    pub fn localize_in(&self, zone: Tz, naive: NaiveDateTime) -> Result<Timestamp> {
        zone.from_local_datetime(&naive)
            .earliest()
            .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| NewscastError::MalformedDate(naive.to_string()))
    }

    /// Pin a local date-time to the configured zone.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<Timestamp> {
        self.localize_in(self.zone, naive)
    }

    /// Resolve a parsed stamp, treating naive stamps as configured-zone local time.
    pub fn resolve(&self, stamp: ParsedStamp) -> Result<Timestamp> {
        self.localize_in(stamp.zone.unwrap_or(self.zone), stamp.naive)
    }

    /// Parse and resolve in one go.
    pub fn parse_zoned(&self, text: &str, default_year: i32) -> Result<Timestamp> {
        let stamp = self.parse(text, default_year)?;
        self.resolve(stamp)
    }

    /// Express any timestamp in the configured zone.
    pub fn in_zone(&self, ts: &Timestamp) -> DateTime<Tz> {
        ts.with_timezone(&self.zone)
    }

    /// Move a timestamp by whole years, keeping its wall-clock time in the
    /// configured zone.
    pub fn shift_years(&self, ts: &Timestamp, years: i32) -> Result<Timestamp> {
        let local = self.in_zone(ts).naive_local();
        self.localize(shift_naive_years(local, years))
    }

    /// Resolve a year-less month/day fragment against the posting time.
    ///
    /// The result is the first occurrence of that month/day that is not
    /// earlier than the calendar day of `posted`.
    pub fn resolve_month_day(&self, text: &str, posted: &Timestamp) -> Result<Timestamp> {
        let posted_local = self.in_zone(posted);
        let stamp = self.parse(text, posted_local.year())?;
        let resolved = self.resolve(stamp)?;
        let reference = self.localize(posted_local.date_naive().and_time(NaiveTime::MIN))?;
        if resolved < reference {
            self.shift_years(&resolved, 1)
        } else {
            Ok(resolved)
        }
    }

    /// Resolve a start/end pair, repairing a pair that straddles New Year.
    ///
    /// Fragments without a year take the year of `now`. When the start is
    /// still in the future the start is pulled back, otherwise the end is
    /// pushed forward, one year at a time until the start comes first. The
    /// returned pair always satisfies `start < end`.
    pub fn resolve_range(&self, start_text: &str, end_text: &str, now: &Timestamp) -> Result<(Timestamp, Timestamp)> {
        let year = self.in_zone(now).year();
        let start = self.parse_zoned(start_text, year)?;
        let end = self.parse_zoned(end_text, year)?;
        if start < end {
            return Ok((start, end));
        }

        let gap = (self.in_zone(&start).year() - self.in_zone(&end).year()).max(0) + 1;
        for years in 1..=gap {
            let (start, end) = if *now < start {
                (self.shift_years(&start, -years)?, end)
            } else {
                (start, self.shift_years(&end, years)?)
            };
            if start < end {
                return Ok((start, end));
            }
        }
        Err(NewscastError::MalformedDate(format!("{start_text} - {end_text}")))
    }

    /// Calendar day of `ts` in the configured zone.
    pub fn day_of(&self, ts: &Timestamp) -> NaiveDate {
        self.in_zone(ts).date_naive()
    }
}
