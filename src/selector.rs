//! Postable selection and the news priority table.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::ledger::Ledger;
use crate::models::{Kind, PublicationState, Record, Timestamp};
use crate::temporal::Normalizer;

/// Rank given to existing page lines that are not bullets (template output).
pub const TEMPLATE_RANK: usize = 0;

/// One position in the news ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Kind(Kind),
    /// A manual `*` line already on the page.
    FreeformBullet,
}

/// Ordering of news lines within one day, lowest rank first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    slots: Vec<Slot>,
}

impl Default for PriorityTable {
    fn default() -> Self {
        PriorityTable::new(vec![
            Slot::Kind(Kind::Maintenance),
            Slot::Kind(Kind::Update),
            Slot::Kind(Kind::Event),
            Slot::FreeformBullet,
            Slot::Kind(Kind::Sale),
            Slot::Kind(Kind::Unknown),
            Slot::Kind(Kind::ArtCorner),
        ])
    }
}

impl PriorityTable {
    pub fn new(slots: Vec<Slot>) -> Self {
        PriorityTable { slots }
    }

    fn rank(&self, slot: Slot) -> usize {
        self.slots.iter().position(|s| *s == slot).unwrap_or(self.slots.len())
    }

    /// Rank of a record kind. Kinds missing from the table sort last.
    pub fn rank_of_kind(&self, kind: Kind) -> usize {
        self.rank(Slot::Kind(kind))
    }

    pub fn bullet_rank(&self) -> usize {
        self.rank(Slot::FreeformBullet)
    }
}

/// A record selected for the news page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub priority: usize,
}

/// Pending records whose trigger date is not after `now`, bucketed by the
/// trigger's calendar day in the configured zone.
///
/// Within a day, candidates are listed in ledger (id) order.
///
/// # Arguments
///
/// * `ledger` - All known records; only `Pending` ones are considered
/// * `now` - Cut-off for the trigger date (posting time or window start)
/// * `normalizer` - Supplies the zone that decides each trigger's calendar day
/// * `table` - Priority ranks attached to each candidate
///
/// # Returns
///
/// Day buckets in ascending order. Records with a `Never` policy, or an
/// `OnStart` policy and no window start, never appear.
///
/// # Examples
///
/// ```ignore
/// let postable = find_postable(&ledger, &now, &normalizer, &PriorityTable::default());
/// for (day, candidates) in postable.iter().rev() {
///     println!("{day}: {}", candidates.len());
/// }
/// ```
pub fn find_postable(
    ledger: &Ledger,
    now: &Timestamp,
    normalizer: &Normalizer,
    table: &PriorityTable,
) -> BTreeMap<NaiveDate, Vec<Candidate>> {
    let mut postable: BTreeMap<NaiveDate, Vec<Candidate>> = BTreeMap::new();
    for record in ledger.all() {
        if record.state != PublicationState::Pending {
            continue;
        }
        let Some(trigger) = record.trigger_date() else {
            continue;
        };
        if trigger > *now {
            continue;
        }
        postable
            .entry(normalizer.day_of(&trigger))
            .or_default()
            .push(Candidate {
                id: record.id.clone(),
                priority: table.rank_of_kind(record.kind),
            });
    }
    postable
}

/// Records of `kind` already on the news page whose window has not ended,
/// soonest end first. With `started`, the window must also have begun.
pub fn upcoming<'l>(ledger: &'l Ledger, kind: Kind, now: &Timestamp, started: bool) -> Vec<&'l Record> {
    let mut found: Vec<&Record> = ledger
        .all()
        .filter(|r| r.kind == kind && r.state == PublicationState::EmittedToPage)
        .filter(|r| r.end().is_some_and(|end| end > *now))
        .filter(|r| !started || r.start().is_some_and(|start| start < *now))
        .collect();
    found.sort_by_key(|r| r.end());
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleMeta, PublishPolicy, Record, Window};
    use chrono::DateTime;

    fn ts(text: &str) -> Timestamp {
        DateTime::parse_from_rfc3339(text).unwrap()
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(chrono_tz::America::Los_Angeles, ["PST", "PDT"])
    }

    fn record(id: &str, kind: Kind, posted: &str, window: Option<Window>, policy: PublishPolicy) -> Record {
        let meta = ArticleMeta {
            id: id.to_string(),
            title: id.to_string(),
            category: String::new(),
            posted_at: ts(posted),
        };
        Record::new(&meta, kind, window, policy, vec![])
    }

    #[test]
    fn test_default_order() {
        let table = PriorityTable::default();
        let ranks: Vec<usize> = [Kind::Maintenance, Kind::Update, Kind::Event]
            .into_iter()
            .map(|k| table.rank_of_kind(k))
            .collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert_eq!(table.bullet_rank(), 3);
        assert_eq!(table.rank_of_kind(Kind::Sale), 4);
        assert_eq!(table.rank_of_kind(Kind::Unknown), 5);
        assert_eq!(table.rank_of_kind(Kind::ArtCorner), 6);
        assert_eq!(table.rank_of_kind(Kind::Skip), 7);
    }

    #[test]
    fn test_selects_by_policy_and_now() {
        let mut ledger = Ledger::new();
        ledger.put(record("posted", Kind::Update, "2024-06-01T09:00:00-07:00", None, PublishPolicy::OnPost));
        ledger.put(record("skip", Kind::Skip, "2024-06-01T09:00:00-07:00", None, PublishPolicy::Never));
        let started = Window::between(ts("2024-06-02T00:00:00-07:00"), ts("2024-06-10T00:00:00-07:00"));
        ledger.put(record("started", Kind::Event, "2024-05-30T09:00:00-07:00", Some(started), PublishPolicy::OnStart));
        let future = Window::between(ts("2024-06-20T00:00:00-07:00"), ts("2024-06-30T00:00:00-07:00"));
        ledger.put(record("future", Kind::Sale, "2024-05-30T09:00:00-07:00", Some(future), PublishPolicy::OnStart));
        ledger.put(record("done", Kind::Update, "2024-06-01T09:00:00-07:00", None, PublishPolicy::OnPost));
        ledger.advance("done", PublicationState::EmittedToPage).unwrap();

        let now = ts("2024-06-05T12:00:00-07:00");
        let postable = find_postable(&ledger, &now, &normalizer(), &PriorityTable::default());

        let june1 = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let june2 = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(postable.len(), 2);
        assert_eq!(
            postable[&june1],
            vec![Candidate {
                id: "posted".to_string(),
                priority: 1
            }]
        );
        assert_eq!(postable[&june2][0].id, "started");
        assert_eq!(postable[&june2][0].priority, 2);
    }

    #[test]
    fn test_day_uses_configured_zone() {
        let mut ledger = Ledger::new();
        // 03:00 UTC on June 2 is still June 1 in Los Angeles.
        ledger.put(record("late", Kind::Update, "2024-06-02T03:00:00Z", None, PublishPolicy::OnPost));
        let now = ts("2024-06-05T00:00:00Z");
        let postable = find_postable(&ledger, &now, &normalizer(), &PriorityTable::default());
        assert!(postable.contains_key(&NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
    }

    #[test]
    fn test_trigger_equal_to_now_is_postable() {
        let mut ledger = Ledger::new();
        ledger.put(record("edge", Kind::Update, "2024-06-01T09:00:00-07:00", None, PublishPolicy::OnPost));
        let now = ts("2024-06-01T09:00:00-07:00");
        assert_eq!(find_postable(&ledger, &now, &normalizer(), &PriorityTable::default()).len(), 1);
    }

    #[test]
    fn test_upcoming_filters_and_orders_by_end() {
        let mut ledger = Ledger::new();
        let window = |s: &str, e: &str| Some(Window::between(ts(s), ts(e)));
        let posted = "2024-05-30T09:00:00-07:00";
        ledger.put(record("late", Kind::Event, posted, window("2024-06-01T00:00:00-07:00", "2024-06-20T00:00:00-07:00"), PublishPolicy::OnStart));
        ledger.put(record("soon", Kind::Event, posted, window("2024-06-02T00:00:00-07:00", "2024-06-08T00:00:00-07:00"), PublishPolicy::OnStart));
        ledger.put(record("future", Kind::Event, posted, window("2024-06-07T00:00:00-07:00", "2024-06-09T00:00:00-07:00"), PublishPolicy::OnStart));
        ledger.put(record("over", Kind::Event, posted, window("2024-05-01T00:00:00-07:00", "2024-05-09T00:00:00-07:00"), PublishPolicy::OnStart));
        ledger.put(record("sale", Kind::Sale, posted, window("2024-06-01T00:00:00-07:00", "2024-06-09T00:00:00-07:00"), PublishPolicy::OnStart));
        ledger.put(record("pending", Kind::Event, posted, window("2024-06-01T00:00:00-07:00", "2024-06-09T00:00:00-07:00"), PublishPolicy::OnStart));
        for id in ["late", "soon", "future", "over", "sale"] {
            ledger.advance(id, PublicationState::EmittedToPage).unwrap();
        }

        let now = ts("2024-06-05T00:00:00-07:00");
        let ids = |records: Vec<&Record>| records.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(upcoming(&ledger, Kind::Event, &now, true)), vec!["soon", "late"]);
        assert_eq!(ids(upcoming(&ledger, Kind::Event, &now, false)), vec!["soon", "future", "late"]);
    }
}
