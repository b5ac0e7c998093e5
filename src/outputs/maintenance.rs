//! Maintenance notice banner.

use tracing::debug;

use crate::ledger::Ledger;
use crate::models::{Kind, Timestamp};
use crate::selector::upcoming;
use crate::temporal::Normalizer;

const STAMP: &str = "%Y-%m-%d %I:%M:%S %p";

/// The notice for the next maintenance to finish, if one is announced.
///
/// Of several upcoming maintenances the one ending first wins.
pub fn render_notice(ledger: &Ledger, now: &Timestamp, normalizer: &Normalizer) -> Option<String> {
    let record = upcoming(ledger, Kind::Maintenance, now, false).into_iter().next()?;
    let (start, end) = (record.start()?, record.end()?);
    debug!(id = %record.id, %start, %end, "Selected upcoming maintenance");
    Some(format!(
        "{{{{Maintenance Notice\n|from={}\n|until={}\n}}}}",
        normalizer.in_zone(&start).format(STAMP),
        normalizer.in_zone(&end).format(STAMP),
    ))
}
