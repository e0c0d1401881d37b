//! Due-selection and frequency grouping for the batch driver.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::digest::{Digest, Frequency};

/// Whether a digest should run at `now`.
///
/// A digest that has never run is always due. Otherwise it is due once the
/// elapsed time reaches its frequency interval; the boundary is inclusive.
#[must_use]
pub fn is_due(last_run_at: Option<DateTime<Utc>>, frequency: Frequency, now: DateTime<Utc>) -> bool {
    match last_run_at {
        None => true,
        Some(last) => now.signed_duration_since(last) >= frequency.interval(),
    }
}

/// Select the active, due digests and group them by frequency.
///
/// Grouping is informational: it fixes iteration order (hourly, daily,
/// weekly) but never changes which digests are selected. Input order is
/// preserved within each group.
#[must_use]
pub fn group_due<I>(digests: I, now: DateTime<Utc>) -> BTreeMap<Frequency, Vec<Digest>>
where
    I: IntoIterator<Item = Digest>,
{
    let mut groups: BTreeMap<Frequency, Vec<Digest>> = BTreeMap::new();
    for digest in digests {
        if digest.active && is_due(digest.last_run_at, digest.frequency, now) {
            groups.entry(digest.frequency).or_default().push(digest);
        }
    }
    groups
}
