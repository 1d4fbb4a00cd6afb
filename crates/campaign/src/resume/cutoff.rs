//! Cutoff selection for incremental resends
//!
//! Pure functions that can be tested without a remote service.

use chrono::{DateTime, Utc};

use crate::models::Campaign;

/// Incremental campaigns left over from earlier resends of `base`
pub fn stale_incrementals<'a>(base: &Campaign, campaigns: &'a [Campaign]) -> Vec<&'a Campaign> {
    let name = base.incremental_name();
    campaigns
        .iter()
        .filter(|c| c.id != base.id && c.name == name)
        .collect()
}

/// Pick the instant after which list memberships count as new
///
/// The latest start among stale incremental campaigns wins; an incremental
/// campaign that never started reached nobody and does not move the cutoff.
/// Falls back to the base campaign's own start.
pub fn select_cutoff(base: &Campaign, stale: &[&Campaign]) -> Option<DateTime<Utc>> {
    stale
        .iter()
        .filter_map(|c| c.started_at)
        .max()
        .or(base.started_at)
}
