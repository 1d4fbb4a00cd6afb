//! Per-campaign exclusion
//!
//! Two resumes of the same campaign would both see "no incremental campaign
//! yet", compute the same delta and send it twice. A lease keyed by campaign
//! ID serializes them while leaving different campaigns independent.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

use crate::models::CampaignId;

/// Set of campaign IDs currently being resumed
#[derive(Debug, Default)]
pub struct CampaignLeases {
    held: Mutex<HashSet<CampaignId>>,
    released: Condvar,
}

impl CampaignLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no one else holds `id`, then take it
    pub fn acquire(&self, id: CampaignId) -> CampaignLease<'_> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(&id) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(id);
        CampaignLease { leases: self, id }
    }

    pub fn is_held(&self, id: CampaignId) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }
}

/// Exclusive hold on one campaign ID, released on drop
#[derive(Debug)]
pub struct CampaignLease<'a> {
    leases: &'a CampaignLeases,
    id: CampaignId,
}

impl Drop for CampaignLease<'_> {
    fn drop(&mut self) {
        let mut held = self
            .leases
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.id);
        self.leases.released.notify_all();
    }
}
