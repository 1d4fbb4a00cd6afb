//! Compensating actions for the multi-step resend
//!
//! The remote service has no transactions, so each step that creates
//! something records how to undo it. On a later failure the recorded steps
//! run in reverse. Cleanup is best effort: a failing compensation is logged
//! and the rest still run.

use log::{info, warn};

use crate::cache::ListIdCache;
use crate::models::{CampaignId, MailingList};
use crate::remote::MailingService;

/// Undo step for one remote artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Delete an ephemeral list by ID and drop it from the cache
    DeleteList(MailingList),
    /// Delete an incremental campaign that was never launched
    DeleteCampaign(CampaignId),
}

impl Compensation {
    fn run(&self, service: &dyn MailingService, lists: &ListIdCache) -> crate::Result<()> {
        match self {
            Self::DeleteList(list) => lists.delete(list),
            Self::DeleteCampaign(id) => service.delete_campaign(*id),
        }
    }
}

/// Stack of compensations pushed as steps succeed
#[derive(Debug, Default)]
pub struct Rollback {
    steps: Vec<Compensation>,
}

impl Rollback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Compensation] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Forget every recorded step; the work is committed
    pub fn discard(&mut self) {
        self.steps.clear();
    }

    /// Run recorded steps newest first, returning how many failed
    pub fn unwind(&mut self, service: &dyn MailingService, lists: &ListIdCache) -> usize {
        let mut failed = 0;
        while let Some(step) = self.steps.pop() {
            match step.run(service, lists) {
                Ok(()) => info!("Rolled back: {:?}", step),
                Err(e) => {
                    warn!("Rollback step {:?} failed: {}", step, e);
                    failed += 1;
                }
            }
        }
        failed
    }
}
