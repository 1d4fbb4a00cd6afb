//! Incremental campaign resume engine
//!
//! Launching a campaign twice only reaches subscribers who joined its
//! target lists since the previous launch. Each invocation performs exactly
//! one of first launch, no-op, or incremental resend.

mod cutoff;
mod engine;
mod lease;
mod rollback;

pub use cutoff::{select_cutoff, stale_incrementals};
pub use engine::{CampaignResumer, ResumeOutcome};
pub use lease::{CampaignLease, CampaignLeases};
pub use rollback::{Compensation, Rollback};
