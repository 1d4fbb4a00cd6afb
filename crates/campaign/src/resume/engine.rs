//! Resume state machine

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::fmt;
use std::sync::Arc;

use super::{CampaignLeases, Compensation, Rollback, select_cutoff, stale_incrementals};
use crate::cache::ListIdCache;
use crate::error::Result;
use crate::models::{Campaign, CampaignId, CampaignStatus, MembershipAction, Subscriber, SubscriberId};
use crate::remote::{MailingService, SubscriberFilter};

/// What a resume invocation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// First launch of the campaign itself
    Launched,
    /// Incremental campaign created and launched for new subscribers
    Resumed {
        incremental: CampaignId,
        recipients: usize,
    },
    /// The campaign targets no lists; left untouched
    NoTargets,
    /// Nobody joined the target lists since the cutoff
    NoNewSubscribers,
}

impl ResumeOutcome {
    /// Whether anything was sent
    pub fn sent(&self) -> bool {
        matches!(self, Self::Launched | Self::Resumed { .. })
    }
}

impl fmt::Display for ResumeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Launched => f.write_str("launched"),
            Self::Resumed {
                incremental,
                recipients,
            } => write!(
                f,
                "resumed as campaign {} for {} new subscribers",
                incremental, recipients
            ),
            Self::NoTargets => f.write_str("skipped: no target lists"),
            Self::NoNewSubscribers => f.write_str("skipped: no new subscribers"),
        }
    }
}

/// Launches campaigns, or resends them to subscribers who joined since
///
/// Safe to share across threads. Invocations for the same campaign ID are
/// serialized; different campaigns proceed in parallel.
pub struct CampaignResumer {
    service: Arc<dyn MailingService>,
    lists: Arc<ListIdCache>,
    leases: CampaignLeases,
}

impl CampaignResumer {
    pub fn new(service: Arc<dyn MailingService>, lists: Arc<ListIdCache>) -> Self {
        Self {
            service,
            lists,
            leases: CampaignLeases::new(),
        }
    }

    /// Launch a campaign for the first time, or send it to new subscribers
    ///
    /// Remote failures abort the remaining steps. Artifacts created during
    /// the resend are cleaned up on a best-effort basis before the error is
    /// returned; a deleted stale incremental campaign stays deleted.
    pub fn resume(&self, id: CampaignId) -> Result<ResumeOutcome> {
        if self.leases.is_held(id) {
            info!("Campaign {} is already being resumed, waiting", id);
        }
        let _lease = self.leases.acquire(id);

        info!("Fetching campaign {} data", id);
        let campaign = self.service.get_campaign(id)?;

        if campaign.lists.is_empty() {
            warn!("Campaign {} targets no mailing lists, aborting", campaign.name);
            return Ok(ResumeOutcome::NoTargets);
        }

        if !campaign.is_started() {
            info!("Campaign {} has not been launched before, launching now", campaign.name);
            self.service
                .update_campaign_status(campaign.id, CampaignStatus::Running)?;
            info!("Launched campaign {}", campaign.name);
            return Ok(ResumeOutcome::Launched);
        }

        self.resend(&campaign)
    }

    fn resend(&self, campaign: &Campaign) -> Result<ResumeOutcome> {
        let cutoff = self.reclaim_incrementals(campaign)?;
        self.reclaim_audience_lists(campaign)?;
        let subscribers = self.new_subscribers(campaign, cutoff)?;

        if subscribers.is_empty() {
            warn!("No new subscribers for {} since {}, aborting", campaign.name, cutoff);
            return Ok(ResumeOutcome::NoNewSubscribers);
        }

        let mut ids: Vec<SubscriberId> = subscribers.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut rollback = Rollback::new();
        match self.send_incremental(campaign, &ids, &mut rollback) {
            Ok(outcome) => {
                info!("Resumed campaign {}", campaign.name);
                Ok(outcome)
            }
            Err(e) => {
                warn!("Resuming campaign {} failed: {}", campaign.name, e);
                let failed = rollback.unwind(self.service.as_ref(), &self.lists);
                if failed > 0 {
                    warn!("{} cleanup steps failed for campaign {}", failed, campaign.name);
                }
                Err(e)
            }
        }
    }

    /// Delete audience lists left behind by an earlier resend
    fn reclaim_audience_lists(&self, campaign: &Campaign) -> Result<()> {
        let name = campaign.audience_list_name();
        for list in self.service.list_lists()?.iter().filter(|l| l.name == name) {
            info!("Deleting leftover audience list {} ({})", list.name, list.id);
            self.lists.delete(list)?;
        }
        Ok(())
    }

    /// Delete leftover incremental campaigns and return the cutoff they imply
    fn reclaim_incrementals(&self, campaign: &Campaign) -> Result<DateTime<Utc>> {
        info!("Checking for an existing incremental campaign of {}", campaign.name);
        let campaigns = self.service.list_campaigns()?;
        let stale = stale_incrementals(campaign, &campaigns);

        for old in &stale {
            info!("Deleting previous incremental campaign {} ({})", old.name, old.id);
            self.service.delete_campaign(old.id)?;
        }

        // The base campaign is started, so a cutoff always exists
        let cutoff = select_cutoff(campaign, &stale).unwrap_or_else(Utc::now);
        info!("Cutoff for {} is {}", campaign.name, cutoff);
        Ok(cutoff)
    }

    /// Subscribers who joined any target list strictly after `cutoff`
    pub fn new_subscribers(&self, campaign: &Campaign, cutoff: DateTime<Utc>) -> Result<Vec<Subscriber>> {
        info!("Fetching new subscribers of {}", campaign.name);
        let filter = SubscriberFilter::joined_after(cutoff, campaign.list_ids());
        self.service.query_subscribers(&filter)
    }

    fn send_incremental(
        &self,
        campaign: &Campaign,
        subscribers: &[SubscriberId],
        rollback: &mut Rollback,
    ) -> Result<ResumeOutcome> {
        let audience = self.lists.create_and_register(&campaign.audience_list_name())?;
        rollback.push(Compensation::DeleteList(audience.clone()));
        info!(
            "Created list {} for {} new subscribers",
            audience.name,
            subscribers.len()
        );

        self.service
            .update_memberships(subscribers, &[audience.id], MembershipAction::Add)?;

        info!("Creating incremental campaign {}", campaign.incremental_name());
        let incremental = self
            .service
            .create_campaign(&campaign.incremental_draft(&audience))?;
        rollback.push(Compensation::DeleteCampaign(incremental.id));

        info!("Launching incremental campaign {}", incremental.id);
        self.service
            .update_campaign_status(incremental.id, CampaignStatus::Running)?;

        // Sent; nothing left that can be undone
        rollback.discard();

        self.lists.delete(&audience)?;

        Ok(ResumeOutcome::Resumed {
            incremental: incremental.id,
            recipients: subscribers.len(),
        })
    }
}
