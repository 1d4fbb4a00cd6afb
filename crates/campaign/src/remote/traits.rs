//! Remote service trait definition

use crate::error::Result;
use crate::models::{
    Campaign, CampaignId, CampaignStatus, ListId, MailingList, MembershipAction, NewCampaign,
    NewSubscriber, Subscriber, SubscriberId,
};

use super::SubscriberFilter;

/// Operations the engine requires from the remote mailing service
///
/// Every call is blocking and independent; the service offers no
/// transactions across calls.
pub trait MailingService: Send + Sync {
    /// List every mailing list
    fn list_lists(&self) -> Result<Vec<MailingList>>;

    /// Create a list with the given name
    fn create_list(&self, name: &str) -> Result<MailingList>;

    /// Delete a list and all of its membership rows
    fn delete_list(&self, id: ListId) -> Result<()>;

    /// Get a campaign by ID, failing with `NotFound` if it does not exist
    fn get_campaign(&self, id: CampaignId) -> Result<Campaign>;

    /// List every campaign
    fn list_campaigns(&self) -> Result<Vec<Campaign>>;

    /// Change a campaign's status; moving to running starts the send
    fn update_campaign_status(&self, id: CampaignId, status: CampaignStatus) -> Result<()>;

    /// Create a campaign in draft status
    fn create_campaign(&self, campaign: &NewCampaign) -> Result<Campaign>;

    fn delete_campaign(&self, id: CampaignId) -> Result<()>;

    /// Query subscribers matching every condition of `filter`
    fn query_subscribers(&self, filter: &SubscriberFilter) -> Result<Vec<Subscriber>>;

    /// Add or remove list memberships for many subscribers in one call
    ///
    /// Fails without applying anything if any subscriber ID is unknown.
    fn update_memberships(
        &self,
        subscribers: &[SubscriberId],
        lists: &[ListId],
        action: MembershipAction,
    ) -> Result<()>;

    fn get_subscriber(&self, id: SubscriberId) -> Result<Subscriber>;

    fn create_subscriber(&self, subscriber: &NewSubscriber) -> Result<Subscriber>;

    /// Replace a subscriber's fields, memberships and attributes
    fn update_subscriber(&self, id: SubscriberId, subscriber: &NewSubscriber) -> Result<Subscriber>;

    fn delete_subscriber(&self, id: SubscriberId) -> Result<()>;
}
