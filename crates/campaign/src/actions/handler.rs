//! Action handler for subscriber and list operations

use log::info;
use std::sync::Arc;

use crate::cache::ListIdCache;
use crate::error::{Result, ServiceError};
use crate::models::{
    Attributes, CampaignId, MembershipAction, NewCampaign, NewSubscriber, SubscriberId,
};
use crate::remote::{MailingService, SubscriberFilter};
use crate::resume::{CampaignResumer, ResumeOutcome};

/// Handler for subscriber and list actions
///
/// List names are translated through the shared [`ListIdCache`]; campaign
/// launches go through the shared [`CampaignResumer`] so they get the same
/// per-campaign exclusion as direct resumes.
pub struct ActionHandler {
    service: Arc<dyn MailingService>,
    lists: Arc<ListIdCache>,
    resumer: Arc<CampaignResumer>,
}

impl ActionHandler {
    /// Create a new action handler
    pub fn new(
        service: Arc<dyn MailingService>,
        lists: Arc<ListIdCache>,
        resumer: Arc<CampaignResumer>,
    ) -> Self {
        Self {
            service,
            lists,
            resumer,
        }
    }

    /// Create a subscriber on the named lists
    pub fn create_subscriber(
        &self,
        name: &str,
        email: &str,
        list_names: &[&str],
        attributes: Attributes,
    ) -> Result<SubscriberId> {
        let lists = self.lists.resolve_all(list_names)?;
        info!("Adding subscriber {}", email);
        let subscriber = self.service.create_subscriber(
            &NewSubscriber::new(name, email)
                .with_lists(lists)
                .with_attributes(attributes),
        )?;
        Ok(subscriber.id)
    }

    /// Look up the single subscriber with `email`
    pub fn find_subscriber_id(&self, email: &str) -> Result<SubscriberId> {
        let matches = self.service.query_subscribers(&SubscriberFilter::email(email))?;
        match matches.as_slice() {
            [] => Err(ServiceError::not_found("subscriber", email)),
            [subscriber] => Ok(subscriber.id),
            _ => Err(ServiceError::AmbiguousResult {
                entity: "subscriber",
                key: email.to_string(),
                count: matches.len(),
            }),
        }
    }

    pub fn delete_subscriber_by_email(&self, email: &str) -> Result<()> {
        info!("Deleting subscriber {}", email);
        let id = self.find_subscriber_id(email)?;
        self.service.delete_subscriber(id)
    }

    pub fn add_to_list(&self, email: &str, list_name: &str) -> Result<()> {
        info!("Adding subscriber {} to list {}", email, list_name);
        let id = self.find_subscriber_id(email)?;
        let list = self.lists.resolve(list_name)?;
        self.service
            .update_memberships(&[id], &[list], MembershipAction::Add)
    }

    /// Remove a subscriber from a list
    ///
    /// A subscriber removed from their only list is deleted instead.
    pub fn remove_from_list(&self, email: &str, list_name: &str) -> Result<()> {
        info!("Removing subscriber {} from list {}", email, list_name);
        let id = self.find_subscriber_id(email)?;
        let list = self.lists.resolve(list_name)?;
        let subscriber = self.service.get_subscriber(id)?;

        if subscriber.lists.len() == 1 && subscriber.is_member_of(list) {
            info!("{} was only on {}, deleting subscriber", email, list_name);
            return self.service.delete_subscriber(id);
        }

        self.service
            .update_memberships(&[id], &[list], MembershipAction::Remove)
    }

    pub fn delete_list(&self, name: &str) -> Result<()> {
        info!("Deleting list {}", name);
        self.lists.delete_and_unregister(name)
    }

    /// Create a campaign targeting a single list given by name
    pub fn create_campaign_on_list(
        &self,
        name: &str,
        subject: &str,
        list_name: &str,
        body: &str,
        content_type: &str,
    ) -> Result<CampaignId> {
        let list = self.lists.resolve(list_name)?;
        info!("Creating campaign {}", name);
        let campaign = self.service.create_campaign(
            &NewCampaign::new(name, subject, vec![list])
                .with_body(body)
                .with_content_type(content_type),
        )?;
        Ok(campaign.id)
    }

    /// Launch or resume the first campaign that targets `list_name`
    pub fn launch_campaign_for_list(&self, list_name: &str) -> Result<ResumeOutcome> {
        let campaign = self
            .service
            .list_campaigns()?
            .into_iter()
            .find(|c| c.targets_list(list_name))
            .ok_or_else(|| ServiceError::not_found("campaign for list", list_name))?;
        self.resumer.resume(campaign.id)
    }

    /// Add a subscriber to a list, then send that list's campaign
    pub fn add_and_send(&self, email: &str, list_name: &str) -> Result<ResumeOutcome> {
        self.add_to_list(email, list_name)?;
        self.launch_campaign_for_list(list_name)
    }

    pub fn subscriber_attributes(&self, email: &str) -> Result<Attributes> {
        let id = self.find_subscriber_id(email)?;
        Ok(self.service.get_subscriber(id)?.attributes)
    }

    /// Set one attribute, keeping the others
    pub fn set_attribute(
        &self,
        email: &str,
        key: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<()> {
        let id = self.find_subscriber_id(email)?;
        let subscriber = self.service.get_subscriber(id)?;
        let mut attributes = subscriber.attributes.clone();
        attributes.insert(key.to_string(), value.into());
        self.service
            .update_subscriber(id, &NewSubscriber::replacing(&subscriber, attributes))?;
        Ok(())
    }
}
