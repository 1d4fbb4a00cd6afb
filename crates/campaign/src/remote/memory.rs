//! In-memory mailing service
//!
//! Mirrors the remote contract closely enough to drive the resume engine in
//! tests: deterministic ids, an operation journal, and per-operation failure
//! injection.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, RwLock};

use super::{MailingService, SubscriberFilter};
use crate::error::{Result, ServiceError};
use crate::models::{
    Attributes, Campaign, CampaignId, CampaignStatus, ListId, ListMembership, MailingList,
    MembershipAction, NewCampaign, NewSubscriber, Subscriber, SubscriberId, SubscriberStatus,
};

/// Remote operations, as recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListLists,
    CreateList,
    DeleteList,
    GetCampaign,
    ListCampaigns,
    UpdateCampaignStatus,
    CreateCampaign,
    DeleteCampaign,
    QuerySubscribers,
    UpdateMemberships,
    GetSubscriber,
    CreateSubscriber,
    UpdateSubscriber,
    DeleteSubscriber,
}

impl Operation {
    /// Whether the operation changes remote state
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::ListLists
                | Self::GetCampaign
                | Self::ListCampaigns
                | Self::QuerySubscribers
                | Self::GetSubscriber
        )
    }
}

/// One recorded bulk membership update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkUpdate {
    pub subscribers: Vec<SubscriberId>,
    pub lists: Vec<ListId>,
    pub action: MembershipAction,
}

#[derive(Default)]
struct State {
    next_id: u64,
    lists: BTreeMap<ListId, MailingList>,
    campaigns: BTreeMap<CampaignId, Campaign>,
    subscribers: BTreeMap<SubscriberId, Subscriber>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn list(&self, id: ListId) -> Result<&MailingList> {
        self.lists
            .get(&id)
            .ok_or_else(|| ServiceError::not_found("list", id))
    }

    fn memberships(&self, lists: &[ListId], now: DateTime<Utc>) -> Result<Vec<ListMembership>> {
        lists
            .iter()
            .map(|id| {
                let list = self.list(*id)?;
                Ok(ListMembership::new(list.id, list.name.clone(), now))
            })
            .collect()
    }

    fn email_taken(&self, email: &str, except: Option<SubscriberId>) -> bool {
        self.subscribers
            .values()
            .any(|s| Some(s.id) != except && s.email.eq_ignore_ascii_case(email))
    }
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ServiceError::Validation(format!("invalid email: {}", email))),
    }
}

/// Thread-safe in-memory implementation of [`MailingService`]
#[derive(Default)]
pub struct InMemoryMailingService {
    state: RwLock<State>,
    journal: Mutex<Vec<Operation>>,
    bulk_updates: Mutex<Vec<BulkUpdate>>,
    failures: Mutex<HashSet<Operation>>,
}

impl InMemoryMailingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call and apply any injected failure
    fn record(&self, op: Operation) -> Result<()> {
        self.journal.lock().unwrap().push(op);
        if self.failures.lock().unwrap().contains(&op) {
            return Err(ServiceError::Remote(format!("injected failure for {:?}", op)));
        }
        Ok(())
    }

    // === Journal and failure injection ===

    /// Every operation called so far, in order
    pub fn journal(&self) -> Vec<Operation> {
        self.journal.lock().unwrap().clone()
    }

    /// Only the state-changing operations called so far
    pub fn mutations(&self) -> Vec<Operation> {
        self.journal()
            .into_iter()
            .filter(Operation::is_mutation)
            .collect()
    }

    pub fn count(&self, op: Operation) -> usize {
        self.journal.lock().unwrap().iter().filter(|o| **o == op).count()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().unwrap().clear();
        self.bulk_updates.lock().unwrap().clear();
    }

    /// Successful bulk membership updates, in order
    pub fn bulk_updates(&self) -> Vec<BulkUpdate> {
        self.bulk_updates.lock().unwrap().clone()
    }

    /// Make every later call of `op` fail with a remote error
    pub fn fail_on(&self, op: Operation) {
        self.failures.lock().unwrap().insert(op);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    // === Seeding (not journaled) ===

    /// Add a list directly
    pub fn seed_list(&self, name: &str) -> MailingList {
        let mut state = self.state.write().unwrap();
        let list = MailingList::new(state.next_id(), name);
        state.lists.insert(list.id, list.clone());
        list
    }

    /// Add a subscriber with no memberships
    pub fn seed_subscriber(&self, name: &str, email: &str) -> SubscriberId {
        let mut state = self.state.write().unwrap();
        let id = SubscriberId(state.next_id());
        state.subscribers.insert(
            id,
            Subscriber {
                id,
                email: email.to_string(),
                name: name.to_string(),
                status: SubscriberStatus::Enabled,
                attributes: Attributes::new(),
                lists: Vec::new(),
            },
        );
        id
    }

    /// Put a subscriber on a list with an explicit membership timestamp
    ///
    /// Panics if either entity is missing; seeding mistakes are test bugs.
    pub fn seed_membership(&self, subscriber: SubscriberId, list: ListId, joined_at: DateTime<Utc>) {
        let mut state = self.state.write().unwrap();
        let name = state.lists[&list].name.clone();
        let sub = state.subscribers.get_mut(&subscriber).expect("seeded subscriber");
        sub.lists.retain(|m| m.list_id != list);
        sub.lists.push(ListMembership::new(list, name, joined_at));
    }

    /// Add a campaign in draft status targeting `lists`
    pub fn seed_campaign(&self, name: &str, lists: &[ListId]) -> Campaign {
        let mut state = self.state.write().unwrap();
        let targets = lists.iter().map(|id| state.lists[id].clone()).collect();
        let campaign = Campaign {
            id: CampaignId(state.next_id()),
            name: name.to_string(),
            subject: format!("Subject of {}", name),
            body: format!("Body of {}", name),
            content_type: "richtext".to_string(),
            kind: Default::default(),
            from_email: "news@example.com".to_string(),
            messenger: "email".to_string(),
            template_id: Some(1),
            tags: Vec::new(),
            lists: targets,
            started_at: None,
            status: CampaignStatus::Draft,
        };
        state.campaigns.insert(campaign.id, campaign.clone());
        campaign
    }

    /// Mark a campaign as launched at `started_at` and finished
    pub fn seed_started(&self, id: CampaignId, started_at: DateTime<Utc>) {
        let mut state = self.state.write().unwrap();
        let campaign = state.campaigns.get_mut(&id).expect("seeded campaign");
        campaign.started_at = Some(started_at);
        campaign.status = CampaignStatus::Finished;
    }

    // === Inspection (not journaled) ===

    pub fn lists(&self) -> Vec<MailingList> {
        self.state.read().unwrap().lists.values().cloned().collect()
    }

    pub fn campaigns(&self) -> Vec<Campaign> {
        self.state.read().unwrap().campaigns.values().cloned().collect()
    }

    pub fn campaign_named(&self, name: &str) -> Option<Campaign> {
        self.state
            .read()
            .unwrap()
            .campaigns
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn subscriber(&self, id: SubscriberId) -> Option<Subscriber> {
        self.state.read().unwrap().subscribers.get(&id).cloned()
    }

    /// Subscribers currently on a list
    pub fn members_of(&self, list: ListId) -> Vec<SubscriberId> {
        self.state
            .read()
            .unwrap()
            .subscribers
            .values()
            .filter(|s| s.is_member_of(list))
            .map(|s| s.id)
            .collect()
    }
}

impl MailingService for InMemoryMailingService {
    fn list_lists(&self) -> Result<Vec<MailingList>> {
        self.record(Operation::ListLists)?;
        Ok(self.lists())
    }

    fn create_list(&self, name: &str) -> Result<MailingList> {
        self.record(Operation::CreateList)?;
        if name.trim().is_empty() {
            return Err(ServiceError::Validation("list name is empty".to_string()));
        }
        let mut state = self.state.write().unwrap();
        if state.lists.values().any(|l| l.name == name) {
            return Err(ServiceError::Remote(format!("list already exists: {}", name)));
        }
        let list = MailingList::new(state.next_id(), name);
        state.lists.insert(list.id, list.clone());
        Ok(list)
    }

    fn delete_list(&self, id: ListId) -> Result<()> {
        self.record(Operation::DeleteList)?;
        let mut state = self.state.write().unwrap();
        if state.lists.remove(&id).is_none() {
            return Err(ServiceError::not_found("list", id));
        }
        for subscriber in state.subscribers.values_mut() {
            subscriber.lists.retain(|m| m.list_id != id);
        }
        Ok(())
    }

    fn get_campaign(&self, id: CampaignId) -> Result<Campaign> {
        self.record(Operation::GetCampaign)?;
        self.state
            .read()
            .unwrap()
            .campaigns
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("campaign", id))
    }

    fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        self.record(Operation::ListCampaigns)?;
        Ok(self.campaigns())
    }

    fn update_campaign_status(&self, id: CampaignId, status: CampaignStatus) -> Result<()> {
        self.record(Operation::UpdateCampaignStatus)?;
        let mut state = self.state.write().unwrap();
        let campaign = state
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| ServiceError::not_found("campaign", id))?;
        if status == CampaignStatus::Running && campaign.started_at.is_none() {
            campaign.started_at = Some(Utc::now());
        }
        campaign.status = status;
        Ok(())
    }

    fn create_campaign(&self, draft: &NewCampaign) -> Result<Campaign> {
        self.record(Operation::CreateCampaign)?;
        if draft.name.trim().is_empty() {
            return Err(ServiceError::Validation("campaign name is empty".to_string()));
        }
        if draft.lists.is_empty() {
            return Err(ServiceError::Validation("campaign targets no lists".to_string()));
        }

        let mut state = self.state.write().unwrap();
        let lists = draft
            .lists
            .iter()
            .map(|id| state.list(*id).cloned())
            .collect::<Result<Vec<_>>>()?;
        let campaign = Campaign {
            id: CampaignId(state.next_id()),
            name: draft.name.clone(),
            subject: draft.subject.clone(),
            body: draft.body.clone(),
            content_type: draft.content_type.clone(),
            kind: draft.kind,
            from_email: draft.from_email.clone(),
            messenger: draft.messenger.clone(),
            template_id: draft.template_id,
            tags: draft.tags.clone(),
            lists,
            started_at: None,
            status: CampaignStatus::Draft,
        };
        state.campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    fn delete_campaign(&self, id: CampaignId) -> Result<()> {
        self.record(Operation::DeleteCampaign)?;
        match self.state.write().unwrap().campaigns.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("campaign", id)),
        }
    }

    fn query_subscribers(&self, filter: &SubscriberFilter) -> Result<Vec<Subscriber>> {
        self.record(Operation::QuerySubscribers)?;
        Ok(self
            .state
            .read()
            .unwrap()
            .subscribers
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    fn update_memberships(
        &self,
        subscribers: &[SubscriberId],
        lists: &[ListId],
        action: MembershipAction,
    ) -> Result<()> {
        self.record(Operation::UpdateMemberships)?;
        let mut state = self.state.write().unwrap();

        // Validate everything before touching anything
        if let Some(unknown) = subscribers.iter().find(|id| !state.subscribers.contains_key(*id)) {
            return Err(ServiceError::Remote(format!("unknown subscriber id {}", unknown)));
        }
        let memberships = state
            .memberships(lists, Utc::now())
            .map_err(|e| ServiceError::Remote(e.to_string()))?;

        for id in subscribers {
            let Some(subscriber) = state.subscribers.get_mut(id) else {
                continue;
            };
            match action {
                MembershipAction::Add => {
                    for membership in &memberships {
                        if !subscriber.is_member_of(membership.list_id) {
                            subscriber.lists.push(membership.clone());
                        }
                    }
                }
                MembershipAction::Remove => {
                    subscriber.lists.retain(|m| !lists.contains(&m.list_id));
                }
            }
        }
        self.bulk_updates.lock().unwrap().push(BulkUpdate {
            subscribers: subscribers.to_vec(),
            lists: lists.to_vec(),
            action,
        });
        Ok(())
    }

    fn get_subscriber(&self, id: SubscriberId) -> Result<Subscriber> {
        self.record(Operation::GetSubscriber)?;
        self.subscriber(id)
            .ok_or_else(|| ServiceError::not_found("subscriber", id))
    }

    fn create_subscriber(&self, new: &NewSubscriber) -> Result<Subscriber> {
        self.record(Operation::CreateSubscriber)?;
        validate_email(&new.email)?;

        let mut state = self.state.write().unwrap();
        if state.email_taken(&new.email, None) {
            return Err(ServiceError::Validation(format!("email already exists: {}", new.email)));
        }
        let lists = state.memberships(&new.lists, Utc::now())?;
        let subscriber = Subscriber {
            id: SubscriberId(state.next_id()),
            email: new.email.clone(),
            name: new.name.clone(),
            status: new.status,
            attributes: new.attributes.clone(),
            lists,
        };
        state.subscribers.insert(subscriber.id, subscriber.clone());
        Ok(subscriber)
    }

    fn update_subscriber(&self, id: SubscriberId, new: &NewSubscriber) -> Result<Subscriber> {
        self.record(Operation::UpdateSubscriber)?;
        validate_email(&new.email)?;

        let mut state = self.state.write().unwrap();
        if state.email_taken(&new.email, Some(id)) {
            return Err(ServiceError::Validation(format!("email already exists: {}", new.email)));
        }
        let fresh = state.memberships(&new.lists, Utc::now())?;
        let subscriber = state
            .subscribers
            .get_mut(&id)
            .ok_or_else(|| ServiceError::not_found("subscriber", id))?;

        // Memberships that survive keep their original join time
        let lists = fresh
            .into_iter()
            .map(|m| {
                subscriber
                    .lists
                    .iter()
                    .find(|old| old.list_id == m.list_id)
                    .cloned()
                    .unwrap_or(m)
            })
            .collect();

        subscriber.email = new.email.clone();
        subscriber.name = new.name.clone();
        subscriber.status = new.status;
        subscriber.attributes = new.attributes.clone();
        subscriber.lists = lists;
        Ok(subscriber.clone())
    }

    fn delete_subscriber(&self, id: SubscriberId) -> Result<()> {
        self.record(Operation::DeleteSubscriber)?;
        match self.state.write().unwrap().subscribers.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("subscriber", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_running_sets_started_at_once() {
        let service = InMemoryMailingService::new();
        let list = service.seed_list("news");
        let campaign = service.seed_campaign("Weekly", &[list.id]);

        service
            .update_campaign_status(campaign.id, CampaignStatus::Running)
            .unwrap();
        let started = service.get_campaign(campaign.id).unwrap().started_at;
        assert!(started.is_some());

        service
            .update_campaign_status(campaign.id, CampaignStatus::Running)
            .unwrap();
        assert_eq!(service.get_campaign(campaign.id).unwrap().started_at, started);
    }

    #[test]
    fn test_bulk_add_is_atomic() {
        let service = InMemoryMailingService::new();
        let list = service.seed_list("tmp");
        let known = service.seed_subscriber("User 0", "test0@example.com");

        let result = service.update_memberships(
            &[known, SubscriberId(999_999)],
            &[list.id],
            MembershipAction::Add,
        );

        assert!(matches!(result, Err(ServiceError::Remote(_))));
        assert!(service.members_of(list.id).is_empty());
    }

    #[test]
    fn test_bulk_add_and_remove() {
        let service = InMemoryMailingService::new();
        let list = service.seed_list("tmp");
        let a = service.seed_subscriber("User 0", "test0@example.com");
        let b = service.seed_subscriber("User 1", "test1@example.com");

        service
            .update_memberships(&[a, b], &[list.id], MembershipAction::Add)
            .unwrap();
        assert_eq!(service.members_of(list.id), vec![a, b]);

        service
            .update_memberships(&[a], &[list.id], MembershipAction::Remove)
            .unwrap();
        assert_eq!(service.members_of(list.id), vec![b]);
    }

    #[test]
    fn test_create_list_rejects_duplicate_name() {
        let service = InMemoryMailingService::new();
        let first = service.create_list("news").unwrap();

        let err = service.create_list("news").unwrap_err();
        assert!(matches!(err, ServiceError::Remote(_)));
        assert_eq!(service.lists(), vec![first.clone()]);

        service.delete_list(first.id).unwrap();
        assert!(service.create_list("news").is_ok());
    }

    #[test]
    fn test_delete_list_drops_memberships() {
        let service = InMemoryMailingService::new();
        let list = service.seed_list("tmp");
        let sub = service.seed_subscriber("User", "user@example.com");
        service.seed_membership(sub, list.id, Utc::now() - Duration::hours(1));

        service.delete_list(list.id).unwrap();

        assert!(service.subscriber(sub).unwrap().lists.is_empty());
        assert!(service.delete_list(list.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_subscriber_validates_email() {
        let service = InMemoryMailingService::new();
        let err = service
            .create_subscriber(&NewSubscriber::new("Bad", "not-an-email"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(service.mutations() == vec![Operation::CreateSubscriber]);
    }

    #[test]
    fn test_update_subscriber_keeps_join_time() {
        let service = InMemoryMailingService::new();
        let news = service.seed_list("news");
        let other = service.seed_list("other");
        let sub = service.seed_subscriber("User", "user@example.com");
        let joined = Utc::now() - Duration::days(3);
        service.seed_membership(sub, news.id, joined);

        let current = service.subscriber(sub).unwrap();
        let mut replacement = NewSubscriber::replacing(&current, Attributes::new());
        replacement.lists.push(other.id);
        let updated = service.update_subscriber(sub, &replacement).unwrap();

        assert_eq!(updated.lists.len(), 2);
        assert_eq!(updated.lists[0].created_at, joined);
        assert!(updated.lists[1].created_at > joined);
    }

    #[test]
    fn test_injected_failure() {
        let service = InMemoryMailingService::new();
        service.fail_on(Operation::ListLists);
        assert!(matches!(service.list_lists(), Err(ServiceError::Remote(_))));

        service.clear_failures();
        assert!(service.list_lists().is_ok());
        assert_eq!(service.count(Operation::ListLists), 2);
    }
}
