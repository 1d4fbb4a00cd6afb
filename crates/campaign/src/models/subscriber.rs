//! Subscriber model and list membership records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ListId;

/// Open attribute map attached to a subscriber
///
/// The resume engine never reads specific keys from it.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Remote identifier of a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub u64);

impl SubscriberId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SubscriberId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account status of a subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    #[default]
    Enabled,
    Disabled,
    Blocklisted,
}

/// One row of subscriber-to-list membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMembership {
    pub list_id: ListId,
    pub list_name: String,
    /// When the subscriber joined the list; the pivot for "newly joined"
    pub created_at: DateTime<Utc>,
}

impl ListMembership {
    pub fn new(list_id: ListId, list_name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            list_id,
            list_name: list_name.into(),
            created_at,
        }
    }
}

/// An addressable recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub status: SubscriberStatus,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub lists: Vec<ListMembership>,
}

impl Subscriber {
    /// Ids of every list the subscriber belongs to
    pub fn list_ids(&self) -> Vec<ListId> {
        self.lists.iter().map(|m| m.list_id).collect()
    }

    pub fn is_member_of(&self, list_id: ListId) -> bool {
        self.lists.iter().any(|m| m.list_id == list_id)
    }

    /// True if any membership in `lists` was created strictly after `cutoff`
    pub fn joined_after(&self, cutoff: DateTime<Utc>, lists: &[ListId]) -> bool {
        self.lists
            .iter()
            .any(|m| m.created_at > cutoff && lists.contains(&m.list_id))
    }
}

/// Fields for creating (or fully replacing) a subscriber
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSubscriber {
    pub email: String,
    pub name: String,
    pub status: SubscriberStatus,
    pub lists: Vec<ListId>,
    pub attributes: Attributes,
}

impl NewSubscriber {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            status: SubscriberStatus::Enabled,
            lists: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    /// Builder method to set list memberships
    pub fn with_lists(mut self, lists: Vec<ListId>) -> Self {
        self.lists = lists;
        self
    }

    /// Builder method to set attributes
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder method to set status
    pub fn with_status(mut self, status: SubscriberStatus) -> Self {
        self.status = status;
        self
    }

    /// Replacement payload that keeps everything about `subscriber` but its attributes
    pub fn replacing(subscriber: &Subscriber, attributes: Attributes) -> Self {
        Self {
            email: subscriber.email.clone(),
            name: subscriber.name.clone(),
            status: subscriber.status,
            lists: subscriber.list_ids(),
            attributes,
        }
    }
}

/// Direction of a bulk membership update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipAction {
    Add,
    Remove,
}

impl MembershipAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}
