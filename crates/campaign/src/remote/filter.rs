//! Structured subscriber filters
//!
//! Filters are built from typed conditions and only turned into the remote
//! query language at the HTTP boundary, so caller-supplied strings never
//! become raw query text.

use chrono::{DateTime, Utc};

use crate::models::{ListId, Subscriber};

/// Timestamp layout for query literals: microseconds plus explicit offset
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Subscriber email equals the value (case-insensitive)
    EmailEquals(String),
    /// Subscriber joined one of `lists` strictly after `after`
    JoinedListsAfter {
        after: DateTime<Utc>,
        lists: Vec<ListId>,
    },
}

impl Condition {
    fn matches(&self, subscriber: &Subscriber) -> bool {
        match self {
            Self::EmailEquals(email) => subscriber.email.eq_ignore_ascii_case(email),
            Self::JoinedListsAfter { after, lists } => subscriber.joined_after(*after, lists),
        }
    }

    fn to_query(&self) -> String {
        match self {
            Self::EmailEquals(email) => format!("subscribers.email = {}", quote(email)),
            Self::JoinedListsAfter { lists, .. } if lists.is_empty() => "FALSE".to_string(),
            Self::JoinedListsAfter { after, lists } => {
                let ids: Vec<String> = lists.iter().map(|id| id.get().to_string()).collect();
                format!(
                    "subscribers.id IN (SELECT subscriber_id FROM subscriber_lists \
                     WHERE created_at > {} AND list_id IN ({}))",
                    quote(&format_timestamp(*after)),
                    ids.join(",")
                )
            }
        }
    }
}

/// Conjunction of conditions; an empty filter matches every subscriber
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriberFilter {
    conditions: Vec<Condition>,
}

impl SubscriberFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on an exact email address
    pub fn email(email: impl Into<String>) -> Self {
        Self::new().and(Condition::EmailEquals(email.into()))
    }

    /// Filter on memberships in `lists` created strictly after `after`
    pub fn joined_after(after: DateTime<Utc>, lists: Vec<ListId>) -> Self {
        Self::new().and(Condition::JoinedListsAfter { after, lists })
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate the filter locally
    pub fn matches(&self, subscriber: &Subscriber) -> bool {
        self.conditions.iter().all(|c| c.matches(subscriber))
    }

    /// Render as a remote query expression
    pub fn to_query(&self) -> String {
        self.conditions
            .iter()
            .map(Condition::to_query)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Render a timestamp with microsecond precision and an explicit offset
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Quote a string literal, doubling embedded single quotes
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
