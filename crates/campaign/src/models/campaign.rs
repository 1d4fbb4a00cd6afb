//! Campaign model and the incremental-campaign naming convention

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ListId, MailingList};

/// Suffix that marks a campaign as the incremental resend of another
pub const INCREMENTAL_SUFFIX: &str = "_inc";

/// Remote identifier of a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub u64);

impl CampaignId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for CampaignId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a campaign
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Scheduled,
    Running,
    Paused,
    Cancelled,
    Finished,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign type as understood by the remote service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignKind {
    #[default]
    Regular,
    Optin,
}

/// A named send targeting one or more lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub content_type: String,
    #[serde(default)]
    pub kind: CampaignKind,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub messenger: String,
    #[serde(default)]
    pub template_id: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Target lists, in the order the remote service reports them
    pub lists: Vec<MailingList>,
    /// Unset until the first launch; never cleared afterwards
    pub started_at: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
}

impl Campaign {
    /// Whether the campaign has ever been launched
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn list_ids(&self) -> Vec<ListId> {
        self.lists.iter().map(|l| l.id).collect()
    }

    pub fn targets_list(&self, name: &str) -> bool {
        self.lists.iter().any(|l| l.name == name)
    }

    /// Name of the incremental campaign derived from this one
    pub fn incremental_name(&self) -> String {
        format!("{}{}", self.name, INCREMENTAL_SUFFIX)
    }

    /// Name of the throwaway list that scopes an incremental send
    pub fn audience_list_name(&self) -> String {
        format!("{}_audience", self.incremental_name())
    }

    /// Clone this campaign's content into a draft that targets only `audience`
    pub fn incremental_draft(&self, audience: &MailingList) -> NewCampaign {
        NewCampaign {
            name: self.incremental_name(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            content_type: self.content_type.clone(),
            kind: self.kind,
            from_email: self.from_email.clone(),
            messenger: self.messenger.clone(),
            template_id: self.template_id,
            tags: self.tags.clone(),
            lists: vec![audience.id],
        }
    }
}

/// Fields for creating a campaign
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCampaign {
    pub name: String,
    pub subject: String,
    pub body: String,
    pub content_type: String,
    pub kind: CampaignKind,
    pub from_email: String,
    pub messenger: String,
    pub template_id: Option<u64>,
    pub tags: Vec<String>,
    pub lists: Vec<ListId>,
}

impl NewCampaign {
    /// Create a draft with the remote service's defaults for everything else
    pub fn new(name: impl Into<String>, subject: impl Into<String>, lists: Vec<ListId>) -> Self {
        Self {
            name: name.into(),
            subject: subject.into(),
            body: String::new(),
            content_type: "richtext".to_string(),
            kind: CampaignKind::Regular,
            from_email: String::new(),
            messenger: "email".to_string(),
            template_id: None,
            tags: Vec::new(),
            lists,
        }
    }

    /// Builder method to set the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder method to set the content type ("html", "plain", "richtext", ...)
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_campaign() -> Campaign {
        Campaign {
            id: CampaignId(3),
            name: "Spring launch".to_string(),
            subject: "New firmware".to_string(),
            body: "<p>Hello</p>".to_string(),
            content_type: "html".to_string(),
            kind: CampaignKind::Regular,
            from_email: "news@example.com".to_string(),
            messenger: "email".to_string(),
            template_id: Some(4),
            tags: vec!["firmware".to_string()],
            lists: vec![MailingList::new(1u64, "desktop"), MailingList::new(2u64, "laptop")],
            started_at: None,
            status: CampaignStatus::Draft,
        }
    }

    #[test]
    fn test_incremental_name() {
        let campaign = base_campaign();
        assert_eq!(campaign.incremental_name(), "Spring launch_inc");
        assert_eq!(campaign.audience_list_name(), "Spring launch_inc_audience");
    }

    #[test]
    fn test_incremental_draft_targets_only_audience() {
        let campaign = base_campaign();
        let audience = MailingList::new(9u64, campaign.audience_list_name());

        let draft = campaign.incremental_draft(&audience);

        assert_eq!(draft.name, "Spring launch_inc");
        assert_eq!(draft.lists, vec![ListId(9)]);
        assert_eq!(draft.subject, campaign.subject);
        assert_eq!(draft.body, campaign.body);
        assert_eq!(draft.content_type, "html");
        assert_eq!(draft.from_email, "news@example.com");
        assert_eq!(draft.template_id, Some(4));
        assert_eq!(draft.tags, vec!["firmware".to_string()]);
    }

    #[test]
    fn test_targets_list() {
        let campaign = base_campaign();
        assert!(campaign.targets_list("laptop"));
        assert!(!campaign.targets_list("network"));
        assert_eq!(campaign.list_ids(), vec![ListId(1), ListId(2)]);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&CampaignStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        let status: CampaignStatus = serde_json::from_str("\"finished\"").unwrap();
        assert_eq!(status, CampaignStatus::Finished);
    }
}
