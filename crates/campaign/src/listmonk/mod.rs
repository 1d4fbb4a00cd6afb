//! Listmonk API integration
//!
//! This module provides:
//! - Basic authentication for API requests
//! - A blocking HTTP client implementing the remote service contract
//! - Conversion between API payloads and domain models

mod auth;
mod client;
mod normalize;

pub use auth::ListmonkAuth;
pub use client::ListmonkClient;
pub use normalize::{normalize_campaign, normalize_list, normalize_subscriber};

/// Listmonk API request and response types
pub mod api {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    /// Every response wraps its payload in `data`
    #[derive(Debug, Deserialize)]
    pub struct Envelope<T> {
        pub data: T,
    }

    /// Paginated listing
    #[derive(Debug, Deserialize)]
    pub struct Page<T> {
        #[serde(default = "Vec::new")]
        pub results: Vec<T>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiList {
        pub id: u64,
        pub name: String,
    }

    /// List reference inside a campaign; the ID is null once the list is deleted
    #[derive(Debug, Deserialize)]
    pub struct CampaignListRef {
        pub id: Option<u64>,
        pub name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiCampaign {
        pub id: u64,
        pub name: String,
        pub subject: String,
        #[serde(default)]
        pub body: String,
        pub content_type: String,
        #[serde(rename = "type", default)]
        pub kind: Option<String>,
        #[serde(default)]
        pub from_email: String,
        #[serde(default)]
        pub messenger: String,
        pub template_id: Option<u64>,
        pub tags: Option<Vec<String>>,
        #[serde(default)]
        pub lists: Vec<CampaignListRef>,
        pub started_at: Option<DateTime<Utc>>,
        pub status: String,
    }

    /// Membership row inside a subscriber
    #[derive(Debug, Deserialize)]
    pub struct SubscriberListRef {
        pub id: u64,
        pub name: String,
        pub subscription_created_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiSubscriber {
        pub id: u64,
        pub email: String,
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub status: Option<String>,
        #[serde(default)]
        pub attribs: serde_json::Map<String, serde_json::Value>,
        #[serde(default)]
        pub lists: Vec<SubscriberListRef>,
    }

    #[derive(Debug, Serialize)]
    pub struct CreateListRequest<'a> {
        pub name: &'a str,
        #[serde(rename = "type")]
        pub kind: &'a str,
        pub optin: &'a str,
    }

    #[derive(Debug, Serialize)]
    pub struct CampaignRequest<'a> {
        pub name: &'a str,
        pub subject: &'a str,
        pub lists: Vec<u64>,
        #[serde(skip_serializing_if = "str::is_empty")]
        pub from_email: &'a str,
        #[serde(rename = "type")]
        pub kind: &'a str,
        pub content_type: &'a str,
        pub messenger: &'a str,
        pub body: &'a str,
        pub tags: &'a [String],
        #[serde(skip_serializing_if = "Option::is_none")]
        pub template_id: Option<u64>,
    }

    #[derive(Debug, Serialize)]
    pub struct StatusRequest<'a> {
        pub status: &'a str,
    }

    #[derive(Debug, Serialize)]
    pub struct SubscriberRequest<'a> {
        pub email: &'a str,
        pub name: &'a str,
        pub status: &'a str,
        pub lists: Vec<u64>,
        pub attribs: &'a serde_json::Map<String, serde_json::Value>,
        pub preconfirm_subscriptions: bool,
    }

    #[derive(Debug, Serialize)]
    pub struct MembershipRequest<'a> {
        pub ids: Vec<u64>,
        pub action: &'a str,
        pub target_list_ids: Vec<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub status: Option<&'a str>,
    }
}
