//! Campaign crate - Incremental campaign delivery against Listmonk
//!
//! This crate provides:
//! - Domain models (MailingList, Subscriber, Campaign)
//! - An error taxonomy shared by every remote operation
//! - The remote service contract, with a Listmonk HTTP client and an
//!   in-memory implementation
//! - A concurrency-safe list name to ID cache
//! - The resume engine: launching a campaign again only reaches
//!   subscribers who joined its lists since the previous launch
//! - Action handlers for subscriber and list mutations

pub mod actions;
pub mod cache;
pub mod config;
pub mod error;
pub mod listmonk;
pub mod models;
pub mod remote;
pub mod resume;

pub use actions::ActionHandler;
pub use cache::ListIdCache;
pub use config::ServiceSettings;
pub use error::{Result, ServiceError};
pub use listmonk::{ListmonkAuth, ListmonkClient};
pub use models::{
    Attributes, Campaign, CampaignId, CampaignStatus, ListId, ListMembership, MailingList,
    MembershipAction, NewCampaign, NewSubscriber, Subscriber, SubscriberId,
};
pub use remote::{BulkUpdate, Condition, InMemoryMailingService, MailingService, Operation, SubscriberFilter};
pub use resume::{CampaignLeases, CampaignResumer, Compensation, ResumeOutcome, Rollback};
