//! Domain models for mailing entities

mod campaign;
mod list;
mod subscriber;

pub use campaign::{Campaign, CampaignId, CampaignKind, CampaignStatus, NewCampaign, INCREMENTAL_SUFFIX};
pub use list::{ListId, MailingList};
pub use subscriber::{
    Attributes, ListMembership, MembershipAction, NewSubscriber, Subscriber, SubscriberId,
    SubscriberStatus,
};
