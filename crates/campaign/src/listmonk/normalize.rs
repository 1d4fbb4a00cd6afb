//! Conversion between Listmonk payloads and domain models

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::api::{
    ApiCampaign, ApiList, ApiSubscriber, CampaignRequest, MembershipRequest, SubscriberRequest,
};
use crate::models::{
    Campaign, CampaignId, CampaignKind, CampaignStatus, ListId, ListMembership, MailingList,
    MembershipAction, NewCampaign, NewSubscriber, Subscriber, SubscriberId, SubscriberStatus,
};

pub fn normalize_list(list: ApiList) -> MailingList {
    MailingList::new(list.id, list.name)
}

fn parse_status(status: &str) -> CampaignStatus {
    match status {
        "scheduled" => CampaignStatus::Scheduled,
        "running" => CampaignStatus::Running,
        "paused" => CampaignStatus::Paused,
        "cancelled" => CampaignStatus::Cancelled,
        "finished" => CampaignStatus::Finished,
        "draft" => CampaignStatus::Draft,
        other => {
            warn!("Unknown campaign status {:?}, treating as draft", other);
            CampaignStatus::Draft
        }
    }
}

pub fn normalize_campaign(campaign: ApiCampaign) -> Campaign {
    let kind = match campaign.kind.as_deref() {
        Some("optin") => CampaignKind::Optin,
        _ => CampaignKind::Regular,
    };

    // Deleted lists keep their name but lose their ID; they can't be targeted
    let lists = campaign
        .lists
        .into_iter()
        .filter_map(|l| l.id.map(|id| MailingList::new(id, l.name)))
        .collect();

    Campaign {
        id: CampaignId(campaign.id),
        name: campaign.name,
        subject: campaign.subject,
        body: campaign.body,
        content_type: campaign.content_type,
        kind,
        from_email: campaign.from_email,
        messenger: campaign.messenger,
        template_id: campaign.template_id,
        tags: campaign.tags.unwrap_or_default(),
        lists,
        started_at: campaign.started_at,
        status: parse_status(&campaign.status),
    }
}

pub fn normalize_subscriber(subscriber: ApiSubscriber) -> Subscriber {
    let status = match subscriber.status.as_deref() {
        Some("disabled") => SubscriberStatus::Disabled,
        Some("blocklisted") => SubscriberStatus::Blocklisted,
        _ => SubscriberStatus::Enabled,
    };

    let lists = subscriber
        .lists
        .into_iter()
        .map(|l| {
            let joined = l.subscription_created_at.unwrap_or_else(|| {
                debug!(
                    "Subscriber {} has no join time on list {}, never counted as new",
                    subscriber.id, l.name
                );
                DateTime::<Utc>::UNIX_EPOCH
            });
            ListMembership::new(ListId(l.id), l.name, joined)
        })
        .collect();

    Subscriber {
        id: SubscriberId(subscriber.id),
        email: subscriber.email,
        name: subscriber.name,
        status,
        attributes: subscriber.attribs,
        lists,
    }
}

pub(crate) fn campaign_request(campaign: &NewCampaign) -> CampaignRequest<'_> {
    CampaignRequest {
        name: &campaign.name,
        subject: &campaign.subject,
        lists: campaign.lists.iter().map(ListId::get).collect(),
        from_email: &campaign.from_email,
        kind: match campaign.kind {
            CampaignKind::Regular => "regular",
            CampaignKind::Optin => "optin",
        },
        content_type: &campaign.content_type,
        messenger: &campaign.messenger,
        body: &campaign.body,
        tags: &campaign.tags,
        template_id: campaign.template_id,
    }
}

pub(crate) fn subscriber_request(subscriber: &NewSubscriber) -> SubscriberRequest<'_> {
    SubscriberRequest {
        email: &subscriber.email,
        name: &subscriber.name,
        status: match subscriber.status {
            SubscriberStatus::Enabled => "enabled",
            SubscriberStatus::Disabled => "disabled",
            SubscriberStatus::Blocklisted => "blocklisted",
        },
        lists: subscriber.lists.iter().map(ListId::get).collect(),
        attribs: &subscriber.attributes,
        preconfirm_subscriptions: true,
    }
}

pub(crate) fn membership_request<'a>(
    subscribers: &[SubscriberId],
    lists: &[ListId],
    action: MembershipAction,
) -> MembershipRequest<'a> {
    MembershipRequest {
        ids: subscribers.iter().map(SubscriberId::get).collect(),
        action: action.as_str(),
        target_list_ids: lists.iter().map(ListId::get).collect(),
        status: match action {
            MembershipAction::Add => Some("confirmed"),
            MembershipAction::Remove => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::api::Envelope;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_campaign() {
        let json = r#"{
            "data": {
                "id": 12,
                "name": "Base campaign",
                "subject": "Subject",
                "body": "Campaign body",
                "content_type": "richtext",
                "type": "regular",
                "from_email": "News <news@example.com>",
                "messenger": "email",
                "template_id": 1,
                "tags": null,
                "lists": [{"id": 3, "name": "testlist"}, {"id": null, "name": "gone"}],
                "started_at": "2024-05-01T12:30:00.123456+02:00",
                "status": "finished"
            }
        }"#;

        let envelope: Envelope<ApiCampaign> = serde_json::from_str(json).unwrap();
        let campaign = normalize_campaign(envelope.data);

        assert_eq!(campaign.id, CampaignId(12));
        assert_eq!(campaign.lists, vec![MailingList::new(3u64, "testlist")]);
        assert!(campaign.tags.is_empty());
        assert_eq!(campaign.status, CampaignStatus::Finished);
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(campaign.started_at, Some(expected));
    }

    #[test]
    fn test_normalize_unstarted_campaign() {
        let json = r#"{
            "id": 1, "name": "Draft", "subject": "s", "content_type": "html",
            "lists": [], "started_at": null, "status": "draft"
        }"#;
        let campaign = normalize_campaign(serde_json::from_str(json).unwrap());
        assert!(!campaign.is_started());
        assert!(campaign.lists.is_empty());
        assert_eq!(campaign.kind, CampaignKind::Regular);
    }

    #[test]
    fn test_normalize_subscriber() {
        let json = r#"{
            "id": 7,
            "email": "test1@example.com",
            "name": "User 1",
            "status": "enabled",
            "attribs": {"key": "abc"},
            "lists": [{
                "id": 3,
                "name": "testlist",
                "subscription_status": "confirmed",
                "subscription_created_at": "2024-05-02T08:00:00Z"
            }]
        }"#;

        let subscriber = normalize_subscriber(serde_json::from_str(json).unwrap());
        assert_eq!(subscriber.id, SubscriberId(7));
        assert_eq!(subscriber.attributes["key"], "abc");
        assert_eq!(subscriber.lists.len(), 1);
        assert_eq!(
            subscriber.lists[0].created_at,
            Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_join_time_is_never_new() {
        let json = r#"{
            "id": 8,
            "email": "test2@example.com",
            "name": "User 2",
            "attribs": {},
            "lists": [{"id": 3, "name": "testlist"}]
        }"#;

        let subscriber = normalize_subscriber(serde_json::from_str(json).unwrap());
        assert_eq!(subscriber.lists[0].created_at, DateTime::<Utc>::UNIX_EPOCH);
        assert!(!subscriber.joined_after(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(), &[ListId(3)]));
    }

    #[test]
    fn test_campaign_request_shape() {
        let draft = NewCampaign::new("Base_inc", "Subject", vec![ListId(9)]).with_body("Hi");
        let value = serde_json::to_value(campaign_request(&draft)).unwrap();

        assert_eq!(value["type"], "regular");
        assert_eq!(value["lists"], serde_json::json!([9]));
        assert!(value.get("from_email").is_none());
        assert!(value.get("template_id").is_none());
    }

    #[test]
    fn test_membership_request_shape() {
        let request = membership_request(
            &[SubscriberId(1), SubscriberId(2)],
            &[ListId(5)],
            MembershipAction::Add,
        );
        let value = serde_json::to_value(request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "ids": [1, 2],
                "action": "add",
                "target_list_ids": [5],
                "status": "confirmed"
            })
        );
    }
}
