//! Listmonk API HTTP client
//!
//! Implements [`MailingService`] over the Listmonk REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::time::Duration;
use ureq::Agent;
use url::Url;

use super::api::{
    ApiCampaign, ApiList, ApiSubscriber, CreateListRequest, Envelope, Page, StatusRequest,
};
use super::normalize::{campaign_request, membership_request, subscriber_request};
use super::{ListmonkAuth, normalize_campaign, normalize_list, normalize_subscriber};
use crate::config::ServiceSettings;
use crate::error::{Result, ServiceError};
use crate::models::{
    Campaign, CampaignId, CampaignStatus, ListId, MailingList, MembershipAction, NewCampaign,
    NewSubscriber, Subscriber, SubscriberId,
};
use crate::remote::{MailingService, SubscriberFilter};

type Response = ureq::http::Response<ureq::Body>;

/// Map a transport error to the service taxonomy
fn request_error(err: ureq::Error, entity: &'static str, key: impl Display) -> ServiceError {
    match err {
        ureq::Error::StatusCode(404) => ServiceError::not_found(entity, key),
        ureq::Error::StatusCode(code @ (400 | 422)) => {
            ServiceError::Validation(format!("{} {} rejected with HTTP {}", entity, key, code))
        }
        other => ServiceError::Remote(format!("{} {}: {}", entity, key, other)),
    }
}

/// Decode the `data` payload of a response
fn read_data<T: DeserializeOwned>(mut response: Response) -> Result<T> {
    let envelope: Envelope<T> = response
        .body_mut()
        .read_json()
        .map_err(|e| ServiceError::Remote(format!("Failed to parse response: {}", e)))?;
    Ok(envelope.data)
}

/// Listmonk API client
pub struct ListmonkClient {
    agent: Agent,
    base: Url,
    auth: ListmonkAuth,
}

impl ListmonkClient {
    /// Create a client from connection settings
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        // Url::join replaces the last path segment unless it ends with '/'
        let mut base = settings.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base = Url::parse(&base)
            .map_err(|e| ServiceError::Validation(format!("invalid base URL {}: {}", settings.base_url, e)))?;

        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build();

        Ok(Self {
            agent: Agent::new_with_config(config),
            base,
            auth: ListmonkAuth::from_settings(settings),
        })
    }

    /// Absolute URL for an API path plus query parameters
    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ServiceError::Validation(format!("invalid API path {}: {}", path, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        match self.auth.header() {
            Some(header) => request.header("Authorization", &header),
            None => request,
        }
    }

    fn get(&self, url: &Url) -> std::result::Result<Response, ureq::Error> {
        self.authorize(self.agent.get(url.as_str())).call()
    }

    fn delete(&self, url: &Url) -> std::result::Result<Response, ureq::Error> {
        self.authorize(self.agent.delete(url.as_str())).call()
    }

    fn post<T: serde::Serialize>(&self, url: &Url, body: &T) -> std::result::Result<Response, ureq::Error> {
        self.authorize(self.agent.post(url.as_str())).send_json(body)
    }

    fn put<T: serde::Serialize>(&self, url: &Url, body: &T) -> std::result::Result<Response, ureq::Error> {
        self.authorize(self.agent.put(url.as_str())).send_json(body)
    }
}

impl MailingService for ListmonkClient {
    fn list_lists(&self) -> Result<Vec<MailingList>> {
        let url = self.endpoint("api/lists", &[("per_page", "all")])?;
        let response = self.get(&url).map_err(|e| request_error(e, "lists", "listing"))?;
        let page: Page<ApiList> = read_data(response)?;
        Ok(page.results.into_iter().map(normalize_list).collect())
    }

    fn create_list(&self, name: &str) -> Result<MailingList> {
        let url = self.endpoint("api/lists", &[])?;
        let body = CreateListRequest {
            name,
            kind: "private",
            optin: "single",
        };
        let response = self.post(&url, &body).map_err(|e| request_error(e, "list", name))?;
        Ok(normalize_list(read_data(response)?))
    }

    fn delete_list(&self, id: ListId) -> Result<()> {
        let url = self.endpoint(&format!("api/lists/{}", id), &[])?;
        self.delete(&url).map_err(|e| request_error(e, "list", id))?;
        Ok(())
    }

    fn get_campaign(&self, id: CampaignId) -> Result<Campaign> {
        let url = self.endpoint(&format!("api/campaigns/{}", id), &[])?;
        let response = self.get(&url).map_err(|e| request_error(e, "campaign", id))?;
        let campaign: ApiCampaign = read_data(response)?;
        Ok(normalize_campaign(campaign))
    }

    fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let url = self.endpoint("api/campaigns", &[("per_page", "all")])?;
        let response = self
            .get(&url)
            .map_err(|e| request_error(e, "campaigns", "listing"))?;
        let page: Page<ApiCampaign> = read_data(response)?;
        Ok(page.results.into_iter().map(normalize_campaign).collect())
    }

    fn update_campaign_status(&self, id: CampaignId, status: CampaignStatus) -> Result<()> {
        let url = self.endpoint(&format!("api/campaigns/{}/status", id), &[])?;
        let body = StatusRequest {
            status: status.as_str(),
        };
        self.put(&url, &body)
            .map_err(|e| request_error(e, "campaign", id))?;
        Ok(())
    }

    fn create_campaign(&self, campaign: &NewCampaign) -> Result<Campaign> {
        let url = self.endpoint("api/campaigns", &[])?;
        let response = self
            .post(&url, &campaign_request(campaign))
            .map_err(|e| request_error(e, "campaign", &campaign.name))?;
        Ok(normalize_campaign(read_data(response)?))
    }

    fn delete_campaign(&self, id: CampaignId) -> Result<()> {
        let url = self.endpoint(&format!("api/campaigns/{}", id), &[])?;
        self.delete(&url).map_err(|e| request_error(e, "campaign", id))?;
        Ok(())
    }

    fn query_subscribers(&self, filter: &SubscriberFilter) -> Result<Vec<Subscriber>> {
        let query = filter.to_query();
        let mut params = vec![("per_page", "all")];
        if !query.is_empty() {
            params.push(("query", query.as_str()));
        }
        let url = self.endpoint("api/subscribers", &params)?;
        let response = self
            .get(&url)
            .map_err(|e| request_error(e, "subscribers", "query"))?;
        let page: Page<ApiSubscriber> = read_data(response)?;
        Ok(page.results.into_iter().map(normalize_subscriber).collect())
    }

    fn update_memberships(
        &self,
        subscribers: &[SubscriberId],
        lists: &[ListId],
        action: MembershipAction,
    ) -> Result<()> {
        let url = self.endpoint("api/subscribers/lists", &[])?;
        let body = membership_request(subscribers, lists, action);
        self.put(&url, &body)
            .map_err(|e| request_error(e, "subscriber lists", action.as_str()))?;
        Ok(())
    }

    fn get_subscriber(&self, id: SubscriberId) -> Result<Subscriber> {
        let url = self.endpoint(&format!("api/subscribers/{}", id), &[])?;
        let response = self.get(&url).map_err(|e| request_error(e, "subscriber", id))?;
        Ok(normalize_subscriber(read_data(response)?))
    }

    fn create_subscriber(&self, subscriber: &NewSubscriber) -> Result<Subscriber> {
        let url = self.endpoint("api/subscribers", &[])?;
        let response = self
            .post(&url, &subscriber_request(subscriber))
            .map_err(|e| request_error(e, "subscriber", &subscriber.email))?;
        Ok(normalize_subscriber(read_data(response)?))
    }

    fn update_subscriber(&self, id: SubscriberId, subscriber: &NewSubscriber) -> Result<Subscriber> {
        let url = self.endpoint(&format!("api/subscribers/{}", id), &[])?;
        let response = self
            .put(&url, &subscriber_request(subscriber))
            .map_err(|e| request_error(e, "subscriber", id))?;
        Ok(normalize_subscriber(read_data(response)?))
    }

    fn delete_subscriber(&self, id: SubscriberId) -> Result<()> {
        let url = self.endpoint(&format!("api/subscribers/{}", id), &[])?;
        self.delete(&url).map_err(|e| request_error(e, "subscriber", id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ListmonkClient {
        ListmonkClient::new(&ServiceSettings::new(base_url)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let client = client("http://localhost:9000");
        let url = client.endpoint("api/campaigns/4/status", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/campaigns/4/status");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("https://example.com/listmonk/");
        let url = client.endpoint("/api/lists", &[("per_page", "all")]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/listmonk/api/lists?per_page=all");
    }

    #[test]
    fn test_endpoint_encodes_query() {
        let client = client("http://localhost:9000");
        let filter = SubscriberFilter::email("a'b@example.com");
        let query = filter.to_query();
        let url = client.endpoint("api/subscribers", &[("query", query.as_str())]).unwrap();

        let (_, value) = url.query_pairs().next().unwrap();
        assert_eq!(value, "subscribers.email = 'a''b@example.com'");
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ListmonkClient::new(&ServiceSettings::new("not a url"));
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_status_mapping() {
        let err = request_error(ureq::Error::StatusCode(404), "campaign", 999_999);
        assert!(err.is_not_found());

        let err = request_error(ureq::Error::StatusCode(400), "subscriber", "x");
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = request_error(ureq::Error::StatusCode(500), "list", 1);
        assert!(matches!(err, ServiceError::Remote(_)));
    }
}
