//! Provider for the Rouyn-Noranda citizen portal.
//!
//! The portal is an October CMS site: both address pickers and the schedule
//! panel are AJAX partials requested from the calendar page itself, routed by
//! request headers rather than by URL. The schedule partial embeds a link to
//! a personalized iCalendar export, which is what the pipeline downloads.

mod scrape;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use ramasse_core::{
    model::AddressQuery,
    ports::{AddressDirectory, FeedSource, PortError},
};

/// Portal origin serving the collection calendar.
const BASE_URL: &str = "https://citoyen.rouyn-noranda.ca";
/// Calendar page; also the endpoint every AJAX partial is posted to.
const CALENDAR_PATH: &str = "/calendrier-de-collectes";

// October CMS routes AJAX posts through these headers. The handler and
// partial names must match the site's component wiring exactly, otherwise
// the response carries no fragment.
const HEADER_REQUESTED_WITH: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");
const HEADER_HANDLER: &str = "X-OCTOBER-REQUEST-HANDLER";
const HEADER_PARTIALS: &str = "X-OCTOBER-REQUEST-PARTIALS";

const CIVIC_HANDLER: &str = "addressPicker::onChangeStreet";
const CIVIC_PARTIAL: &str = "addressPicker::dropdown_civic";
const SCHEDULE_HANDLER: &str = "avisComposanteCollectes0::onSubmitAddressFromPicker";
const SCHEDULE_PARTIAL: &str = "avisComposanteCollectes0::schedule";
/// Some portal deployments key the same fragment under this alias.
const SCHEDULE_PARTIAL_FALLBACK: &str = "#schedule";

const FIELD_STREET: &str = "addresses_street";
const FIELD_CIVIC: &str = "addresses_civic";

/// Address lookups against the portal's dependent dropdowns.
pub struct RouynNorandaDirectory {
    client: Client,
    base_url: String,
}

impl RouynNorandaDirectory {
    /// Create a directory bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    /// Like [`RouynNorandaDirectory::new`], with a custom portal origin.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(client: Client, base_url: S) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn page_url(&self) -> String {
        format!("{}{CALENDAR_PATH}", self.base_url)
    }

    async fn try_streets(&self) -> Result<Vec<String>, PortError> {
        let html = self
            .client
            .get(self.page_url())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(scrape::street_options(&html))
    }

    async fn try_civic_numbers(&self, street: &str) -> Result<Vec<String>, PortError> {
        let response: Value = self
            .client
            .post(self.page_url())
            .header(HEADER_REQUESTED_WITH.0, HEADER_REQUESTED_WITH.1)
            .header(HEADER_HANDLER, CIVIC_HANDLER)
            .header(HEADER_PARTIALS, CIVIC_PARTIAL)
            .form(&[(FIELD_STREET, street)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let fragment = response
            .get(CIVIC_PARTIAL)
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(scrape::civic_options(fragment))
    }
}

#[async_trait]
impl AddressDirectory for RouynNorandaDirectory {
    async fn streets(&self) -> Vec<String> {
        match self.try_streets().await {
            Ok(streets) => streets,
            Err(err) => {
                tracing::warn!(error = %err, "street lookup degraded to an empty list");
                Vec::new()
            }
        }
    }

    async fn civic_numbers(&self, street: &str) -> Vec<String> {
        match self.try_civic_numbers(street).await {
            Ok(numbers) => numbers,
            Err(err) => {
                tracing::warn!(street, error = %err, "civic lookup degraded to an empty list");
                Vec::new()
            }
        }
    }
}

/// Locates the personalized iCalendar export for an address and downloads it.
pub struct RouynNorandaFeedSource {
    client: Client,
    base_url: String,
}

impl RouynNorandaFeedSource {
    /// Create a feed source bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    /// Like [`RouynNorandaFeedSource::new`], with a custom portal origin.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(client: Client, base_url: S) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn page_url(&self) -> String {
        format!("{}{CALENDAR_PATH}", self.base_url)
    }

    /// Submit the address and return the schedule partial, or `None` when the
    /// response carries no usable fragment under either known key.
    async fn schedule_fragment(&self, query: &AddressQuery) -> Result<Option<String>, PortError> {
        let response: Value = self
            .client
            .post(self.page_url())
            .header(HEADER_REQUESTED_WITH.0, HEADER_REQUESTED_WITH.1)
            .header(HEADER_HANDLER, SCHEDULE_HANDLER)
            .header(HEADER_PARTIALS, SCHEDULE_PARTIAL)
            .form(&[
                (FIELD_STREET, query.street.as_str()),
                (FIELD_CIVIC, query.civic_number.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(fragment_from(&response)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToOwned::to_owned))
    }
}

/// Pick the schedule fragment out of the AJAX envelope, trying the partial
/// name first and the alias some deployments answer with second.
fn fragment_from(response: &Value) -> Option<&str> {
    response
        .get(SCHEDULE_PARTIAL)
        .and_then(Value::as_str)
        .or_else(|| response.get(SCHEDULE_PARTIAL_FALLBACK).and_then(Value::as_str))
}

#[async_trait]
impl FeedSource for RouynNorandaFeedSource {
    async fn fetch_feed(&self, query: &AddressQuery) -> Result<Option<Vec<u8>>, PortError> {
        let Some(fragment) = self.schedule_fragment(query).await? else {
            tracing::debug!(
                street = %query.street,
                civic = %query.civic_number,
                "portal response carries no schedule fragment"
            );
            return Ok(None);
        };
        let feed_url =
            scrape::feed_url(&fragment, &self.base_url).ok_or(PortError::InvalidAddress)?;
        tracing::debug!(%feed_url, "downloading calendar feed");
        let bytes = self
            .client
            .get(&feed_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(Some(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on the discard port, so requests fail at connect time
    // without touching the network.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    #[tokio::test]
    async fn street_lookup_degrades_to_empty_when_unreachable() {
        let directory = RouynNorandaDirectory::with_base_url(Client::new(), UNREACHABLE);
        assert!(directory.streets().await.is_empty());
    }

    #[tokio::test]
    async fn civic_lookup_degrades_to_empty_when_unreachable() {
        let directory = RouynNorandaDirectory::with_base_url(Client::new(), UNREACHABLE);
        assert!(directory.civic_numbers("Avenue Principale").await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_portal_is_a_network_error() {
        let source = RouynNorandaFeedSource::with_base_url(Client::new(), UNREACHABLE);
        let err = source
            .fetch_feed(&AddressQuery::new("Avenue Principale", "123"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Network(_)));
    }

    #[test]
    fn fragment_lookup_prefers_the_partial_name_over_the_alias() {
        let both = serde_json::json!({
            SCHEDULE_PARTIAL: "<div>primary</div>",
            SCHEDULE_PARTIAL_FALLBACK: "<div>alias</div>",
        });
        assert_eq!(fragment_from(&both), Some("<div>primary</div>"));

        let alias_only = serde_json::json!({ SCHEDULE_PARTIAL_FALLBACK: "<div>alias</div>" });
        assert_eq!(fragment_from(&alias_only), Some("<div>alias</div>"));

        assert_eq!(fragment_from(&serde_json::json!({})), None);
    }
}
