//! Third-party event catalog (Discovery v2 shaped).
//!
//! Only the handful of fields the screens read are modelled. Upstream bodies
//! are parsed leniently: a missing `_embedded` block is an empty page, and a
//! body that does not parse at all is logged and treated the same way.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use wapi_shared::constants::{DEFAULT_EVENT_KEYWORD, DEFAULT_TICKET_PRICE, PLACEHOLDER_IMAGE_URL};

use crate::api::error_detail;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PriceRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One catalog event, flattened from the upstream document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDetail {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub local_date: Option<String>,
    pub local_time: Option<String>,
    pub venue: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
    pub info: Option<String>,
    pub price_ranges: Vec<PriceRange>,
}

impl EventDetail {
    pub fn image_url(&self) -> &str {
        self.image.as_deref().unwrap_or(PLACEHOLDER_IMAGE_URL)
    }

    pub fn venue_label(&self) -> &str {
        self.venue.as_deref().unwrap_or("TBA")
    }

    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("TBA")
    }

    pub fn description(&self) -> &str {
        self.info.as_deref().unwrap_or("No description available.")
    }

    /// Price charged for one ticket: the lowest bound of the first range.
    pub fn ticket_price(&self) -> f64 {
        self.price_ranges
            .first()
            .and_then(|r| r.min)
            .filter(|p| *p > 0.0)
            .unwrap_or(DEFAULT_TICKET_PRICE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub keyword: String,
    pub city: Option<String>,
    pub page: u32,
    pub size: u32,
}

impl EventQuery {
    pub fn new(size: u32) -> Self {
        Self {
            keyword: DEFAULT_EVENT_KEYWORD.to_string(),
            city: None,
            page: 0,
            size,
        }
    }

    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    pub events: Vec<EventDetail>,
    pub has_more: bool,
}

// Upstream shapes.

#[derive(Debug, Default, Deserialize)]
struct RawSearch {
    #[serde(default, rename = "_embedded")]
    embedded: Option<RawEmbeddedEvents>,
    #[serde(default)]
    page: Option<RawPage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEmbeddedEvents {
    #[serde(default)]
    events: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<RawImage>,
    #[serde(default)]
    dates: RawDates,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price_ranges: Vec<PriceRange>,
    #[serde(default, rename = "_embedded")]
    embedded: RawEventEmbedded,
}

#[derive(Debug, Default, Deserialize)]
struct RawImage {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDates {
    #[serde(default)]
    start: RawStart,
    #[serde(default)]
    status: RawStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStart {
    local_date: Option<String>,
    local_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEventEmbedded {
    #[serde(default)]
    venues: Vec<RawVenue>,
}

#[derive(Debug, Default, Deserialize)]
struct RawVenue {
    name: Option<String>,
    #[serde(default)]
    address: Option<RawLine>,
    #[serde(default)]
    city: Option<RawNamed>,
    #[serde(default)]
    country: Option<RawNamed>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLine {
    line1: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNamed {
    name: Option<String>,
}

impl From<RawEvent> for EventDetail {
    fn from(raw: RawEvent) -> Self {
        let venue = raw.embedded.venues.into_iter().next();
        let (venue, address, city, country) = match venue {
            Some(v) => (
                v.name,
                v.address.and_then(|a| a.line1),
                v.city.and_then(|c| c.name),
                v.country.and_then(|c| c.name),
            ),
            None => (None, None, None, None),
        };
        Self {
            id: raw.id,
            name: raw.name,
            image: raw
                .images
                .into_iter()
                .next()
                .and_then(|i| i.url)
                .filter(|u| !u.is_empty()),
            local_date: raw.dates.start.local_date,
            local_time: raw.dates.start.local_time,
            venue,
            address,
            city,
            country,
            status: raw.dates.status.code,
            info: raw.info.or(raw.description),
            price_ranges: raw.price_ranges,
        }
    }
}

#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CatalogClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_http(reqwest::Client::new(), &config.catalog_url, &config.ticket_key)
    }

    pub fn with_http(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn get_value(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Value> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .query(&[("apikey", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "catalog response");
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(error_detail(&body)));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Upcoming events matching the query, earliest first.
    pub async fn search_events(&self, query: &EventQuery) -> ApiResult<EventPage> {
        let keyword = match query.keyword.trim() {
            "" => DEFAULT_EVENT_KEYWORD,
            k => k,
        };
        let mut params = vec![
            ("keyword", keyword.to_string()),
            ("page", query.page.to_string()),
            ("size", query.size.to_string()),
            ("sort", "date,asc".to_string()),
        ];
        if let Some(city) = query.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            params.push(("city", city.to_string()));
        }

        let body = self.get_value("events.json", &params).await?;
        let raw: RawSearch = match serde_json::from_value(body) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Unexpected catalog search body");
                return Ok(EventPage::default());
            }
        };

        let events = raw
            .embedded
            .map(|e| e.events)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<RawEvent>(v) {
                Ok(event) => Some(EventDetail::from(event)),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed catalog event");
                    None
                }
            })
            .collect();
        let total_pages = raw.page.map(|p| p.total_pages).unwrap_or(0);

        Ok(EventPage {
            events,
            has_more: query.page + 1 < total_pages,
        })
    }

    pub async fn get_event(&self, id: &str) -> ApiResult<EventDetail> {
        let body = self.get_value(&format!("events/{id}.json"), &[]).await?;
        let raw: RawEvent =
            serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(raw.into())
    }
}
