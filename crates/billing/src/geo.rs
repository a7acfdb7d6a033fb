//! Best-effort country detection for gateway routing
//!
//! The backend routes Indian customers to the modal gateway and
//! everyone else to hosted checkout, keyed on the country code sent
//! with the order. Lookup failures fall back to the home market
//! rather than blocking checkout.

use serde::Deserialize;
use url::Url;

/// Country used when geolocation is unavailable or fails.
pub const DEFAULT_COUNTRY: &str = "IN";

#[derive(Deserialize)]
struct GeoResponse {
    country_code: Option<String>,
}

/// IP-geolocation client with a safe default.
#[derive(Clone)]
pub struct GeoLocator {
    http: reqwest::Client,
    endpoint: Option<Url>,
}

impl GeoLocator {
    pub fn new(endpoint: Option<Url>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Two-letter country code for the caller, `"IN"` on any failure.
    pub async fn country_code(&self) -> String {
        let Some(endpoint) = &self.endpoint else {
            return DEFAULT_COUNTRY.to_string();
        };

        let looked_up = async {
            let response = self.http.get(endpoint.clone()).send().await.ok()?;
            let body: GeoResponse = response.json().await.ok()?;
            body.country_code.filter(|c| !c.is_empty())
        }
        .await;

        match looked_up {
            Some(country) => country.to_ascii_uppercase(),
            None => {
                tracing::warn!("geolocation lookup failed, defaulting to {DEFAULT_COUNTRY}");
                DEFAULT_COUNTRY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_lookup_defaults_to_india() {
        let geo = GeoLocator::new(None);
        assert_eq!(geo.country_code().await, "IN");
    }

    #[tokio::test]
    async fn failed_lookup_defaults_to_india() {
        let geo = GeoLocator::new(Some(Url::parse("http://127.0.0.1:1/geo").unwrap()));
        assert_eq!(geo.country_code().await, "IN");
    }

    #[tokio::test]
    async fn successful_lookup_returns_uppercase_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/geo")
            .with_status(200)
            .with_body(r#"{"country_code": "us"}"#)
            .create_async()
            .await;

        let endpoint = Url::parse(&format!("{}/geo", server.url())).unwrap();
        let geo = GeoLocator::new(Some(endpoint));
        assert_eq!(geo.country_code().await, "US");
    }
}
