use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    entities::location::{GeocodedAddress, ReverseGeocodeResponse},
    repositories::geocoder::ReverseGeocoder,
    settings::AppConfig,
};

/// Reverse lookups against a Nominatim-compatible `/reverse` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client for geocoding: {}", e);
                Client::new()
            });

        NominatimGeocoder {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.geocode_base_url,
            &config.geocode_user_agent,
            Duration::from_secs(config.geocode_timeout_secs),
        )
    }

    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<GeocodedAddress, reqwest::Error> {
        let response = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "json".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: ReverseGeocodeResponse = response.json().await?;
        Ok(body.into())
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> GeocodedAddress {
        match self.lookup(latitude, longitude).await {
            Ok(address) => address,
            Err(e) => {
                tracing::warn!(latitude, longitude, "Error during reverse geocoding: {}", e);
                GeocodedAddress::default()
            }
        }
    }
}
