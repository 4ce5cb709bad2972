use async_trait::async_trait;

use crate::entities::location::GeocodedAddress;

/// Coordinates to postal address. Never fails: a lookup that cannot be
/// completed yields an all-empty address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> GeocodedAddress;
}
