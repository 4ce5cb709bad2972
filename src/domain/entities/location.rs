use serde::{Deserialize, Serialize};
use validator::Validate;

/// Postal fields resolved from a coordinate pair. All empty when the lookup
/// fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodedAddress {
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip: String,
}

impl GeocodedAddress {
    pub fn is_empty(&self) -> bool {
        self.address.is_empty() && self.city.is_empty() && self.country.is_empty() && self.zip.is_empty()
    }
}

/// Body of a reverse lookup from a Nominatim-compatible service.
#[derive(Debug, Default, Deserialize)]
pub struct ReverseGeocodeResponse {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: Option<ReverseGeocodeAddress>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReverseGeocodeAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub country: Option<String>,
    pub postcode: Option<String>,
}

impl From<ReverseGeocodeResponse> for GeocodedAddress {
    fn from(response: ReverseGeocodeResponse) -> Self {
        let parts = response.address.unwrap_or_default();
        GeocodedAddress {
            address: response.display_name.unwrap_or_default(),
            city: parts.city.or(parts.town).or(parts.village).unwrap_or_default(),
            country: parts.country.unwrap_or_default(),
            zip: parts.postcode.unwrap_or_default(),
        }
    }
}

/// Coordinates captured by the device for the open draft.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,
}
