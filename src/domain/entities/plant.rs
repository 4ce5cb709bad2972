use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::entities::location::GeocodedAddress;

// ───── Constants ──────────────────────────────────────────────────────
const MAX_ID_LENGTH: u64 = 128;
const MAX_TEXT_LENGTH: u64 = 200;
const MAX_NOTES_LENGTH: u64 = 2_000;

const MAP_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

// ───── Stored document ───────────────────────────────────────────────

/// One inventory item as stored under
/// `artifacts/{appId}/users/{uid}/plants/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub date_uploaded: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_added: Option<NaiveDate>,
    #[serde(default)]
    pub added_by: String,
}

impl PlantRecord {
    /// String-coerced value of a field, looked up by its stored (camelCase)
    /// name. Unknown or missing fields read as the empty string.
    pub fn field_value(&self, key: &str) -> String {
        match key {
            "id" => self.id.clone(),
            "name" => self.name.clone(),
            "species" => self.species.clone(),
            "notes" => self.notes.clone(),
            "imageUrl" => self.image_url.clone(),
            "latitude" => self.latitude.map(|v| v.to_string()).unwrap_or_default(),
            "longitude" => self.longitude.map(|v| v.to_string()).unwrap_or_default(),
            "address" => self.address.clone(),
            "city" => self.city.clone(),
            "country" => self.country.clone(),
            "zip" => self.zip.clone(),
            "dateUploaded" => self.date_uploaded.map(|d| d.to_rfc3339()).unwrap_or_default(),
            "dateAdded" => self.date_added.map(|d| d.to_string()).unwrap_or_default(),
            "addedBy" => self.added_by.clone(),
            _ => String::new(),
        }
    }

    pub fn map_link(&self) -> Option<String> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(format!("{MAP_SEARCH_URL}{lat},{lng}")),
            _ => None,
        }
    }
}

// ───── Wizard draft ──────────────────────────────────────────────────

/// The unpersisted record held by an open wizard. Coordinates stay as the
/// text that was captured or typed until submit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDraft {
    pub id: String,
    pub name: String,
    pub species: String,
    pub notes: String,
    pub image_url: String,
    pub latitude: String,
    pub longitude: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip: String,
    pub date_uploaded: Option<DateTime<Utc>>,
    pub added_by: String,
}

impl PlantDraft {
    pub fn from_record(record: &PlantRecord) -> Self {
        PlantDraft {
            id: record.id.clone(),
            name: record.name.clone(),
            species: record.species.clone(),
            notes: record.notes.clone(),
            image_url: record.image_url.clone(),
            latitude: record.latitude.map(|v| v.to_string()).unwrap_or_default(),
            longitude: record.longitude.map(|v| v.to_string()).unwrap_or_default(),
            address: record.address.clone(),
            city: record.city.clone(),
            country: record.country.clone(),
            zip: record.zip.clone(),
            date_uploaded: record.date_uploaded,
            added_by: record.added_by.clone(),
        }
    }

    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.trim().is_empty()
    }

    pub fn is_located(&self) -> bool {
        !self.latitude.trim().is_empty() || !self.address.trim().is_empty()
    }

    /// Builds the document written at final submit. `owner` is only used when
    /// the draft has no `addedBy` yet.
    pub fn to_record(&self, owner: &str, date_added: NaiveDate) -> PlantRecord {
        let added_by = if self.added_by.is_empty() {
            owner.to_string()
        } else {
            self.added_by.clone()
        };

        PlantRecord {
            id: self.id.trim().to_string(),
            name: self.name.clone(),
            species: self.species.clone(),
            notes: self.notes.clone(),
            image_url: self.image_url.clone(),
            latitude: parse_coordinate(&self.latitude),
            longitude: parse_coordinate(&self.longitude),
            address: self.address.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
            zip: self.zip.clone(),
            date_uploaded: self.date_uploaded,
            date_added: Some(date_added),
            added_by,
        }
    }

    pub fn apply_patch(&mut self, patch: DraftPatch) {
        let DraftPatch {
            id,
            name,
            species,
            notes,
            image_url,
            latitude,
            longitude,
            address,
            city,
            country,
            zip,
        } = patch;

        assign(&mut self.id, id);
        assign(&mut self.name, name);
        assign(&mut self.species, species);
        assign(&mut self.notes, notes);
        assign(&mut self.image_url, image_url);
        assign(&mut self.latitude, latitude);
        assign(&mut self.longitude, longitude);
        assign(&mut self.address, address);
        assign(&mut self.city, city);
        assign(&mut self.country, country);
        assign(&mut self.zip, zip);
    }

    pub fn apply_location(&mut self, latitude: f64, longitude: f64, geocoded: GeocodedAddress) {
        self.latitude = latitude.to_string();
        self.longitude = longitude.to_string();
        self.address = geocoded.address;
        self.city = geocoded.city;
        self.country = geocoded.country;
        self.zip = geocoded.zip;
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ───── Input & Validation Requests ──────────────────────────────────

/// Partial edit of the open draft. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DraftPatch {
    #[validate(length(max = MAX_ID_LENGTH), custom(function = "validate_plant_id"))]
    pub id: Option<String>,

    #[validate(length(max = MAX_TEXT_LENGTH))]
    pub name: Option<String>,

    #[validate(length(max = MAX_TEXT_LENGTH))]
    pub species: Option<String>,

    #[validate(length(max = MAX_NOTES_LENGTH))]
    pub notes: Option<String>,

    #[validate(custom(function = "validate_image_url"))]
    pub image_url: Option<String>,

    #[validate(custom(function = "validate_latitude"))]
    pub latitude: Option<String>,

    #[validate(custom(function = "validate_longitude"))]
    pub longitude: Option<String>,

    #[validate(length(max = MAX_NOTES_LENGTH))]
    pub address: Option<String>,

    #[validate(length(max = MAX_TEXT_LENGTH))]
    pub city: Option<String>,

    #[validate(length(max = MAX_TEXT_LENGTH))]
    pub country: Option<String>,

    #[validate(length(max = 32))]
    pub zip: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScanRequest {
    #[validate(
        length(min = 1, max = MAX_ID_LENGTH, message = "Scanned code cannot be empty"),
        custom(function = "validate_plant_id")
    )]
    pub code: String,
}

fn new_validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Identifiers double as document keys, so path separators are rejected.
pub fn validate_plant_id(id: &str) -> Result<(), ValidationError> {
    if id.contains('/') {
        return Err(new_validation_error("plant_id_slash", "Plant ID cannot contain '/'"));
    }
    Ok(())
}

pub fn validate_image_url(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.starts_with("data:image/") {
        return Ok(());
    }
    match url::Url::parse(value) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
        Ok(_) => Err(new_validation_error("invalid_url_scheme", "Image URL must be http(s) or an embedded image")),
        Err(_) => Err(new_validation_error("invalid_url", "Invalid image URL format")),
    }
}

pub fn validate_latitude(value: &str) -> Result<(), ValidationError> {
    validate_coordinate(value, 90.0, "Latitude must be a number between -90 and 90")
}

pub fn validate_longitude(value: &str) -> Result<(), ValidationError> {
    validate_coordinate(value, 180.0, "Longitude must be a number between -180 and 180")
}

fn validate_coordinate(value: &str, bound: f64, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    match parse_coordinate(value) {
        Some(v) if v.abs() <= bound => Ok(()),
        _ => Err(new_validation_error("invalid_coordinate", message)),
    }
}

// ───── API Response Models ──────────────────────────────────────────

/// A record as one signed-in user sees it in the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantView {
    #[serde(flatten)]
    pub record: PlantRecord,
    pub map_link: Option<String>,
    pub added_by_display: String,
}

impl PlantView {
    pub fn new(record: PlantRecord, viewer_uid: &str) -> Self {
        let added_by_display = if record.added_by == viewer_uid { "Me" } else { "Other" };
        PlantView {
            map_link: record.map_link(),
            added_by_display: added_by_display.to_string(),
            record,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Like [`PlantRecord::field_value`], plus the derived display columns.
    pub fn field_value(&self, key: &str) -> String {
        match key {
            "addedByDisplay" => self.added_by_display.clone(),
            "location" | "mapLink" => self.map_link.clone().unwrap_or_default(),
            _ => self.record.field_value(key),
        }
    }
}

/// Overwrites `slot` only when a value was sent.
pub(crate) fn assign(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *slot = value;
    }
}
