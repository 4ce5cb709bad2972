#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use indomitum_inventory::entities::plant::{PlantRecord, PlantView};

pub const OWNER: &str = "owner-uid";
pub const OTHER: &str = "other-uid";

/// 1x1 PNG.
pub const PNG_PIXEL: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

pub struct PlantBuilder {
    record: PlantRecord,
}

impl PlantBuilder {
    pub fn new(id: &str) -> Self {
        PlantBuilder {
            record: PlantRecord {
                id: id.to_string(),
                name: format!("Plant {id}"),
                image_url: "https://img.example.com/plant.jpg".into(),
                date_uploaded: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()),
                date_added: NaiveDate::from_ymd_opt(2024, 3, 1),
                added_by: OWNER.into(),
                ..PlantRecord::default()
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.record.name = name.into();
        self
    }

    pub fn country(mut self, country: &str) -> Self {
        self.record.country = country.into();
        self
    }

    pub fn added_by(mut self, uid: &str) -> Self {
        self.record.added_by = uid.into();
        self
    }

    pub fn located(mut self, latitude: f64, longitude: f64) -> Self {
        self.record.latitude = Some(latitude);
        self.record.longitude = Some(longitude);
        self
    }

    pub fn date_added(mut self, y: i32, m: u32, d: u32) -> Self {
        self.record.date_added = NaiveDate::from_ymd_opt(y, m, d);
        self
    }

    pub fn build(self) -> PlantRecord {
        self.record
    }

    pub fn view(self, viewer: &str) -> PlantView {
        PlantView::new(self.record, viewer)
    }
}

pub fn plant(id: &str) -> PlantBuilder {
    PlantBuilder::new(id)
}
