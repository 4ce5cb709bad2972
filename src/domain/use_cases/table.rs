use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::plant::{assign, PlantRecord, PlantView};

pub const NO_SELECTION_MESSAGE: &str = "Select at least one plant to delete.";

const MAX_FILTER_LENGTH: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SortConfig {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortConfig {
    /// Clicking the active ascending column flips it; anything else sorts
    /// ascending on the requested column.
    pub fn request(&mut self, key: &str) {
        let direction = match (&self.key, self.direction) {
            (Some(active), SortDirection::Ascending) if active == key => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        self.key = Some(key.to_string());
        self.direction = direction;
    }

    /// Stable; rows with equal values keep their incoming order.
    pub fn apply(&self, rows: &mut [PlantView]) {
        let Some(key) = &self.key else {
            return;
        };
        match self.direction {
            SortDirection::Ascending => rows.sort_by_cached_key(|row| row.field_value(key)),
            SortDirection::Descending => rows.sort_by_cached_key(|row| Reverse(row.field_value(key))),
        }
    }
}

/// Column filters. Each non-empty value must appear, case-insensitively,
/// in the same field of the row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlantFilters {
    #[serde(default)]
    #[validate(length(max = MAX_FILTER_LENGTH))]
    pub country: String,

    #[serde(default)]
    #[validate(length(max = MAX_FILTER_LENGTH))]
    pub added_by: String,

    #[serde(default)]
    #[validate(length(max = MAX_FILTER_LENGTH))]
    pub date_added: String,
}

impl PlantFilters {
    pub fn is_empty(&self) -> bool {
        self.country.is_empty() && self.added_by.is_empty() && self.date_added.is_empty()
    }

    fn entries(&self) -> [(&'static str, &str); 3] {
        [
            ("country", self.country.as_str()),
            ("addedBy", self.added_by.as_str()),
            ("dateAdded", self.date_added.as_str()),
        ]
    }

    pub fn matches(&self, row: &PlantView) -> bool {
        self.entries().iter().all(|(key, wanted)| {
            if wanted.is_empty() {
                return true;
            }
            contains_ignore_case(&row.field_value(key), wanted)
        })
    }
}

/// Body of `PUT /dashboard/filters`. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FilterUpdate {
    #[validate(length(max = MAX_FILTER_LENGTH))]
    pub query: Option<String>,

    #[validate(length(max = MAX_FILTER_LENGTH))]
    pub country: Option<String>,

    #[validate(length(max = MAX_FILTER_LENGTH))]
    pub added_by: Option<String>,

    #[validate(length(max = MAX_FILTER_LENGTH))]
    pub date_added: Option<String>,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Free-text search over `id` and `name`.
pub fn matches_query(row: &PlantView, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    contains_ignore_case(&row.record.id, query) || contains_ignore_case(&row.record.name, query)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePlan {
    NothingSelected,
    NeedsConfirmation { prompt: String },
    Confirmed(Vec<String>),
}

pub fn delete_prompt(count: usize) -> String {
    format!("Are you sure you want to permanently delete {count} plant(s)?")
}

/// Sort, filter and selection state of the plant list.
#[derive(Debug, Clone, Default)]
pub struct InventoryTable {
    pub sort: SortConfig,
    pub filters: PlantFilters,
    pub query: String,
    selected: Vec<String>,
}

impl InventoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rows the list shows, in display order.
    pub fn visible(&self, records: &[PlantRecord], viewer_uid: &str) -> Vec<PlantView> {
        let mut rows: Vec<PlantView> = records
            .iter()
            .cloned()
            .map(|record| PlantView::new(record, viewer_uid))
            .filter(|row| matches_query(row, &self.query) && self.filters.matches(row))
            .collect();
        self.sort.apply(&mut rows);
        rows
    }

    pub fn update_filters(&mut self, update: FilterUpdate) {
        let FilterUpdate {
            query,
            country,
            added_by,
            date_added,
        } = update;

        assign(&mut self.query, query);
        assign(&mut self.filters.country, country);
        assign(&mut self.filters.added_by, added_by);
        assign(&mut self.filters.date_added, date_added);
    }

    /// Resets the column filters. The search text is left alone.
    pub fn clear_filters(&mut self) {
        self.filters = PlantFilters::default();
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn toggle_row(&mut self, id: &str) {
        if self.is_selected(id) {
            self.selected.retain(|s| s != id);
        } else {
            self.selected.push(id.to_string());
        }
    }

    /// Selects every visible row, or clears the selection when all of them
    /// already are.
    pub fn toggle_select_all(&mut self, visible_ids: &[String]) {
        let all_selected = !visible_ids.is_empty() && visible_ids.iter().all(|id| self.is_selected(id));

        if all_selected {
            self.selected.clear();
        } else {
            self.selected = visible_ids.to_vec();
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn plan_delete(&self, confirmed: bool) -> DeletePlan {
        if self.selected.is_empty() {
            DeletePlan::NothingSelected
        } else if !confirmed {
            DeletePlan::NeedsConfirmation {
                prompt: delete_prompt(self.selected.len()),
            }
        } else {
            DeletePlan::Confirmed(self.selected.clone())
        }
    }
}
