//! Remembered body-part selection, stored as plain strings

use tracing::error;

use crate::db::KeyValueStore;
use crate::error::StoreError;

pub const SELECTED_BODY_PART_KEY: &str = "selectedBodyPart";
pub const SELECTED_BODY_PART_NAME_KEY: &str = "selectedBodyPartName";

pub fn remember_body_part(store: &dyn KeyValueStore, body_part_id: &str) -> Result<(), StoreError> {
    store.set(SELECTED_BODY_PART_KEY, body_part_id)
}

pub fn remember_body_part_name(store: &dyn KeyValueStore, name: &str) -> Result<(), StoreError> {
    store.set(SELECTED_BODY_PART_NAME_KEY, name)
}

/// Selected body-part id; blank values count as no selection
pub fn selected_body_part(store: &dyn KeyValueStore) -> Option<String> {
    read_non_blank(store, SELECTED_BODY_PART_KEY)
}

pub fn selected_body_part_name(store: &dyn KeyValueStore) -> Option<String> {
    read_non_blank(store, SELECTED_BODY_PART_NAME_KEY)
}

fn read_non_blank(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value.filter(|v| !v.trim().is_empty()),
        Err(e) => {
            error!(key, error = %e, "Failed to load selection");
            None
        }
    }
}
