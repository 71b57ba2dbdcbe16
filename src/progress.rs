//! Daily workout progress - per-user completion flags in the local store
//!
//! Each completed day is one key `"<userId>_<YYYY-MM-DD>"` holding
//! `{"date":"<YYYY-MM-DD>","status":true}`. Only completed days are stored:
//! un-marking a day removes its key, so a missing key means "not completed".

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, error, info, warn};

use crate::db::KeyValueStore;
use crate::error::StoreError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Dot colour of a completed day on the calendar
pub const COMPLETED_DOT_COLOR: &str = "green";

/// How long the celebration after completing a day stays on screen
pub const CELEBRATION_DURATION: Duration = Duration::from_millis(3000);

/// Stored value of a progress record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub date: String,
    pub status: bool,
}

/// Calendar marking of a single day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayMark {
    pub marked: bool,
    #[serde(rename = "dotColor", skip_serializing_if = "Option::is_none")]
    pub dot_color: Option<&'static str>,
}

impl DayMark {
    pub fn completed() -> Self {
        Self {
            marked: true,
            dot_color: Some(COMPLETED_DOT_COLOR),
        }
    }

    /// Left behind in memory after un-marking; never produced by a reload
    pub fn cleared() -> Self {
        Self {
            marked: false,
            dot_color: None,
        }
    }
}

/// Day → marking, ready for calendar rendering
///
/// Serializes as `{"2024-05-01": {"marked": true, "dotColor": "green"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarMarkMap(BTreeMap<NaiveDate, DayMark>);

impl CalendarMarkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&DayMark> {
        self.0.get(date)
    }

    pub fn is_marked(&self, date: &NaiveDate) -> bool {
        self.0.get(date).is_some_and(|m| m.marked)
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.0.contains_key(date)
    }

    pub fn insert(&mut self, date: NaiveDate, mark: DayMark) {
        self.0.insert(date, mark);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &DayMark)> {
        self.0.iter()
    }

    /// Days currently marked, ascending
    pub fn marked_dates(&self) -> Vec<NaiveDate> {
        self.0
            .iter()
            .filter(|(_, mark)| mark.marked)
            .map(|(date, _)| *date)
            .collect()
    }
}

impl Serialize for CalendarMarkMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .map(|(date, mark)| (date.format(DATE_FORMAT).to_string(), mark)),
        )
    }
}

/// Emitted when a day becomes completed; the renderer shows it for `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Celebration {
    pub date: NaiveDate,
    pub duration: Duration,
}

/// Result of a successful toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub date: NaiveDate,
    /// New completion status
    pub completed: bool,
    pub celebration: Option<Celebration>,
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn key_prefix(user_id: &str) -> String {
    format!("{}_", user_id)
}

/// Storage key of one (user, day) record
pub fn progress_key(user_id: &str, date: NaiveDate) -> String {
    format!("{}{}", key_prefix(user_id), date.format(DATE_FORMAT))
}

pub struct ProgressTracker {
    store: Rc<dyn KeyValueStore>,
}

impl ProgressTracker {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Rebuild the calendar map from every stored record of `user_id`.
    ///
    /// A store failure degrades to an empty map.
    pub fn load_progress(&self, user_id: &str) -> CalendarMarkMap {
        self.try_load_progress(user_id).unwrap_or_else(|e| {
            error!(user_id, error = %e, "Error fetching progress");
            CalendarMarkMap::new()
        })
    }

    /// Like [`load_progress`](Self::load_progress) but reports store failures.
    ///
    /// Malformed records are skipped with a warning; the rest still load.
    pub fn try_load_progress(&self, user_id: &str) -> Result<CalendarMarkMap, StoreError> {
        let prefix = key_prefix(user_id);
        let keys: Vec<String> = self
            .store
            .all_keys()?
            .into_iter()
            .filter(|key| owned_by(key, &prefix))
            .collect();

        let mut marks = CalendarMarkMap::new();
        if keys.is_empty() {
            return Ok(marks);
        }

        for (key, value) in self.store.multi_get(&keys)? {
            let Some(value) = value else { continue };
            let record: ProgressRecord = match serde_json::from_str(&value) {
                Ok(record) => record,
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping malformed progress record");
                    continue;
                }
            };
            let Some(date) = parse_date(&record.date) else {
                warn!(key = %key, date = %record.date, "Skipping progress record with invalid date");
                continue;
            };
            if record.status {
                marks.insert(date, DayMark::completed());
            }
        }

        debug!(user_id, days = marks.len(), "Progress loaded");
        Ok(marks)
    }

    /// Flip the completion of `date` for `user_id`.
    ///
    /// Marking writes the record; un-marking deletes it. `marks` is updated
    /// only after the store call succeeds: a completed day becomes
    /// `{marked: true, dotColor: green}`, an un-marked one stays in the map
    /// as `{marked: false}`.
    pub fn toggle_date(
        &self,
        user_id: &str,
        date: NaiveDate,
        marks: &mut CalendarMarkMap,
    ) -> Result<ToggleOutcome, StoreError> {
        let completed = !marks.is_marked(&date);
        let key = progress_key(user_id, date);

        let written = if completed {
            let record = ProgressRecord {
                date: date.format(DATE_FORMAT).to_string(),
                status: true,
            };
            serde_json::to_string(&record)
                .map_err(StoreError::from)
                .and_then(|value| self.store.set(&key, &value))
        } else {
            self.store.remove(&key)
        };
        if let Err(e) = written {
            error!(key = %key, error = %e, "Error updating progress");
            return Err(e);
        }

        let celebration = if completed {
            marks.insert(date, DayMark::completed());
            Some(Celebration {
                date,
                duration: CELEBRATION_DURATION,
            })
        } else {
            marks.insert(date, DayMark::cleared());
            None
        };

        info!(user_id, date = %date, completed, "Progress updated");
        Ok(ToggleOutcome {
            date,
            completed,
            celebration,
        })
    }
}

/// `key` is a progress record of the user owning `prefix`.
///
/// The remainder after the prefix must itself be a date, so user `u1` never
/// picks up the records of user `u1_x`.
fn owned_by(key: &str, prefix: &str) -> bool {
    let Some(rest) = key.strip_prefix(prefix) else {
        return false;
    };
    if NaiveDate::parse_from_str(rest, DATE_FORMAT).is_err() {
        debug!(key, "Skipping key without a date suffix");
        return false;
    }
    true
}
