use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::storage::{EVENTS_KEY, KeyValueStore};

/// Canonical `YYYY-MM-DD` keys mapped to the titles recorded for that day.
/// Only the first title is shown today; the sequence shape leaves room for
/// more entries per day later.
pub type EventMap = BTreeMap<String, Vec<String>>;

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Owns the date-to-events mapping and writes it through the key-value store
/// on every mutation. Storage failures never roll back the in-memory state;
/// they surface as a one-shot warning and the session keeps working.
pub struct EventStore {
    events: EventMap,
    warning: Option<String>,
}

impl EventStore {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut warning = None;
        let events = match store.get(EVENTS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<EventMap>(&raw) {
                Ok(mut events) => {
                    // A key with no titles must not exist.
                    events.retain(|_, titles| !titles.is_empty());
                    events
                }
                Err(err) => {
                    warning = Some(format!("stored events are unreadable, starting empty: {err}"));
                    EventMap::new()
                }
            },
            Ok(None) => EventMap::new(),
            Err(err) => {
                warning = Some(format!("could not read stored events, starting empty: {err}"));
                EventMap::new()
            }
        };

        Self { events, warning }
    }

    /// Empty or whitespace-only titles delete the day outright; anything else
    /// replaces the day's sequence with the single trimmed title.
    pub fn edit(&mut self, store: &mut dyn KeyValueStore, date_key: &str, new_title: Option<&str>) {
        let title = new_title.map(str::trim).filter(|title| !title.is_empty());
        match title {
            Some(title) => {
                self.events
                    .insert(date_key.to_string(), vec![title.to_string()]);
            }
            None => {
                self.events.remove(date_key);
            }
        }

        self.persist(store);
    }

    pub fn get(&self, date_key: &str) -> &[String] {
        self.events
            .get(date_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn first_title(&self, date_key: &str) -> Option<&str> {
        self.events
            .get(date_key)
            .and_then(|titles| titles.first())
            .map(String::as_str)
    }

    pub fn all(&self) -> &EventMap {
        &self.events
    }

    pub fn take_warning(&mut self) -> Option<String> {
        self.warning.take()
    }

    fn persist(&mut self, store: &mut dyn KeyValueStore) {
        let blob = match serde_json::to_string(&self.events) {
            Ok(blob) => blob,
            Err(err) => {
                self.warning = Some(format!("could not encode events: {err}"));
                return;
            }
        };

        if let Err(err) = store.set(EVENTS_KEY, &blob) {
            self.warning = Some(format!(
                "events not saved, changes last only this session: {err}"
            ));
        }
    }
}
