use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, LAYOUT_KEY};

/// Fallback card size in cells, used when a persisted length string cannot
/// be resolved.
pub const FALLBACK_WIDTH: u16 = 40;
pub const FALLBACK_HEIGHT: u16 = 18;

/// Geometry and visibility for one card. This struct is the exact persisted
/// shape: `hidden` is stored rather than `visible` so existing blobs without
/// the field read as visible, and sizes stay strings so percentage and auto
/// lengths remain representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub x: i32,
    pub y: i32,
    pub width: String,
    pub height: String,
    #[serde(default)]
    pub hidden: bool,
}

impl Card {
    pub fn visible(&self) -> bool {
        !self.hidden
    }
}

/// Full persisted mapping of card id to geometry. BTreeMap keeps the
/// serialized key order canonical, so an unmodified load-save round trip
/// reproduces the blob byte for byte.
pub type LayoutSnapshot = BTreeMap<String, Card>;

const CARD_DEFAULTS: [(&str, i32, i32, &str, &str); 6] = [
    ("card-memo", 2, 1, "40px", "18px"),
    ("card-calendar", 44, 1, "40px", "18px"),
    ("card-events", 86, 1, "36px", "9px"),
    ("card-holidays", 86, 11, "36px", "9px"),
    ("card-fr-news", 2, 20, "80px", "11px"),
    ("card-weather", 84, 20, "38px", "11px"),
];

pub fn default_layout() -> LayoutSnapshot {
    CARD_DEFAULTS
        .iter()
        .map(|(id, x, y, width, height)| {
            (
                id.to_string(),
                Card {
                    x: *x,
                    y: *y,
                    width: width.to_string(),
                    height: height.to_string(),
                    hidden: false,
                },
            )
        })
        .collect()
}

/// Resolves a stored length string against the container extent, in cells.
/// `"<n>px"` is taken literally, `"<n>%"` is relative to the container, and
/// anything else (including `"auto"`) falls back.
pub fn resolve_length(value: &str, container: u16, fallback: u16) -> u16 {
    let value = value.trim();
    if let Some(cells) = value.strip_suffix("px") {
        if let Ok(cells) = cells.trim().parse::<u16>() {
            return cells;
        }
    } else if let Some(percent) = value.strip_suffix('%') {
        if let Ok(percent) = percent.trim().parse::<u32>() {
            return ((u32::from(container) * percent) / 100).min(u32::from(u16::MAX)) as u16;
        }
    }
    fallback
}

/// Resolved card extent in cells, including the border.
pub fn card_size(card: &Card, container: (u16, u16)) -> (u16, u16) {
    (
        resolve_length(&card.width, container.0, FALLBACK_WIDTH),
        resolve_length(&card.height, container.1, FALLBACK_HEIGHT),
    )
}

/// Owns every card record. Mutations hit the in-memory snapshot first and
/// write through the key-value store; when persistence fails the in-memory
/// snapshot stays authoritative for the session and a warning is recorded.
pub struct LayoutStore {
    cards: LayoutSnapshot,
    warning: Option<String>,
}

impl LayoutStore {
    /// Load-or-default: a missing blob yields the default table, a malformed
    /// blob falls back to the default table wholesale, and a readable blob is
    /// topped up with defaults for any card id it does not mention.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut warning = None;
        let mut cards = match store.get(LAYOUT_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<LayoutSnapshot>(&raw) {
                Ok(cards) => cards,
                Err(err) => {
                    warning = Some(format!("stored layout is unreadable, using defaults: {err}"));
                    default_layout()
                }
            },
            Ok(None) => default_layout(),
            Err(err) => {
                warning = Some(format!("could not read stored layout, using defaults: {err}"));
                default_layout()
            }
        };

        for (id, card) in default_layout() {
            cards.entry(id).or_insert(card);
        }

        Self { cards, warning }
    }

    pub fn snapshot(&self) -> &LayoutSnapshot {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn set_geometry(
        &mut self,
        store: &mut dyn KeyValueStore,
        id: &str,
        position: Option<(i32, i32)>,
        size: Option<(String, String)>,
    ) {
        if let Some(card) = self.cards.get_mut(id) {
            if let Some((x, y)) = position {
                card.x = x;
                card.y = y;
            }
            if let Some((width, height)) = size {
                card.width = width;
                card.height = height;
            }
            self.save(store);
        }
    }

    pub fn set_visible(&mut self, store: &mut dyn KeyValueStore, id: &str, visible: bool) {
        if let Some(card) = self.cards.get_mut(id) {
            card.hidden = !visible;
            self.save(store);
        }
    }

    /// In-memory move with no persist. The drag loop calls this on every
    /// pointer move and issues one `save` on pointer-up.
    pub fn set_position_unsaved(&mut self, id: &str, x: i32, y: i32) {
        if let Some(card) = self.cards.get_mut(id) {
            card.x = x;
            card.y = y;
        }
    }

    /// Discards all records, restores the default table, and persists it.
    pub fn apply_defaults(&mut self, store: &mut dyn KeyValueStore) {
        self.cards = default_layout();
        self.save(store);
    }

    pub fn save(&mut self, store: &mut dyn KeyValueStore) {
        let blob = match serde_json::to_string(&self.cards) {
            Ok(blob) => blob,
            Err(err) => {
                self.warning = Some(format!("could not encode layout: {err}"));
                return;
            }
        };

        if let Err(err) = store.set(LAYOUT_KEY, &blob) {
            self.warning = Some(format!(
                "layout not saved, changes last only this session: {err}"
            ));
        }
    }

    pub fn take_warning(&mut self) -> Option<String> {
        self.warning.take()
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{KeyValueStore, LAYOUT_KEY, MemoryStore};

    use super::{LayoutStore, card_size, default_layout, resolve_length};

    #[test]
    fn load_without_blob_yields_defaults() {
        let store = MemoryStore::new();
        let mut layout = LayoutStore::load(&store);

        assert_eq!(layout.snapshot(), &default_layout());
        assert!(layout.take_warning().is_none());
    }

    #[test]
    fn save_after_load_is_byte_identical() {
        let mut store = MemoryStore::new();
        let mut layout = LayoutStore::load(&store);
        layout.set_geometry(&mut store, "card-memo", Some((7, 3)), None);
        let first = store
            .get(LAYOUT_KEY)
            .expect("read should succeed")
            .expect("blob should exist");

        let mut reloaded = LayoutStore::load(&store);
        reloaded.save(&mut store);
        let second = store
            .get(LAYOUT_KEY)
            .expect("read should succeed")
            .expect("blob should exist");

        assert_eq!(first, second);
    }

    #[test]
    fn malformed_blob_falls_back_to_defaults_with_warning() {
        let store = MemoryStore::seed(LAYOUT_KEY, "{{{{");
        let mut layout = LayoutStore::load(&store);

        assert_eq!(layout.snapshot(), &default_layout());
        assert!(layout.take_warning().is_some());
    }

    #[test]
    fn partial_blob_is_filled_from_the_default_table() {
        let store = MemoryStore::seed(
            LAYOUT_KEY,
            r#"{"card-memo":{"x":9,"y":9,"width":"10px","height":"5px","hidden":true}}"#,
        );
        let layout = LayoutStore::load(&store);

        let memo = layout.card("card-memo").expect("memo card should exist");
        assert_eq!((memo.x, memo.y), (9, 9));
        assert!(!memo.visible());

        let calendar = layout
            .card("card-calendar")
            .expect("calendar card should exist");
        assert_eq!(calendar, &default_layout()["card-calendar"]);
    }

    #[test]
    fn blob_without_hidden_field_reads_as_visible() {
        let store = MemoryStore::seed(
            LAYOUT_KEY,
            r#"{"card-memo":{"x":1,"y":1,"width":"10px","height":"5px"}}"#,
        );
        let layout = LayoutStore::load(&store);
        assert!(layout.card("card-memo").expect("card should exist").visible());
    }

    #[test]
    fn hide_then_reset_restores_default_geometry_and_blob() {
        let mut store = MemoryStore::new();
        let mut layout = LayoutStore::load(&store);
        layout.set_visible(&mut store, "card-memo", false);
        layout.set_geometry(&mut store, "card-memo", Some((50, 50)), None);

        layout.apply_defaults(&mut store);

        let memo = layout.card("card-memo").expect("memo card should exist");
        assert!(memo.visible());
        assert_eq!(memo, &default_layout()["card-memo"]);

        let blob = store
            .get(LAYOUT_KEY)
            .expect("read should succeed")
            .expect("blob should exist");
        let expected =
            serde_json::to_string(&default_layout()).expect("defaults should serialize");
        assert_eq!(blob, expected);
    }

    #[test]
    fn write_failure_keeps_in_memory_state() {
        let mut store = MemoryStore::new();
        let mut layout = LayoutStore::load(&store);
        store.fail_writes = true;

        layout.set_geometry(&mut store, "card-memo", Some((12, 4)), None);

        let memo = layout.card("card-memo").expect("memo card should exist");
        assert_eq!((memo.x, memo.y), (12, 4));
        assert!(layout.take_warning().is_some());
    }

    #[test]
    fn lengths_resolve_px_percent_and_fallback() {
        assert_eq!(resolve_length("40px", 120, 7), 40);
        assert_eq!(resolve_length(" 25% ", 120, 7), 30);
        assert_eq!(resolve_length("auto", 120, 7), 7);
        assert_eq!(resolve_length("nonsense", 120, 7), 7);

        let card = &default_layout()["card-events"];
        assert_eq!(card_size(card, (120, 40)), (36, 9));
    }
}
