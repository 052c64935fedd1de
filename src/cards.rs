use crate::drag::{DragSession, clamp_to_container};
use crate::layout::{Card, LayoutStore, card_size};
use crate::storage::KeyValueStore;

pub const MIN_CARD_WIDTH: u16 = 12;
pub const MIN_CARD_HEIGHT: u16 = 4;

/// Every card the dashboard knows, in canonical draw order (later entries
/// render on top). Ids are derived from the widget's role and never change,
/// so persisted geometry keeps matching across sessions.
pub const CARDS: [CardMeta; 6] = [
    CardMeta {
        id: "card-memo",
        title: "Memo",
    },
    CardMeta {
        id: "card-calendar",
        title: "Calendar",
    },
    CardMeta {
        id: "card-events",
        title: "Upcoming",
    },
    CardMeta {
        id: "card-holidays",
        title: "Holidays",
    },
    CardMeta {
        id: "card-fr-news",
        title: "News",
    },
    CardMeta {
        id: "card-weather",
        title: "Weather",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardMeta {
    pub id: &'static str,
    pub title: &'static str,
}

pub fn card_title(id: &str) -> &'static str {
    CARDS
        .iter()
        .find(|meta| meta.id == id)
        .map(|meta| meta.title)
        .unwrap_or("Card")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerOutcome {
    /// Nothing under the pointer, or the event was swallowed by a live drag.
    Miss,
    DragStarted {
        card_id: String,
    },
    CardClosed {
        card_id: String,
    },
    Clicked {
        card_id: String,
        /// Coordinates inside the card body (border excluded) when the click
        /// landed there; `None` for border clicks.
        content: Option<(u16, u16)>,
    },
}

/// Wires pointer input to the layout store: hit-tests cards topmost-first,
/// turns handle presses into drag sessions, close presses into visibility
/// changes, and keeps the draw order consistent with the live drag.
pub struct CardRegistry {
    layout: LayoutStore,
    drag: Option<DragSession>,
    order: Vec<&'static str>,
}

impl CardRegistry {
    pub fn new(layout: LayoutStore) -> Self {
        Self {
            layout,
            drag: None,
            order: CARDS.iter().map(|meta| meta.id).collect(),
        }
    }

    pub fn layout(&self) -> &LayoutStore {
        &self.layout
    }

    pub fn take_warning(&mut self) -> Option<String> {
        self.layout.take_warning()
    }

    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_ref().map(DragSession::card_id)
    }

    /// Visible cards back-to-front; render them in this order so the last
    /// one paints on top.
    pub fn visible_cards(&self) -> Vec<(&str, &Card)> {
        self.order
            .iter()
            .filter_map(|id| self.layout.card(id).map(|card| (*id, card)))
            .filter(|(_, card)| card.visible())
            .collect()
    }

    pub fn pointer_down(
        &mut self,
        store: &mut dyn KeyValueStore,
        pointer: (i32, i32),
        container: (u16, u16),
    ) -> PointerOutcome {
        // A second grab while a session is live is ignored; the pointer
        // capture belongs to the running session until its pointer-up.
        if self.drag.is_some() {
            return PointerOutcome::Miss;
        }

        let Some(card_id) = self.hit_test(pointer, container) else {
            return PointerOutcome::Miss;
        };
        let card = self
            .layout
            .card(card_id)
            .expect("hit card must exist in the layout");
        let (width, height) = card_size(card, container);
        let (local_x, local_y) = (pointer.0 - card.x, pointer.1 - card.y);

        if local_y == 0 {
            if local_x == i32::from(width) - 1 {
                let card_id = card_id.to_string();
                self.layout.set_visible(store, &card_id, false);
                return PointerOutcome::CardClosed { card_id };
            }

            // The whole remaining top border row is the drag handle.
            if let Some(session) = DragSession::begin(&self.layout, card_id, pointer) {
                let card_id = card_id.to_string();
                self.raise(card_id.as_str());
                self.drag = Some(session);
                return PointerOutcome::DragStarted { card_id };
            }
        }

        let inside_body = local_x > 0
            && local_x < i32::from(width) - 1
            && local_y > 0
            && local_y < i32::from(height) - 1;
        PointerOutcome::Clicked {
            card_id: card_id.to_string(),
            content: inside_body.then(|| (local_x as u16 - 1, local_y as u16 - 1)),
        }
    }

    pub fn pointer_moved(&mut self, pointer: (i32, i32), container: (u16, u16)) {
        if let Some(session) = &self.drag {
            session.pointer_moved(&mut self.layout, pointer, container);
        }
    }

    /// Ends the live drag, if any, restoring draw order and issuing the
    /// single save for the final position.
    pub fn pointer_up(&mut self, store: &mut dyn KeyValueStore) -> Option<String> {
        let session = self.drag.take()?;
        let card_id = session.card_id().to_string();
        session.finish(&mut self.layout, store);
        self.order = CARDS.iter().map(|meta| meta.id).collect();
        Some(card_id)
    }

    pub fn set_visible(&mut self, store: &mut dyn KeyValueStore, id: &str, visible: bool) {
        self.layout.set_visible(store, id, visible);
    }

    pub fn reset_layout(&mut self, store: &mut dyn KeyValueStore) {
        self.drag = None;
        self.order = CARDS.iter().map(|meta| meta.id).collect();
        self.layout.apply_defaults(store);
    }

    /// Keyboard move: same clamping as a drag, but each step is a discrete
    /// geometry mutation and persists immediately.
    pub fn move_card(
        &mut self,
        store: &mut dyn KeyValueStore,
        id: &str,
        delta: (i32, i32),
        container: (u16, u16),
    ) {
        let Some(card) = self.layout.card(id) else {
            return;
        };
        let size = card_size(card, container);
        let (x, y) = clamp_to_container(card.x + delta.0, card.y + delta.1, size, container);
        self.layout.set_geometry(store, id, Some((x, y)), None);
    }

    /// Resize notification for a card: the new extent is clamped to sane
    /// minimums and the container, then written through as literal cells.
    pub fn resize_card(
        &mut self,
        store: &mut dyn KeyValueStore,
        id: &str,
        delta: (i32, i32),
        container: (u16, u16),
    ) {
        let Some(card) = self.layout.card(id) else {
            return;
        };
        let (width, height) = card_size(card, container);
        let width = (i32::from(width) + delta.0)
            .clamp(i32::from(MIN_CARD_WIDTH), i32::from(container.0.max(MIN_CARD_WIDTH)))
            as u16;
        let height = (i32::from(height) + delta.1)
            .clamp(
                i32::from(MIN_CARD_HEIGHT),
                i32::from(container.1.max(MIN_CARD_HEIGHT)),
            ) as u16;
        self.layout
            .set_geometry(store, id, None, Some((format!("{width}px"), format!("{height}px"))));
    }

    /// Topmost visible card whose box contains the pointer.
    fn hit_test(&self, pointer: (i32, i32), container: (u16, u16)) -> Option<&'static str> {
        for id in self.order.iter().rev() {
            let Some(card) = self.layout.card(id) else {
                continue;
            };
            if !card.visible() {
                continue;
            }
            let (width, height) = card_size(card, container);
            let contains_x = pointer.0 >= card.x && pointer.0 < card.x + i32::from(width);
            let contains_y = pointer.1 >= card.y && pointer.1 < card.y + i32::from(height);
            if contains_x && contains_y {
                return Some(id);
            }
        }
        None
    }

    fn raise(&mut self, id: &str) {
        self.order.retain(|other| *other != id);
        if let Some(meta) = CARDS.iter().find(|meta| meta.id == id) {
            self.order.push(meta.id);
        }
    }
}
