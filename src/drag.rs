use crate::layout::{LayoutStore, card_size};
use crate::storage::KeyValueStore;

/// Clamps a card's top-left corner so its whole box stays inside the
/// container. A card larger than the container pins to the origin.
pub fn clamp_to_container(
    x: i32,
    y: i32,
    card: (u16, u16),
    container: (u16, u16),
) -> (i32, i32) {
    let max_x = (i32::from(container.0) - i32::from(card.0)).max(0);
    let max_y = (i32::from(container.1) - i32::from(card.1)).max(0);
    (x.clamp(0, max_x), y.clamp(0, max_y))
}

/// One live drag. The absence of a session is the idle state; constructing
/// the session is the pointer-down transition and consuming it with
/// [`DragSession::finish`] is the pointer-up transition. The stored card id
/// acts as the session token: moves apply only to the grabbed card, so a
/// stray event for another card cannot leak into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    card_id: String,
    grab_x: i32,
    grab_y: i32,
}

impl DragSession {
    /// Captures the offset between the pointer and the card's top-left so
    /// the card does not jump under the cursor on the first move.
    pub fn begin(layout: &LayoutStore, card_id: &str, pointer: (i32, i32)) -> Option<Self> {
        let card = layout.card(card_id)?;
        Some(Self {
            card_id: card_id.to_string(),
            grab_x: pointer.0 - card.x,
            grab_y: pointer.1 - card.y,
        })
    }

    pub fn card_id(&self) -> &str {
        &self.card_id
    }

    /// Applies one pointer move: new top-left is pointer minus grab offset,
    /// clamped to the container. Updates the in-memory snapshot only; the
    /// single persist happens on pointer-up.
    pub fn pointer_moved(
        &self,
        layout: &mut LayoutStore,
        pointer: (i32, i32),
        container: (u16, u16),
    ) {
        let Some(card) = layout.card(&self.card_id) else {
            return;
        };
        let size = card_size(card, container);
        let (x, y) = clamp_to_container(
            pointer.0 - self.grab_x,
            pointer.1 - self.grab_y,
            size,
            container,
        );
        layout.set_position_unsaved(&self.card_id, x, y);
    }

    /// Pointer-up: consumes the session and issues exactly one save for the
    /// final position.
    pub fn finish(self, layout: &mut LayoutStore, store: &mut dyn KeyValueStore) {
        layout.save(store);
    }
}

#[cfg(test)]
mod tests {
    use crate::layout::LayoutStore;
    use crate::storage::MemoryStore;

    use super::{DragSession, clamp_to_container};

    const CONTAINER: (u16, u16) = (120, 40);

    fn card_position(layout: &LayoutStore, id: &str) -> (i32, i32) {
        let card = layout.card(id).expect("card should exist");
        (card.x, card.y)
    }

    #[test]
    fn drag_follows_the_pointer_with_grab_offset() {
        let store = MemoryStore::new();
        let mut layout = LayoutStore::load(&store);

        // Grab the memo card (default 2,1) five cells into its handle.
        let session =
            DragSession::begin(&layout, "card-memo", (7, 1)).expect("session should start");
        session.pointer_moved(&mut layout, (30, 10), CONTAINER);

        assert_eq!(card_position(&layout, "card-memo"), (25, 10));
    }

    #[test]
    fn wild_pointer_sequences_stay_inside_the_container() {
        let store = MemoryStore::new();
        let mut layout = LayoutStore::load(&store);
        let session =
            DragSession::begin(&layout, "card-memo", (4, 2)).expect("session should start");

        // Card is 40x18 in a 120x40 container, so x <= 80 and y <= 22.
        for pointer in [
            (-500, -500),
            (0, 399),
            (500, 20),
            (119, -3),
            (5000, 5000),
            (64, 12),
        ] {
            session.pointer_moved(&mut layout, pointer, CONTAINER);
            let (x, y) = card_position(&layout, "card-memo");
            assert!((0..=80).contains(&x), "x out of bounds: {x}");
            assert!((0..=22).contains(&y), "y out of bounds: {y}");
        }

        assert_eq!(card_position(&layout, "card-memo"), (62, 11));
    }

    #[test]
    fn moves_do_not_persist_but_finish_saves_once() {
        let mut store = MemoryStore::new();
        let mut layout = LayoutStore::load(&store);
        let session =
            DragSession::begin(&layout, "card-memo", (4, 2)).expect("session should start");

        let before = store.writes;
        for step in 0..20 {
            session.pointer_moved(&mut layout, (10 + step, 5), CONTAINER);
        }
        assert_eq!(store.writes, before);

        session.finish(&mut layout, &mut store);
        assert_eq!(store.writes, before + 1);

        let reloaded = LayoutStore::load(&store);
        assert_eq!(card_position(&reloaded, "card-memo"), (27, 4));
    }

    #[test]
    fn oversized_card_pins_to_origin() {
        assert_eq!(clamp_to_container(15, -2, (50, 50), (30, 30)), (0, 0));
    }

    #[test]
    fn begin_on_unknown_card_yields_no_session() {
        let store = MemoryStore::new();
        let layout = LayoutStore::load(&store);
        assert!(DragSession::begin(&layout, "card-unknown", (0, 0)).is_none());
    }
}
