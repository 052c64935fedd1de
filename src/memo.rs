use crate::storage::{KeyValueStore, MEMO_KEY};

pub const MEMO_MAX: usize = 5000;

/// The memo card's text. A plain string behind the key-value store; when the
/// store stops accepting writes the text survives in memory for the rest of
/// the session.
pub struct Memo {
    text: String,
}

impl Memo {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let text = match store.get(MEMO_KEY) {
            Ok(Some(text)) => text,
            Ok(None) | Err(_) => String::new(),
        };
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the status message to show. Over-long memos are rejected
    /// without touching stored state; failed writes keep the new text in
    /// memory and say so.
    pub fn save(&mut self, store: &mut dyn KeyValueStore, text: String) -> Result<String, String> {
        if text.chars().count() > MEMO_MAX {
            return Err(format!("too long ({}/{MEMO_MAX})", text.chars().count()));
        }

        let result = store.set(MEMO_KEY, &text);
        self.text = text;
        match result {
            Ok(()) => Ok("memo saved".to_string()),
            Err(err) => Ok(format!("storage unavailable, memo kept for this session ({err})")),
        }
    }
}
