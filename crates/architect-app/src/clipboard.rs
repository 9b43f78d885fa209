use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("clipboard write failed: {0}")]
    Write(String),
}

/// Somewhere generated text can be copied to.
pub trait ClipboardWriter: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard. The handle is opened on first use and kept, since on
/// X11 the owning process has to stay alive for the text to remain pasteable.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardWriter for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        let clipboard = match guard.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new()
                .map_err(|e| ClipboardError::Unavailable(e.to_string()))?,
        };
        guard
            .insert(clipboard)
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}
