use std::io;

use crossterm::{clipboard::CopyToClipboard, execute};
use trashcal_core::{Clipboard, ClipboardError};

/// Clipboard backed by the terminal's OSC 52 escape sequence.
pub(crate) struct TerminalClipboard;

impl Clipboard for TerminalClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        execute!(io::stdout(), CopyToClipboard::to_clipboard_from(text))
            .map_err(|err| ClipboardError(err.to_string()))
    }
}
