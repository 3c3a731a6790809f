pub(crate) const DATA_PREFIX: &str = "data: ";

/// Splits decoded text into newline-terminated frames.
///
/// Text after the last newline stays buffered until a later push completes
/// it.
#[derive(Debug, Default)]
pub(crate) struct FrameReassembler {
    buffer: String,
}

impl FrameReassembler {
    /// Appends `text` and returns every frame completed by it, in order.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(last_newline + 1);
        let mut complete = std::mem::replace(&mut self.buffer, rest);
        complete.pop();
        complete.split('\n').map(ToOwned::to_owned).collect()
    }

    /// Text still waiting for a terminating newline.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Discards and returns the unterminated remainder.
    pub fn take_pending(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

/// Returns the payload of a `data: ` line, or `None` for any other line.
pub(crate) fn data_payload(frame: &str) -> Option<&str> {
    frame.trim_end_matches('\r').strip_prefix(DATA_PREFIX)
}
