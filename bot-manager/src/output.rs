//! Accumulated user-visible output of one invocation. Reading drains it.

/// Output buffer: grows during a run, emptied on [`OutputBuffer::take`].
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    buf: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` as given.
    pub fn push(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// Appends `line` followed by a newline.
    pub fn push_line(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    /// Returns everything accumulated so far and clears the buffer.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_drains() {
        let mut out = OutputBuffer::new();
        assert_eq!(out.take(), "");

        out.push("some more demo output...");
        out.push("...and even more!!");
        assert_eq!(out.as_str(), "some more demo output......and even more!!");
        assert_eq!(out.take(), "some more demo output......and even more!!");
        assert!(out.is_empty());
        assert_eq!(out.take(), "");
    }

    #[test]
    fn test_push_line() {
        let mut out = OutputBuffer::new();
        out.push_line("Webhook was deleted");
        out.push_line("Webhook was set");
        assert_eq!(out.take(), "Webhook was deleted\nWebhook was set\n");
    }
}
