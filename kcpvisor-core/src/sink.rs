//! Log sink shared with the front-end
//!
//! The front-end renders status and child-process output line by line. Every
//! component receives the sink as `Arc<dyn LogSink>` and may call it from any
//! task.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Append-only text sink, one line per call
pub trait LogSink: Send + Sync {
    /// Append a single line. Implementations add the trailing newline.
    fn append_line(&self, line: &str);
}

impl std::fmt::Debug for dyn LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LogSink")
    }
}

/// Shared sink handle passed between components
pub type SharedSink = Arc<dyn LogSink>;

/// Forwards lines over an unbounded channel to a UI loop
///
/// For front-ends that own their render loop (a GUI text area, a TUI) and
/// must not be written to from the supervisor's tasks. The CLI prints
/// directly through its own console sink instead.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Create the sink together with the receiving end for the front-end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl LogSink for ChannelSink {
    fn append_line(&self, line: &str) {
        if self.sender.send(format!("{}\n", line)).is_err() {
            tracing::warn!("Log sink receiver dropped, discarding line");
        }
    }
}

/// In-memory text buffer, the backing store of a read-only text view
#[derive(Debug, Default)]
pub struct BufferSink {
    text: Mutex<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full buffer contents, newline-terminated lines
    pub fn contents(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Buffer contents split into lines
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl LogSink for BufferSink {
    fn append_line(&self, line: &str) {
        let mut text = self
            .text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        text.push_str(line);
        text.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sink_appends_newlines() {
        let sink = BufferSink::new();
        sink.append_line("[fetch] fetching latest binary...");
        sink.append_line("killed");

        assert_eq!(
            sink.contents(),
            "[fetch] fetching latest binary...\nkilled\n"
        );
        assert_eq!(sink.lines().len(), 2);
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_lines() {
        let (sink, mut receiver) = ChannelSink::new();
        sink.append_line("hello");

        assert_eq!(receiver.recv().await.as_deref(), Some("hello\n"));
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        sink.append_line("nobody listening");
    }
}
