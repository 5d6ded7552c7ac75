//! Terminal log sink

use chrono::Local;
use colored::Colorize;
use kcpvisor_core::sink::LogSink;

/// Prints each line with a local timestamp, tinted by its source
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for ConsoleSink {
    fn append_line(&self, line: &str) {
        let stamp = Local::now().format("%H:%M:%S").to_string();
        let text = if line.starts_with("[fetch]") {
            line.cyan()
        } else if line.starts_with("[kcptun]") {
            line.yellow()
        } else {
            line.normal()
        };
        println!("{} {}", stamp.dimmed(), text);
    }
}
