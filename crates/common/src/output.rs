//! Output protocol spoken to the host
//!
//! Everything the executor tells the host goes over stdout as one JSON
//! object per line, tagged by `type`.

use std::io::Write;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::ExecutionResult;

/// One line of host-facing output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputLine {
    Event { content: String },
    Log { content: String },
    Result { result: ExecutionResult },
    Error { content: String },
}

impl OutputLine {
    /// Event line with the details joined by spaces
    pub fn event(message: &str, details: &[String]) -> Self {
        let mut content = message.to_string();
        for detail in details {
            content.push(' ');
            content.push_str(detail);
        }
        OutputLine::Event { content }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write this line followed by a newline
    pub fn write_to<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        writeln!(writer, "{}", self.to_json()?)?;
        Ok(())
    }
}

/// Receives structured progress events from the runner
pub trait EventSink {
    fn event(&self, message: &str, details: &[String]);

    /// Free-form diagnostic text for the host
    fn log(&self, content: &str) {
        debug!("{}", content);
    }
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn event(&self, message: &str, details: &[String]) {
        (**self).event(message, details)
    }

    fn log(&self, content: &str) {
        (**self).log(content)
    }
}

/// Sink that logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn event(&self, message: &str, details: &[String]) {
        info!(details = ?details, "{}", message);
    }
}

/// Sink that writes `event` lines to a writer
#[derive(Debug)]
pub struct JsonLineSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write> JsonLineSink<W> {
    fn write_line(&self, line: OutputLine) {
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = line.write_to(&mut *writer) {
            warn!("Failed to write output line: {}", e);
        }
    }
}

impl<W: Write> EventSink for JsonLineSink<W> {
    fn event(&self, message: &str, details: &[String]) {
        self.write_line(OutputLine::event(message, details));
    }

    fn log(&self, content: &str) {
        self.write_line(OutputLine::Log {
            content: content.to_string(),
        });
    }
}
