//! Diagnostic sinks for the deprecation annotator.
//!
//! The annotator never fails a request. Inputs it cannot honour are reported
//! as warning text through a [`DiagnosticSink`] handed to it by the caller.

use std::sync::{Arc, Mutex};
use tracing::warn;

/// Receiver of warning-level diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn warn(&self, message: &str);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn warn(&self, message: &str) {
        (**self).warn(message)
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Arc<S> {
    fn warn(&self, message: &str) {
        (**self).warn(message)
    }
}

/// Forwards diagnostics to `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, message: &str) {
        warn!(target: "deprecation", "{}", message);
    }
}

/// Keeps every diagnostic in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded messages.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.messages().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn warn(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
    }
}
