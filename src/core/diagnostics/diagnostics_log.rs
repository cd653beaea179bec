// Diagnostic event log for the book pipeline.
//
// The pipeline writes here but never reads back, so a sink is purely
// observational. The production sink keeps only the most recent events
// (a bounded ring buffer) so a long-running caller can't grow it forever.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

/// How many events the ring buffer keeps before dropping the oldest.
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 400;

/// One entry in the diagnostic log.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticEvent {
    pub name: String,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl DiagnosticEvent {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
            recorded_at: Utc::now(),
        }
    }
}

/// Where diagnostic events go.
///
/// Recording must never fail or panic: the pipeline calls this on its error
/// paths and can't afford a second failure there.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: DiagnosticEvent);
}

/// Sink that discards everything.
#[allow(dead_code)]
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record(&self, _event: DiagnosticEvent) {}
}

/// Bounded, append-only diagnostic log.
pub struct RingBufferLog {
    capacity: usize,
    events: Mutex<VecDeque<DiagnosticEvent>>,
}

impl RingBufferLog {
    pub fn new(capacity: usize) -> Self {
        // A zero capacity would silently drop everything; keep at least one slot.
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    #[allow(dead_code)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<DiagnosticEvent> {
        self.lock().iter().cloned().collect()
    }

    /// Number of recorded events with the given name.
    #[allow(dead_code)]
    pub fn count(&self, name: &str) -> usize {
        self.lock().iter().filter(|e| e.name == name).count()
    }

    /// Pretty JSON dump of the current contents.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    // A panic while holding the lock can't corrupt a VecDeque of owned
    // events, so a poisoned lock is simply taken over.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<DiagnosticEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RingBufferLog {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTICS_CAPACITY)
    }
}

impl DiagnosticSink for RingBufferLog {
    fn record(&self, event: DiagnosticEvent) {
        tracing::debug!(event = %event.name, payload = %event.payload, "Diagnostic event");

        let mut events = self.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}
