//! Observer sink
//!
//! The adapter and the drivers report through an injected observer instead of
//! a global logger, so tests can swap in a recorder.

use std::sync::{Arc, Mutex};

/// Severity of an observed event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// Receives lifecycle events from the adapter and drivers
pub trait Observer: Send + Sync {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards every event to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn shared() -> Arc<dyn Observer> {
        Arc::new(Self)
    }
}

impl Observer for TracingObserver {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(Level, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events, oldest first
    pub fn events(&self) -> Vec<(Level, String)> {
        self.lock().clone()
    }

    /// Messages recorded at `level`
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.lock().push((level, message.to_string()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Level, String)>> {
        // A panic while holding the lock leaves the list intact
        self.events.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Observer for RecordingObserver {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warning(&self, message: &str) {
        self.push(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.info("one");
        observer.warning("two");
        observer.error("three");

        assert_eq!(
            observer.events(),
            vec![
                (Level::Info, "one".to_string()),
                (Level::Warning, "two".to_string()),
                (Level::Error, "three".to_string()),
            ]
        );
        assert_eq!(observer.messages(Level::Warning), vec!["two".to_string()]);
    }
}
