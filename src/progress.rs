//! Progress events and the terminal summary of an import run.

use crate::models::Direction;
use log::debug;
use serde::Serialize;
use tokio::sync::mpsc;

/// Phases of an import, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportPhase {
    Initializing,
    Decompressing,
    ParsingIndex,
    ImportingEntries,
    Finalizing,
    Completed,
    Error,
}

impl ImportPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportPhase::Completed | ImportPhase::Error)
    }

    /// Human readable stage label.
    pub fn description(self) -> &'static str {
        match self {
            ImportPhase::Initializing => "Initializing",
            ImportPhase::Decompressing => "Decompressing dictionaries",
            ImportPhase::ParsingIndex => "Parsing indexes",
            ImportPhase::ImportingEntries => "Importing entries",
            ImportPhase::Finalizing => "Finalizing",
            ImportPhase::Completed => "Completed",
            ImportPhase::Error => "Failed",
        }
    }
}

/// Represents a snapshot of the import, sent after every phase transition and batch flush.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportProgress {
    pub phase: ImportPhase,
    /// Direction being imported, when the phase is direction-specific.
    pub direction: Option<Direction>,
    pub total_entries: u64,
    pub processed_entries: u64,
    pub successful_entries: u64,
    pub failed_entries: u64,
    pub current_batch: u64,
    pub total_batches: u64,
    pub message: String,
}

impl ImportProgress {
    /// A fresh event for `phase` with all counters at zero.
    pub fn new(phase: ImportPhase, message: impl Into<String>) -> Self {
        ImportProgress {
            phase,
            direction: None,
            total_entries: 0,
            processed_entries: 0,
            successful_entries: 0,
            failed_entries: 0,
            current_batch: 0,
            total_batches: 0,
            message: message.into(),
        }
    }

    /// Processed fraction in `0.0..=1.0`, or 0 when the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total_entries == 0 {
            0.0
        } else {
            (self.processed_entries as f64 / self.total_entries as f64).min(1.0)
        }
    }
}

/// Final summary of an import run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportResult {
    pub success: bool,
    pub cancelled: bool,
    /// Index locations considered, malformed index lines included.
    pub total_entries: u64,
    pub successful_entries: u64,
    pub failed_entries: u64,
    /// Records written to the store (one per surviving translation).
    pub inserted_records: u64,
    pub duration_ms: u64,
    /// The first [`MAX_RETAINED_ERRORS`] error messages.
    pub errors: Vec<String>,
    pub resulting_store_size_bytes: u64,
}

/// Most error messages kept per run.
pub const MAX_RETAINED_ERRORS: usize = 100;

/// Error sample with a hard cap; later messages are only counted.
#[derive(Debug, Default, Clone)]
pub struct ErrorLog {
    messages: Vec<String>,
    dropped: u64,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        if self.messages.len() < MAX_RETAINED_ERRORS {
            self.messages.push(message.into());
        } else {
            self.dropped += 1;
        }
    }

    /// Total messages pushed, retained or not.
    pub fn total(&self) -> u64 {
        self.messages.len() as u64 + self.dropped
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// Sending half of the progress channel.
pub type ProgressReporter = mpsc::Sender<ImportProgress>;

/// Creates a progress channel with room for `capacity` pending events.
pub fn progress_channel(capacity: usize) -> (ProgressReporter, mpsc::Receiver<ImportProgress>) {
    mpsc::channel(capacity.max(1))
}

/// Sends an update; a dropped receiver is not an error for the sender.
pub async fn report_progress_async(reporter: &ProgressReporter, update: ImportProgress) {
    if let Err(e) = reporter.send(update).await {
        debug!("Progress receiver dropped: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_log_caps_retained_messages() {
        let mut log = ErrorLog::new();
        for i in 0..250 {
            log.push(format!("error {i}"));
        }
        assert_eq!(log.messages().len(), MAX_RETAINED_ERRORS);
        assert_eq!(log.total(), 250);
        assert_eq!(log.messages()[0], "error 0");
        assert_eq!(log.into_messages()[99], "error 99");
    }

    #[test]
    fn test_fraction() {
        let mut progress = ImportProgress::new(ImportPhase::ImportingEntries, "");
        assert_eq!(progress.fraction(), 0.0);
        progress.total_entries = 200;
        progress.processed_entries = 50;
        assert_eq!(progress.fraction(), 0.25);
    }

    #[test]
    fn test_phase_flags() {
        assert!(ImportPhase::Completed.is_terminal());
        assert!(ImportPhase::Error.is_terminal());
        assert!(!ImportPhase::Finalizing.is_terminal());
        assert_eq!(
            serde_json::to_string(&ImportPhase::ParsingIndex).unwrap(),
            "\"PARSING_INDEX\""
        );
    }

    #[tokio::test]
    async fn test_report_ignores_dropped_receiver() {
        let (tx, rx) = progress_channel(1);
        drop(rx);
        // Must neither panic nor hang.
        report_progress_async(&tx, ImportProgress::new(ImportPhase::Initializing, "start")).await;
    }

    #[tokio::test]
    async fn test_report_delivers_updates() {
        let (tx, mut rx) = progress_channel(4);
        report_progress_async(&tx, ImportProgress::new(ImportPhase::Decompressing, "a")).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.phase, ImportPhase::Decompressing);
        assert_eq!(received.message, "a");
    }
}
