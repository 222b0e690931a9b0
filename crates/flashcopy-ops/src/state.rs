//! Observable coordinator state and its change notifications.

use std::path::PathBuf;

use flashcopy_core::{ImageInfoOutcome, ImageProcessOutcome, ProgressSnapshot};
use tokio::sync::broadcast;

/// A change or terminal event observers can react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    BusyChanged(bool),
    StatusChanged(String),
    ProgressChanged { copied: u64, total: u64, percent: u8 },
    TotalChanged(u64),
    /// Labelled step of a validation or combined extract-and-validate.
    ValidationProgress { label: String, percent: u8 },
    CopySucceeded,
    CopyFailed(String),
    /// Carries the path that was deleted.
    DeleteSucceeded(PathBuf),
    DeleteFailed(String),
    ValidationSucceeded {
        image_name: String,
        tar_path: Option<PathBuf>,
    },
    ValidationFailed(String),
    /// Raised for both success and failure; inspect `success`.
    ImageInfoExtracted(ImageInfoOutcome),
    /// Raised for both success and failure; inspect `success`.
    ImageInfoAndValidationCompleted(ImageProcessOutcome),
}

/// The coordinator's progress snapshot plus its notification channel.
///
/// Every setter raises the matching notification.
#[derive(Debug)]
pub struct ProgressState {
    snapshot: ProgressSnapshot,
    notify: broadcast::Sender<Notification>,
}

impl ProgressState {
    pub fn new(capacity: usize) -> Self {
        let (notify, _) = broadcast::channel(capacity.max(1));
        Self {
            snapshot: ProgressSnapshot::default(),
            notify,
        }
    }

    /// Subscribe to notifications raised from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notify.subscribe()
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    pub fn percent(&self) -> u8 {
        self.snapshot.percent()
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.snapshot.busy = busy;
        self.emit(Notification::BusyChanged(busy));
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.snapshot.status = status.into();
        self.emit(Notification::StatusChanged(self.snapshot.status.clone()));
    }

    /// Zero the byte counters ahead of a new copy.
    pub fn reset_progress(&mut self) {
        self.snapshot.copied_bytes = 0;
        self.snapshot.total_bytes = 0;
        self.emit_progress();
        self.emit(Notification::TotalChanged(0));
    }

    /// Apply one copy progress event.
    ///
    /// `TotalChanged` is only raised when the total actually moves.
    pub fn apply_copy_progress(&mut self, copied: u64, total: u64) {
        if self.snapshot.total_bytes != total {
            self.snapshot.total_bytes = total;
            self.emit(Notification::TotalChanged(total));
        }
        self.snapshot.copied_bytes = copied;
        self.emit_progress();
    }

    /// Raise a notification. Having no subscribers is not an error.
    pub fn emit(&self, notification: Notification) {
        let _ = self.notify.send(notification);
    }

    fn emit_progress(&self) {
        self.emit(Notification::ProgressChanged {
            copied: self.snapshot.copied_bytes,
            total: self.snapshot.total_bytes,
            percent: self.snapshot.percent(),
        });
    }
}
