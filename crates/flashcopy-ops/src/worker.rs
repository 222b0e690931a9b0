//! The contract a background worker fulfils.

use std::path::Path;

use flashcopy_core::{ImageInfoOutcome, ImageProcessOutcome, Outcome, ValidationOutcome};
use tokio::sync::mpsc;

use crate::progress::{TaskEvent, TaskEventKind, TaskId};

/// Blocking implementation of every operation the coordinator dispatches.
///
/// Each call runs on its own blocking thread. Progress goes through the
/// [`Reporter`]; the returned value becomes the task's terminal result, so
/// nothing a worker reports can arrive after it. Progress must be reported
/// in non-decreasing order of work done.
pub trait Worker: Send + Sync + 'static {
    /// Copy `source` to `destination`, reporting `(copied, total)` bytes.
    fn copy(&self, source: &Path, destination: &Path, reporter: &Reporter) -> Outcome;

    /// Delete a file or directory.
    fn delete(&self, path: &Path) -> Outcome;

    /// Validate a disk image, reporting `(label, percent)` steps.
    fn validate_image(&self, path: &Path, reporter: &Reporter) -> ValidationOutcome;

    /// Extract the image name and Android version from a disk image.
    fn extract_info(&self, path: &Path) -> ImageInfoOutcome;

    /// Extract image info and then validate the image.
    fn extract_and_validate(&self, path: &Path, reporter: &Reporter) -> ImageProcessOutcome;
}

/// Progress sink handed to a [`Worker`] for the duration of one call.
///
/// Sending blocks while the coordinator's event queue is full.
#[derive(Debug)]
pub struct Reporter {
    task: TaskId,
    tx: mpsc::Sender<TaskEvent>,
}

impl Reporter {
    pub fn new(task: TaskId, tx: mpsc::Sender<TaskEvent>) -> Self {
        Self { task, tx }
    }

    /// The task this reporter belongs to.
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Report copy progress. Returns false once the coordinator is gone.
    pub fn copy_progress(&self, copied: u64, total: u64) -> bool {
        self.send(TaskEventKind::CopyProgress { copied, total })
    }

    /// Report a labelled validation step. Returns false once the
    /// coordinator is gone.
    pub fn validation_progress(&self, label: impl Into<String>, percent: u8) -> bool {
        self.send(TaskEventKind::ValidationProgress {
            label: label.into(),
            percent: percent.min(100),
        })
    }

    fn send(&self, kind: TaskEventKind) -> bool {
        self.tx
            .blocking_send(TaskEvent::new(self.task, kind))
            .is_ok()
    }
}
