//! Events sent from background tasks to the coordinator.

use std::fmt;

use flashcopy_core::{
    ImageInfoOutcome, ImageProcessOutcome, OperationKind, Outcome, ValidationOutcome,
};

/// Identifier of one dispatched operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Terminal result of a background task, keyed by operation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Copy(Outcome),
    Delete(Outcome),
    Validation(ValidationOutcome),
    ImageInfo(ImageInfoOutcome),
    ImageProcess(ImageProcessOutcome),
}

impl CompletionResult {
    /// Failure result of the given kind carrying `message`.
    pub fn failed(kind: OperationKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            OperationKind::Copy => Self::Copy(Outcome::failed(message)),
            OperationKind::Delete => Self::Delete(Outcome::failed(message)),
            OperationKind::ValidateImage => Self::Validation(ValidationOutcome::failed(message)),
            OperationKind::ExtractInfo => Self::ImageInfo(ImageInfoOutcome::failed(message)),
            OperationKind::ExtractAndValidate => {
                Self::ImageProcess(ImageProcessOutcome::failed(message))
            }
        }
    }

    /// The operation kind this result terminates.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Copy(_) => OperationKind::Copy,
            Self::Delete(_) => OperationKind::Delete,
            Self::Validation(_) => OperationKind::ValidateImage,
            Self::ImageInfo(_) => OperationKind::ExtractInfo,
            Self::ImageProcess(_) => OperationKind::ExtractAndValidate,
        }
    }

    /// Whether the worker reported success.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Copy(o) | Self::Delete(o) => o.success,
            Self::Validation(o) => o.success,
            Self::ImageInfo(o) => o.success,
            Self::ImageProcess(o) => o.success,
        }
    }
}

/// Payload of a [`TaskEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEventKind {
    /// Bytes copied so far out of a total (0 if not yet known).
    CopyProgress { copied: u64, total: u64 },
    /// Labelled percentage from a validation or combined step.
    ValidationProgress { label: String, percent: u8 },
    /// The terminal result. Always the last event of its task.
    Finished(CompletionResult),
}

/// An event produced by one background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    pub task: TaskId,
    pub kind: TaskEventKind,
}

impl TaskEvent {
    pub fn new(task: TaskId, kind: TaskEventKind) -> Self {
        Self { task, kind }
    }

    /// Whether this is the task's terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, TaskEventKind::Finished(_))
    }
}
