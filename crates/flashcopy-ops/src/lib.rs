//! Asynchronous operation coordinator for flashcopy.
//!
//! This crate runs long filesystem actions (copy, delete, image
//! validation, image info extraction) on background tasks and folds their
//! progress back into one observable state, with channel-based reporting:
//!
//! - a [`Worker`] performs the blocking work and reports through a
//!   [`Reporter`];
//! - each request spawns its own task, which sends [`TaskEvent`]s to the
//!   [`TaskCoordinator`];
//! - the coordinator owns every piece of mutable state and raises
//!   [`Notification`]s to subscribers;
//! - a finished copy's staging directory is reclaimed by
//!   [`cleanup_temp_dir`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use flashcopy_core::CoordinatorConfig;
//! use flashcopy_ops::{FsWorker, Notification, TaskCoordinator};
//!
//! # async fn run() {
//! let mut coordinator = TaskCoordinator::new(Arc::new(FsWorker::new()), CoordinatorConfig::default());
//! let mut notifications = coordinator.subscribe();
//!
//! coordinator
//!     .start_copy("/images/a.img", "/media/usb/a.img", Some("/tmp/stage1".into()))
//!     .unwrap();
//! coordinator.run_until_idle().await;
//!
//! while let Ok(notification) = notifications.try_recv() {
//!     if notification == Notification::CopySucceeded {
//!         println!("done");
//!     }
//! }
//! # }
//! ```

mod cleanup;
mod coordinator;
mod fs_worker;
mod progress;
mod state;
mod storage;
mod worker;

pub use cleanup::{
    CleanupReport, CleanupStatus, DirRemover, StdRemover, cleanup_temp_dir, cleanup_temp_dir_with,
};
pub use coordinator::{
    LABEL_PROCESSING_STARTED, LABEL_VALIDATION_STARTED, STATUS_ALREADY_COPYING,
    STATUS_ALREADY_PROCESSING, STATUS_CREATE_DIR_FAILED, STATUS_EXTRACTING_INFO,
    STATUS_INFO_EXTRACTED, STATUS_INFO_FAILED, STATUS_INVALID_COPY, STATUS_PROCESSING_DONE,
    STATUS_PROCESSING_FAILED, STATUS_PROCESSING_IMAGE, STATUS_STARTING_COPY,
    STATUS_STARTING_DELETE, STATUS_STARTING_VALIDATION, TaskCoordinator,
};
pub use fs_worker::{COPY_CHUNK_SIZE, FsWorker};
pub use progress::{CompletionResult, TaskEvent, TaskEventKind, TaskId};
pub use state::{Notification, ProgressState};
pub use storage::{available_space, available_space_with, drive_root, file_size, volume_root};
pub use worker::{Reporter, Worker};

// Re-export core types for convenience
pub use flashcopy_core::{
    CoordinatorConfig, DispatchError, ExclusionPolicy, ImageInfoOutcome, ImageProcessOutcome,
    OperationKind, OperationRequest, Outcome, ProgressSnapshot, ValidationOutcome,
};

/// Buffer size of the channel carrying task events to the coordinator.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
