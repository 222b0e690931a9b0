//! The task coordinator: dispatch, arbitration and result handling.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flashcopy_core::{
    CoordinatorConfig, DispatchError, ImageInfoOutcome, ImageProcessOutcome, OperationKind,
    OperationRequest, Outcome, ProgressSnapshot, ValidationOutcome,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cleanup::cleanup_temp_dir;
use crate::progress::{CompletionResult, TaskEvent, TaskEventKind, TaskId};
use crate::state::{Notification, ProgressState};
use crate::worker::{Reporter, Worker};
use crate::OPERATION_CHANNEL_SIZE;

pub const STATUS_ALREADY_COPYING: &str = "Already copying...";
pub const STATUS_ALREADY_PROCESSING: &str = "Already processing...";
pub const STATUS_CREATE_DIR_FAILED: &str = "Failed to create destination directory.";
pub const STATUS_INVALID_COPY: &str = "Copy source and destination must not be empty.";
pub const STATUS_STARTING_COPY: &str = "Starting copy...";
pub const STATUS_STARTING_DELETE: &str = "Starting delete...";
pub const STATUS_STARTING_VALIDATION: &str = "Starting image validation...";
pub const STATUS_EXTRACTING_INFO: &str = "Extracting image info...";
pub const STATUS_PROCESSING_IMAGE: &str = "Processing image info and validation...";
pub const STATUS_INFO_EXTRACTED: &str = "Image info extracted successfully";
pub const STATUS_INFO_FAILED: &str = "Failed to extract image info";
pub const STATUS_PROCESSING_DONE: &str = "Image processing completed successfully";
pub const STATUS_PROCESSING_FAILED: &str = "Failed to process image";

/// Label of the progress step raised when a validation is dispatched.
pub const LABEL_VALIDATION_STARTED: &str = "starting validation";
/// Label of the progress step raised when a combined step is dispatched.
pub const LABEL_PROCESSING_STARTED: &str = "starting processing";

/// A dispatched task the coordinator still owns.
#[derive(Debug)]
struct InFlight {
    kind: OperationKind,
    handle: JoinHandle<()>,
}

/// Dispatches operations onto background tasks and folds their events
/// into one observable state.
///
/// The coordinator belongs to a single control context. `start_*` methods
/// return as soon as the task is spawned and must be called inside a
/// tokio runtime. Events are applied only when the owner drives
/// [`process_next`](Self::process_next) or one of its variants, so all
/// state is mutated from that one place.
pub struct TaskCoordinator<W: Worker> {
    worker: Arc<W>,
    config: CoordinatorConfig,
    state: ProgressState,
    events_tx: mpsc::Sender<TaskEvent>,
    events_rx: mpsc::Receiver<TaskEvent>,
    tasks: HashMap<TaskId, InFlight>,
    /// Staging directory of the in-flight copy.
    temp_dir: Option<PathBuf>,
    /// Paths of in-flight deletes, reported on success.
    deleting: HashMap<TaskId, PathBuf>,
    /// Task whose dispatch set the busy flag.
    slot_holder: Option<TaskId>,
    next_id: u64,
}

impl<W: Worker> TaskCoordinator<W> {
    pub fn new(worker: Arc<W>, config: CoordinatorConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);
        Self {
            worker,
            state: ProgressState::new(config.notification_capacity),
            config,
            events_tx,
            events_rx,
            tasks: HashMap::new(),
            temp_dir: None,
            deleting: HashMap::new(),
            slot_holder: None,
            next_id: 1,
        }
    }

    /// Subscribe to state changes and terminal notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        self.state.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.state.snapshot().busy
    }

    pub fn status(&self) -> &str {
        &self.state.snapshot().status
    }

    pub fn copied_bytes(&self) -> u64 {
        self.state.snapshot().copied_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.state.snapshot().total_bytes
    }

    /// Copy progress in `0..=100`; 0 while the total is unknown.
    pub fn progress_percent(&self) -> u8 {
        self.state.percent()
    }

    /// Number of dispatched tasks whose terminal event is not yet handled.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Staging directory recorded for the in-flight copy, if any.
    pub fn pending_temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Dispatch any request.
    pub fn start(&mut self, request: OperationRequest) -> Result<TaskId, DispatchError> {
        match request {
            OperationRequest::Copy {
                source,
                destination,
                temp_dir,
            } => self.start_copy(source, destination, temp_dir),
            OperationRequest::Delete { path } => self.start_delete(path),
            OperationRequest::ValidateImage { path } => self.start_image_validation(path),
            OperationRequest::ExtractInfo { path } => self.start_image_info_extraction(path),
            OperationRequest::ExtractAndValidate { path } => {
                self.start_image_info_and_validation(path)
            }
        }
    }

    /// Copy `source` to `destination`, reclaiming `temp_dir` afterwards.
    ///
    /// The destination's parent directory is created before anything is
    /// dispatched; if that fails a `CopyFailed` is raised and nothing runs.
    pub fn start_copy(
        &mut self,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        temp_dir: Option<PathBuf>,
    ) -> Result<TaskId, DispatchError> {
        let source = source.into();
        let destination = destination.into();

        self.check_slot(OperationKind::Copy)?;

        if source.as_os_str().is_empty() || destination.as_os_str().is_empty() {
            debug!("rejecting copy with an empty path");
            self.state.set_status(STATUS_INVALID_COPY);
            return Err(DispatchError::invalid(
                "copy source and destination must not be empty",
            ));
        }

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!(path = %parent.display(), error = %e, "failed to create destination directory");
                    self.state.set_status(STATUS_CREATE_DIR_FAILED);
                    self.state
                        .emit(Notification::CopyFailed(STATUS_CREATE_DIR_FAILED.to_string()));
                    return Err(DispatchError::CreateDestination {
                        path: parent.to_path_buf(),
                        source: e,
                    });
                }
            }
        }

        self.temp_dir = temp_dir.filter(|dir| !dir.as_os_str().is_empty());
        let id = self.claim(OperationKind::Copy);
        self.state.set_status(STATUS_STARTING_COPY);
        self.state.reset_progress();

        debug!(source = %source.display(), destination = %destination.display(), "dispatching copy");
        let worker = Arc::clone(&self.worker);
        self.spawn(id, OperationKind::Copy, move |reporter| {
            CompletionResult::Copy(worker.copy(&source, &destination, reporter))
        });
        Ok(id)
    }

    /// Delete a file or directory tree.
    pub fn start_delete(&mut self, path: impl Into<PathBuf>) -> Result<TaskId, DispatchError> {
        let path = path.into();
        self.check_slot(OperationKind::Delete)?;
        let id = self.claim(OperationKind::Delete);
        self.state.set_status(STATUS_STARTING_DELETE);

        debug!(path = %path.display(), "dispatching delete");
        let worker = Arc::clone(&self.worker);
        let target = path.clone();
        self.spawn(id, OperationKind::Delete, move |_| {
            CompletionResult::Delete(worker.delete(&target))
        });
        self.deleting.insert(id, path);
        Ok(id)
    }

    /// Validate a disk image.
    pub fn start_image_validation(
        &mut self,
        path: impl Into<PathBuf>,
    ) -> Result<TaskId, DispatchError> {
        let path = path.into();
        self.check_slot(OperationKind::ValidateImage)?;
        let id = self.claim(OperationKind::ValidateImage);
        self.state.set_status(STATUS_STARTING_VALIDATION);
        self.state.emit(Notification::ValidationProgress {
            label: LABEL_VALIDATION_STARTED.to_string(),
            percent: 0,
        });

        debug!(path = %path.display(), "dispatching image validation");
        let worker = Arc::clone(&self.worker);
        self.spawn(id, OperationKind::ValidateImage, move |reporter| {
            CompletionResult::Validation(worker.validate_image(&path, reporter))
        });
        Ok(id)
    }

    /// Extract the image name and Android version.
    pub fn start_image_info_extraction(
        &mut self,
        path: impl Into<PathBuf>,
    ) -> Result<TaskId, DispatchError> {
        let path = path.into();
        self.check_slot(OperationKind::ExtractInfo)?;
        let id = self.claim(OperationKind::ExtractInfo);
        self.state.set_status(STATUS_EXTRACTING_INFO);

        debug!(path = %path.display(), "dispatching image info extraction");
        let worker = Arc::clone(&self.worker);
        self.spawn(id, OperationKind::ExtractInfo, move |_| {
            CompletionResult::ImageInfo(worker.extract_info(&path))
        });
        Ok(id)
    }

    /// Extract image info and validate as one step.
    pub fn start_image_info_and_validation(
        &mut self,
        path: impl Into<PathBuf>,
    ) -> Result<TaskId, DispatchError> {
        let path = path.into();
        self.check_slot(OperationKind::ExtractAndValidate)?;
        let id = self.claim(OperationKind::ExtractAndValidate);
        self.state.set_status(STATUS_PROCESSING_IMAGE);
        self.state.emit(Notification::ValidationProgress {
            label: LABEL_PROCESSING_STARTED.to_string(),
            percent: 0,
        });

        debug!(path = %path.display(), "dispatching image info and validation");
        let worker = Arc::clone(&self.worker);
        self.spawn(id, OperationKind::ExtractAndValidate, move |reporter| {
            CompletionResult::ImageProcess(worker.extract_and_validate(&path, reporter))
        });
        Ok(id)
    }

    /// Wait for the next event from any in-flight task.
    ///
    /// Returns `None` once nothing is in flight.
    pub async fn next_event(&mut self) -> Option<TaskEvent> {
        if self.tasks.is_empty() {
            return None;
        }
        self.events_rx.recv().await
    }

    /// Apply one task event to the coordinator's state.
    pub async fn handle_event(&mut self, event: TaskEvent) {
        match event.kind {
            TaskEventKind::CopyProgress { copied, total } => {
                self.state.apply_copy_progress(copied, total);
            }
            TaskEventKind::ValidationProgress { label, percent } => {
                self.state
                    .emit(Notification::ValidationProgress { label, percent });
            }
            TaskEventKind::Finished(result) => self.finish(event.task, result).await,
        }
    }

    /// Wait for and apply the next event. Returns false once idle.
    pub async fn process_next(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }

    /// Apply the events already queued without waiting for more.
    pub async fn process_ready(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Drive events until every dispatched task has terminated.
    pub async fn run_until_idle(&mut self) {
        while self.process_next().await {}
    }

    /// Refuse `kind` while busy if the exclusion policy gates it.
    ///
    /// Only a copy refused by another copy reports "Already copying...".
    fn check_slot(&mut self, kind: OperationKind) -> Result<(), DispatchError> {
        if !(self.is_busy() && self.config.exclusion.is_gated(kind)) {
            return Ok(());
        }

        let holder = self
            .slot_holder
            .and_then(|id| self.tasks.get(&id))
            .map(|task| task.kind);
        let status = match (kind, holder) {
            (OperationKind::Copy, Some(OperationKind::Copy)) => STATUS_ALREADY_COPYING,
            _ => STATUS_ALREADY_PROCESSING,
        };

        debug!(%kind, ?holder, "rejecting request while busy");
        self.state.set_status(status);
        Err(DispatchError::Busy { kind })
    }

    /// Allocate a task id, taking the busy slot if the policy says so.
    fn claim(&mut self, kind: OperationKind) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;

        if self.config.exclusion.claims_slot(kind) {
            self.slot_holder = Some(id);
            self.state.set_busy(true);
        }
        id
    }

    /// Spawn one task that runs `job` on a blocking thread and sends its
    /// result as the task's last event.
    fn spawn<F>(&mut self, id: TaskId, kind: OperationKind, job: F)
    where
        F: FnOnce(&Reporter) -> CompletionResult + Send + 'static,
    {
        let tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            let reporter = Reporter::new(id, tx.clone());
            let result = match tokio::task::spawn_blocking(move || job(&reporter)).await {
                Ok(result) => result,
                Err(e) => CompletionResult::failed(kind, format!("worker task failed: {}", e)),
            };
            let _ = tx
                .send(TaskEvent::new(id, TaskEventKind::Finished(result)))
                .await;
        });

        self.tasks.insert(id, InFlight { kind, handle });
    }

    async fn finish(&mut self, id: TaskId, result: CompletionResult) {
        if self.slot_holder == Some(id) {
            self.slot_holder = None;
            self.state.set_busy(false);
        }

        match result {
            CompletionResult::Copy(outcome) => self.finish_copy(outcome).await,
            CompletionResult::Delete(outcome) => {
                let path = self.deleting.remove(&id).unwrap_or_default();
                self.finish_delete(path, outcome);
            }
            CompletionResult::Validation(outcome) => self.finish_validation(outcome),
            CompletionResult::ImageInfo(outcome) => self.finish_image_info(outcome),
            CompletionResult::ImageProcess(outcome) => self.finish_image_process(outcome),
        }

        if let Some(task) = self.tasks.remove(&id) {
            if let Err(e) = task.handle.await {
                warn!(task = %id, kind = %task.kind, error = %e, "task did not shut down cleanly");
            }
        }
    }

    async fn finish_copy(&mut self, outcome: Outcome) {
        self.state.set_status(outcome.message.clone());

        // The handle is released whatever cleanup achieves.
        if let Some(dir) = self.temp_dir.take() {
            if self.config.cleanup_temp_dirs {
                debug!(dir = %dir.display(), "cleaning up temporary directory after copy");
                match tokio::task::spawn_blocking(move || cleanup_temp_dir(&dir)).await {
                    Ok(report) => debug!(?report, "temporary directory cleanup finished"),
                    Err(e) => warn!(error = %e, "temporary directory cleanup task failed"),
                }
            }
        }

        if outcome.success {
            info!(message = %outcome.message, "copy succeeded");
            self.state.emit(Notification::CopySucceeded);
        } else {
            info!(message = %outcome.message, "copy failed");
            self.state.emit(Notification::CopyFailed(outcome.message));
        }
    }

    fn finish_delete(&mut self, path: PathBuf, outcome: Outcome) {
        self.state.set_status(outcome.message.clone());
        if outcome.success {
            info!(path = %path.display(), "delete succeeded");
            self.state.emit(Notification::DeleteSucceeded(path));
        } else {
            info!(message = %outcome.message, "delete failed");
            self.state.emit(Notification::DeleteFailed(outcome.message));
        }
    }

    fn finish_validation(&mut self, outcome: ValidationOutcome) {
        self.state.set_status(outcome.message.clone());
        if outcome.success {
            info!(image = %outcome.image_name, "image validation succeeded");
            self.state.emit(Notification::ValidationSucceeded {
                image_name: outcome.image_name,
                tar_path: outcome.tar_path,
            });
        } else {
            info!(message = %outcome.message, "image validation failed");
            self.state.emit(Notification::ValidationFailed(outcome.message));
        }
    }

    fn finish_image_info(&mut self, outcome: ImageInfoOutcome) {
        self.state.set_status(if outcome.success {
            STATUS_INFO_EXTRACTED
        } else {
            STATUS_INFO_FAILED
        });
        self.state.emit(Notification::ImageInfoExtracted(outcome));
    }

    fn finish_image_process(&mut self, outcome: ImageProcessOutcome) {
        self.state.set_status(if outcome.success {
            STATUS_PROCESSING_DONE
        } else {
            STATUS_PROCESSING_FAILED
        });
        self.state
            .emit(Notification::ImageInfoAndValidationCompleted(outcome));
    }
}
