//! Batch and single-image rename runs.
//!
//! A run owns the [`ProcessingGate`] permit for its whole lifetime and executes
//! on one background thread. Items are processed strictly in list order, one
//! request at a time. A failed item is counted and reported, never fatal to
//! the run.

use log::{error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use thiserror::Error;

use crate::catalog::{ModelCatalog, ModelChoice};
use crate::config::Config;
use crate::discovery::discover_images;
use crate::endpoint::ModelEndpoint;
use crate::error::Result;
use crate::events::{Control, EventSink, RenameEvent};
use crate::gate::{CancellationToken, ProcessingGate, ProcessingPermit};
use crate::logging::log_title_error;
use crate::rename::RenameEngine;
use crate::title::TitleGenerator;
use crate::types::{BatchSummary, ImageFile, SingleOutcome};

/// Conditions that stop a run from starting
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    #[error("No images loaded!")]
    NoImages,

    #[error("Please select an image first!")]
    NoSelection,

    #[error("Please select a model!")]
    NoModel,
}

/// What happened to a start request
#[derive(Debug)]
pub enum StartOutcome<T> {
    /// A worker thread was spawned
    Started(JoinHandle<T>),
    /// Another run holds the gate; nothing was done
    AlreadyRunning,
    /// A precondition failed; no thread, gate untouched
    Rejected(Precondition),
}

impl<T> StartOutcome<T> {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }

    /// Wait for the worker, if one was started
    pub fn join(self) -> Option<T> {
        match self {
            Self::Started(handle) => match handle.join() {
                Ok(value) => Some(value),
                Err(panic_err) => {
                    error!("Rename worker panicked: {}", panic_message(panic_err));
                    None
                }
            },
            _ => None,
        }
    }
}

/// Outcome of processing one item
enum ItemResult {
    Renamed { title: String, new_filename: String },
    Failed(String),
}

/// Shared state a worker thread needs
#[derive(Clone)]
struct Worker {
    endpoint: Arc<dyn ModelEndpoint>,
    config: Arc<Config>,
    files: Arc<Mutex<Vec<ImageFile>>>,
    events: EventSink,
    cancel: CancellationToken,
}

/// Coordinates title generation and renaming for the loaded image list
pub struct RenameOrchestrator {
    worker: Worker,
    gate: ProcessingGate,
}

impl RenameOrchestrator {
    pub fn new(endpoint: Arc<dyn ModelEndpoint>, config: Config, events: EventSink) -> Self {
        Self {
            worker: Worker {
                endpoint,
                config: Arc::new(config),
                files: Arc::new(Mutex::new(Vec::new())),
                events,
                cancel: CancellationToken::new(),
            },
            gate: ProcessingGate::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.worker.config
    }

    pub fn is_processing(&self) -> bool {
        self.gate.is_processing()
    }

    /// Snapshot of the current image list
    pub fn files(&self) -> Vec<ImageFile> {
        self.worker.lock_files().clone()
    }

    /// Replace the image list. Returns `false`, leaving the list untouched,
    /// while a run is active.
    pub fn set_files(&self, files: Vec<ImageFile>) -> bool {
        let Some(_permit) = self.gate.try_acquire() else {
            warn!("Image list change ignored while a run is active");
            return false;
        };
        *self.worker.lock_files() = files;
        true
    }

    /// List the images in `directory` and make them the current list.
    ///
    /// Ignored while a run is active.
    pub fn load_directory(&self, directory: &Path) -> Result<usize> {
        // Held until the new list is in place so no run can start in between
        let Some(_permit) = self.gate.try_acquire() else {
            warn!("Directory change ignored while a run is active");
            return Ok(self.worker.lock_files().len());
        };

        let files = match discover_images(directory, &self.worker.config) {
            Ok(files) => files,
            Err(e) => {
                self.worker
                    .events
                    .preview(format!("Error loading directory: {}", e));
                return Err(e);
            }
        };

        let count = files.len();
        if count == 0 {
            self.worker.events.preview("No images found in this directory");
        }
        *self.worker.lock_files() = files;
        Ok(count)
    }

    /// Load the vision model catalog and report the model choice
    pub fn load_models(&self) -> ModelChoice {
        let fragments = &self.worker.config.vision_model_fragments;
        let catalog = ModelCatalog::new(self.worker.endpoint.as_ref(), fragments);
        let choice = catalog.resolve_choice(&self.worker.config.default_model);

        let events = &self.worker.events;
        events.emit(RenameEvent::ModelsLoaded {
            models: choice.display_values(),
            selected: choice.selected().map(str::to_string),
        });
        if choice == ModelChoice::NoVisionModels {
            events.controls(&[Control::ModelSelector, Control::StartBatch], false);
        }
        events.status(choice.status_text());
        choice
    }

    /// Probe the endpoint with a text-only request
    pub fn test_connection(&self, model: &str) -> bool {
        TitleGenerator::new(
            self.worker.endpoint.as_ref(),
            model,
            self.worker.config.max_title_length,
        )
        .test_connection()
    }

    /// Ask the active run to stop before its next item
    pub fn cancel(&self) {
        if self.is_processing() {
            info!("Cancellation requested");
            self.worker.cancel.cancel();
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.worker.cancel.clone()
    }

    /// Rename every loaded image on a background thread
    pub fn start_batch(&self, model: Option<&str>) -> Result<StartOutcome<BatchSummary>> {
        if self.is_processing() {
            return Ok(StartOutcome::AlreadyRunning);
        }

        let total = self.worker.lock_files().len();
        if total == 0 {
            return Ok(self.reject(Precondition::NoImages));
        }
        let Some(model) = non_empty(model) else {
            return Ok(self.reject(Precondition::NoModel));
        };

        let Some(permit) = self.gate.try_acquire() else {
            return Ok(StartOutcome::AlreadyRunning);
        };

        info!("Starting batch rename of {} images with {}", total, model);
        self.worker.begin_run();

        let worker = self.worker.clone();
        let model = model.to_string();
        let handle = self.spawn_worker("rename-batch", move || {
            let summary = worker.run_batch(&model);
            worker.finish_run(permit);
            summary
        })?;

        Ok(StartOutcome::Started(handle))
    }

    /// Rename the image at `selection` on a background thread
    pub fn start_single(
        &self,
        selection: Option<usize>,
        model: Option<&str>,
    ) -> Result<StartOutcome<SingleOutcome>> {
        if self.is_processing() {
            return Ok(StartOutcome::AlreadyRunning);
        }

        let total = self.worker.lock_files().len();
        if total == 0 {
            return Ok(self.reject(Precondition::NoImages));
        }
        let Some(index) = selection.filter(|index| *index < total) else {
            return Ok(self.reject(Precondition::NoSelection));
        };
        let Some(model) = non_empty(model) else {
            return Ok(self.reject(Precondition::NoModel));
        };

        let Some(permit) = self.gate.try_acquire() else {
            return Ok(StartOutcome::AlreadyRunning);
        };

        info!("Starting single rename of item {} with {}", index, model);
        self.worker.begin_run();

        let worker = self.worker.clone();
        let model = model.to_string();
        let handle = self.spawn_worker("rename-single", move || {
            let outcome = worker.run_single(index, &model);
            worker.finish_run(permit);
            outcome
        })?;

        Ok(StartOutcome::Started(handle))
    }

    /// Start a batch and wait for it to finish. Used by front-ends without an event loop.
    pub fn run_batch_blocking(&self, model: Option<&str>) -> Option<BatchSummary> {
        match self.start_batch(model) {
            Ok(outcome) => outcome.join(),
            Err(e) => {
                self.worker.events.status(format!("Error: {}", e));
                None
            }
        }
    }

    fn spawn_worker<T, F>(&self, name: &str, task: F) -> Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        // A failed spawn drops the task, and with it the permit
        thread::Builder::new()
            .name(name.to_string())
            .spawn(task)
            .map_err(|e| {
                error!("Failed to spawn {} thread: {}", name, e);
                self.worker.events.controls(&Control::ALL, true);
                e.into()
            })
    }

    fn reject<T>(&self, precondition: Precondition) -> StartOutcome<T> {
        info!("Run not started: {}", precondition);
        self.worker.events.status(precondition.to_string());
        StartOutcome::Rejected(precondition)
    }
}

impl Worker {
    fn lock_files(&self) -> MutexGuard<'_, Vec<ImageFile>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_run(&self) {
        self.events.controls(&Control::ALL, false);
    }

    // A cancel requested before the run started stays pending until here.
    // Release the gate before re-enabling controls so a front-end reacting
    // to the event can start the next run immediately.
    fn finish_run(&self, permit: ProcessingPermit) {
        self.cancel.reset();
        drop(permit);
        self.events.controls(&Control::ALL, true);
    }

    fn run_batch(&self, model: &str) -> BatchSummary {
        let total = self.lock_files().len();
        let mut summary = BatchSummary::new(total);

        for index in 0..total {
            if self.cancel.is_cancelled() {
                summary.cancelled = total - index;
                warn!("Batch cancelled with {} images remaining", summary.cancelled);
                break;
            }

            self.events
                .status(format!("Processing {}/{}...", index + 1, total));

            match self.process_item(index, total, model) {
                ItemResult::Renamed { .. } => summary.renamed += 1,
                ItemResult::Failed(_) => summary.failed += 1,
            }
        }

        info!(
            "Batch complete: {} renamed, {} failed, {} cancelled",
            summary.renamed, summary.failed, summary.cancelled
        );

        let mut preview = format!("✅ Processing Complete!\nRenamed: {}", summary.renamed);
        if summary.failed > 0 {
            preview.push_str(&format!("\nFailed: {}", summary.failed));
        }
        self.events.status(summary.status_text());
        self.events.preview(preview);
        self.events.emit(RenameEvent::RunCompleted(summary));
        summary
    }

    fn run_single(&self, index: usize, model: &str) -> SingleOutcome {
        let total = self.lock_files().len();
        self.events.status("Processing selected image...");

        let old_filename = self.filename_at(index).unwrap_or_default();
        let outcome = match self.process_item(index, total, model) {
            ItemResult::Renamed {
                title,
                new_filename,
            } => SingleOutcome::Renamed {
                index,
                old_filename,
                new_filename,
                title,
            },
            ItemResult::Failed(message) => SingleOutcome::Failed {
                index,
                filename: old_filename,
                message,
            },
        };

        self.events.status(outcome.status_text());
        self.events.emit(RenameEvent::SingleCompleted(outcome.clone()));
        outcome
    }

    fn filename_at(&self, index: usize) -> Option<String> {
        self.lock_files().get(index).map(|f| f.filename.clone())
    }

    /// Generate and apply a title for one item; panics are contained here
    fn process_item(&self, index: usize, total: usize, model: &str) -> ItemResult {
        let Some(image) = self.lock_files().get(index).cloned() else {
            return self.item_failed(index, "", "Image is no longer in the list".to_string());
        };

        self.events.emit(RenameEvent::ItemStarted {
            index,
            total,
            filename: image.filename.clone(),
        });
        self.events.preview(format!(
            "Analyzing: {}\n⏳ Generating name...",
            image.filename
        ));

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            self.title_and_rename(index, &image, model)
        }));

        match attempt {
            Ok(Ok((title, new_filename))) => ItemResult::Renamed {
                title,
                new_filename,
            },
            Ok(Err(e)) => self.item_failed(index, &image.filename, e.to_string()),
            Err(panic_err) => {
                let message = panic_message(panic_err);
                error!("Unexpected failure processing {}: {}", image.filename, message);
                self.item_failed(index, &image.filename, message)
            }
        }
    }

    fn title_and_rename(
        &self,
        index: usize,
        image: &ImageFile,
        model: &str,
    ) -> Result<(String, String)> {
        let generator = TitleGenerator::new(
            self.endpoint.as_ref(),
            model,
            self.config.max_title_length,
        );

        let path = image.full_path();
        let title = generator.generate_title(&path).map_err(|e| {
            log_title_error(&path, model, &e);
            e
        })?;

        self.events.emit(RenameEvent::TitleGenerated {
            index,
            title: title.to_string(),
        });
        self.events.preview(format!("✓ Generated: {}", title));

        let engine = RenameEngine::new(
            Some(image.directory.clone()),
            self.config.max_collision_attempts,
        );
        let new_filename = engine.rename(&image.filename, title.as_str())?;

        match self.lock_files().get_mut(index) {
            Some(entry) if *entry == *image => entry.filename = new_filename.clone(),
            _ => warn!(
                "Image list changed during run; {} not updated to {}",
                image, new_filename
            ),
        }
        self.events.emit(RenameEvent::ItemRenamed {
            index,
            old_filename: image.filename.clone(),
            new_filename: new_filename.clone(),
        });

        Ok((title.into_inner(), new_filename))
    }

    fn item_failed(&self, index: usize, filename: &str, message: String) -> ItemResult {
        warn!("Error processing {}: {}", filename, message);
        self.events.preview(format!("❌ Error: {}", message));
        self.events.emit(RenameEvent::ItemFailed {
            index,
            filename: filename.to_string(),
            message: message.clone(),
        });
        ItemResult::Failed(message)
    }
}

fn non_empty(model: Option<&str>) -> Option<&str> {
    model.map(str::trim).filter(|m| !m.is_empty())
}

/// Extract panic info from panic value
fn panic_message(panic_err: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_err.downcast_ref::<&str>() {
        format!("Panic with message: {}", s)
    } else if let Some(s) = panic_err.downcast_ref::<String>() {
        format!("Panic with message: {}", s)
    } else {
        "Unknown panic occurred".to_string()
    }
}
