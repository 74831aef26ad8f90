//! Progress events sent from the worker thread to the front-end.
//!
//! The worker never touches front-end state directly. It pushes [`RenameEvent`]s
//! into a FIFO channel which the front-end drains on its own thread, applying
//! each event fully before the next.

use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::types::{BatchSummary, SingleOutcome};

/// Front-end controls that are locked while a run is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    StartBatch,
    StartSingle,
    SelectDirectory,
    ModelSelector,
}

impl Control {
    pub const ALL: [Control; 4] = [
        Control::StartBatch,
        Control::StartSingle,
        Control::SelectDirectory,
        Control::ModelSelector,
    ];
}

/// Something the front-end should reflect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameEvent {
    /// Replace the status line
    Status(String),
    /// Replace the text of the name preview area
    Preview(String),
    /// Enable or disable the run controls
    ControlsEnabled { controls: Vec<Control>, enabled: bool },
    /// Populate the model selector
    ModelsLoaded {
        models: Vec<String>,
        selected: Option<String>,
    },
    /// Work on `index` has begun; select and preview it
    ItemStarted {
        index: usize,
        total: usize,
        filename: String,
    },
    /// A title was produced for `index`
    TitleGenerated { index: usize, title: String },
    /// The list entry at `index` now has a new filename
    ItemRenamed {
        index: usize,
        old_filename: String,
        new_filename: String,
    },
    /// Title generation or renaming failed for `index`
    ItemFailed {
        index: usize,
        filename: String,
        message: String,
    },
    /// A batch run finished
    RunCompleted(BatchSummary),
    /// A single-image run finished
    SingleCompleted(SingleOutcome),
}

/// Sending half held by the core
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<RenameEvent>,
}

/// Receiving half drained by the front-end thread
#[derive(Debug)]
pub struct EventQueue {
    rx: Receiver<RenameEvent>,
}

/// Create a connected sink and queue
pub fn channel() -> (EventSink, EventQueue) {
    let (tx, rx) = unbounded();
    (EventSink { tx }, EventQueue { rx })
}

impl EventSink {
    /// Post an event. A front-end that has gone away is not an error for the worker.
    pub fn emit(&self, event: RenameEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Event dropped: front-end queue closed");
        }
    }

    pub fn status(&self, text: impl Into<String>) {
        self.emit(RenameEvent::Status(text.into()));
    }

    pub fn preview(&self, text: impl Into<String>) {
        self.emit(RenameEvent::Preview(text.into()));
    }

    pub fn controls(&self, controls: &[Control], enabled: bool) {
        self.emit(RenameEvent::ControlsEnabled {
            controls: controls.to_vec(),
            enabled,
        });
    }
}

impl EventQueue {
    /// Take every event currently queued, in order
    pub fn drain(&self) -> Vec<RenameEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Block until the next event; `None` once every sink is gone
    pub fn recv(&self) -> Option<RenameEvent> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (sink, queue) = channel();
        sink.status("one");
        sink.preview("two");
        sink.emit(RenameEvent::TitleGenerated {
            index: 0,
            title: "three".into(),
        });

        let events = queue.drain();
        assert_eq!(
            events,
            vec![
                RenameEvent::Status("one".into()),
                RenameEvent::Preview("two".into()),
                RenameEvent::TitleGenerated {
                    index: 0,
                    title: "three".into()
                },
            ]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_emit_after_queue_dropped() {
        let (sink, queue) = channel();
        drop(queue);
        // Must not panic
        sink.status("nobody listening");
    }

    #[test]
    fn test_recv_ends_when_sinks_dropped() {
        let (sink, queue) = channel();
        sink.status("last");
        drop(sink);
        assert_eq!(queue.recv(), Some(RenameEvent::Status("last".into())));
        assert_eq!(queue.recv(), None);
    }
}
