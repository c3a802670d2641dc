//! One-shot UI signals (messages, navigation).
//!
//! # Invariants
//! - Each event is delivered at most once, to the single receiver.
//! - Events are never replayed to a receiver taken later; the receiver can
//!   only be taken once.

use crate::model::task::TaskId;
use log::debug;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Navigation targets the presentation layer can request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    List,
    /// `task_id = None` opens an empty form for a new task.
    AddEdit { task_id: Option<TaskId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    ShowMessage(String),
    PopBack,
    Navigate(Route),
}

/// Outbound queue of one-shot UI events.
pub struct UiEventChannel {
    tx: UnboundedSender<UiEvent>,
    rx: Mutex<Option<UnboundedReceiver<UiEvent>>>,
}

impl UiEventChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    pub fn sender(&self) -> UiEventSender {
        UiEventSender(self.tx.clone())
    }

    /// Hands out the receiving end. Returns `None` after the first call.
    pub fn take_receiver(&self) -> Option<UnboundedReceiver<UiEvent>> {
        self.rx.lock().take()
    }
}

impl Default for UiEventChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable sending half used by background commands.
#[derive(Clone)]
pub struct UiEventSender(UnboundedSender<UiEvent>);

impl UiEventSender {
    pub fn send(&self, event: UiEvent) {
        if let Err(err) = self.0.send(event) {
            debug!(
                "event=ui_event_dropped module=presentation status=noop kind={}",
                event_kind(&err.0)
            );
        }
    }
}

fn event_kind(event: &UiEvent) -> &'static str {
    match event {
        UiEvent::ShowMessage(_) => "show_message",
        UiEvent::PopBack => "pop_back",
        UiEvent::Navigate(_) => "navigate",
    }
}
