//! Crossbeam-backed event pipe between the engine and a front end.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Producer side handed to scanners and review sessions.
///
/// Clones share one queue; scan workers each hold one.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Deliver an event, dropping it when nobody is listening
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Consumer side held by the front end
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Blocking iterator; ends once every sender is gone
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }

    /// Events already queued, without waiting for more
    pub fn drain(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.try_iter()
    }
}

pub struct EventChannel;

impl EventChannel {
    /// Unbounded pipe; events are small and senders never block
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender for callers that do not want events
pub fn null_sender() -> EventSender {
    EventChannel::new().0
}
