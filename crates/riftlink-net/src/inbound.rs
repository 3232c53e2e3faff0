//! Hand-off queue between the receive task and the consumer tick.
//!
//! The receive loop is the only producer; the router drains the queue once per
//! tick without blocking. Capacity is unbounded so a slow consumer never
//! stalls the socket reader.

use tokio::sync::mpsc;

use crate::messages::Envelope;

/// The consumer side was dropped; nothing will ever read further envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("inbound queue consumer has been dropped")]
pub struct InboundClosed;

/// Create a connected producer/consumer pair.
pub fn inbound_queue() -> (InboundSender, InboundQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboundSender { tx }, InboundQueue { rx })
}

/// Producer handle, cloned into each receive task.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl InboundSender {
    /// Enqueue a decoded envelope. Never blocks.
    pub fn push(&self, envelope: Envelope) -> Result<(), InboundClosed> {
        self.tx.send(envelope).map_err(|_| InboundClosed)
    }

    /// Whether the consumer side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle, owned by the router.
#[derive(Debug)]
pub struct InboundQueue {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl InboundQueue {
    /// Take every envelope queued so far, in arrival order.
    ///
    /// Returns an empty vector when nothing is pending.
    pub fn drain_all(&mut self) -> Vec<Envelope> {
        let mut drained = Vec::with_capacity(self.rx.len());
        while let Ok(envelope) = self.rx.try_recv() {
            drained.push(envelope);
        }
        drained
    }

    /// Number of envelopes currently waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
