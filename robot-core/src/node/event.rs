//! Events multiplexed onto the node loop.

use log::debug;
use robot::{Errno, Error, EventSink, MdataEvent, NodeId, Object, OrderEvent, Result, TimerId};
use std::sync::mpsc;

/// One inbound event. `Node::receive` returns them in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Object sent by a peer node (or by this node to itself).
    Object { object: Object, from: NodeId },
    /// Caught POSIX signal number.
    Signal(i32),
    /// Expired node timer.
    Timer(TimerId),
    /// Order engine confirmation.
    Order(OrderEvent),
    /// Market-data transport event.
    Mdata(MdataEvent),
}

impl Event {
    /// Short label used in loop diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Event::Object { .. } => "object",
            Event::Signal(_) => "signal",
            Event::Timer(_) => "timer",
            Event::Order(_) => "order event",
            Event::Mdata(_) => "market data event",
        }
    }
}

/// Cloneable injection handle of a node event queue.
///
/// Handed to engines and transports as their `EventSink`, and to other nodes
/// through the link.
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: mpsc::Sender<Event>,
}

impl EventSender {
    pub(crate) fn new(inner: mpsc::Sender<Event>) -> Self {
        Self { inner }
    }

    /// Queues an event.
    ///
    /// # Returns
    ///
    /// * `Err(Error::Registry(Errno::NotConnected))` once the node is gone.
    pub fn send(&self, event: Event) -> Result<()> {
        self.inner
            .send(event)
            .map_err(|_| Error::Registry(Errno::NotConnected))
    }

    pub fn object(&self, object: Object, from: NodeId) -> Result<()> {
        self.send(Event::Object { object, from })
    }

    pub fn signal(&self, signal: i32) -> Result<()> {
        self.send(Event::Signal(signal))
    }
}

impl EventSink for EventSender {
    fn post_order(&self, event: OrderEvent) {
        if let Err(e) = self.send(Event::Order(event)) {
            debug!("order event dropped: {}", e);
        }
    }

    fn post_mdata(&self, event: MdataEvent) {
        if let Err(e) = self.send(Event::Mdata(event)) {
            debug!("market data event dropped: {}", e);
        }
    }
}
