//! Routing of objects between the nodes of one system.

use crate::node::event::EventSender;
use log::trace;
use parking_lot::Mutex;
use robot::{Errno, Error, NodeId, Object, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared routing table: node id to the event queue of that node.
///
/// Nodes attach on construction and detach on drop.
#[derive(Debug, Clone, Default)]
pub struct Link {
    routes: Arc<Mutex<HashMap<NodeId, EventSender>>>,
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self, id: NodeId, sender: EventSender) {
        self.routes.lock().insert(id, sender);
    }

    pub(crate) fn detach(&self, id: NodeId) {
        self.routes.lock().remove(&id);
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.routes.lock().contains_key(&id)
    }

    /// Delivers `object` to node `to`.
    ///
    /// # Returns
    ///
    /// * `Err(Error::Registry(Errno::UnableToRoute))` if `to` is not attached.
    /// * `Err(Error::Registry(Errno::NotConnected))` if its queue is closed.
    pub fn deliver(&self, object: Object, from: NodeId, to: NodeId) -> Result<()> {
        let sender = self
            .routes
            .lock()
            .get(&to)
            .cloned()
            .ok_or(Error::Registry(Errno::UnableToRoute))?;
        trace!("{} object {} -> node {}", object.get_type(), object.get_id(), to);
        sender.object(object, from)
    }
}
