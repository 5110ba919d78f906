//! Defines the `OrderEngine` trait for exchange-facing order engines.
//!
//! The engine owns the wire protocol. The order pool drives it through this
//! trait and learns about outcomes only through `OrderEvent`s the engine posts
//! to its `EventSink`.

use crate::error::Errno;
use crate::model::object::Object;
use crate::model::identity::NodeId;
use crate::model::order::{OrderHandle, OrderOption, OrderTicket, ReplaceRequest};

/// Exchange-facing order engine.
///
/// Every request is fire-and-forget: `Ok(())` means the request was accepted
/// for submission, not that the exchange confirmed it.
pub trait OrderEngine {
    /// Creates the engine side of an order.
    ///
    /// # Arguments
    ///
    /// * `ticket` - Order fields. `ticket.name` is echoed back in confirmations.
    ///
    /// # Returns
    ///
    /// * `Ok(OrderHandle)` owned by the order until destroyed.
    /// * `Err(Errno)` if the fields are rejected.
    fn create(&mut self, ticket: &OrderTicket) -> Result<OrderHandle, Errno>;

    /// Configures a retry policy knob of the order.
    fn set_option(&mut self, handle: &OrderHandle, option: OrderOption) -> Result<(), Errno>;

    /// Submits a new order.
    fn send(&mut self, handle: &OrderHandle) -> Result<(), Errno>;

    /// Requests a cancel.
    fn cancel(&mut self, handle: &OrderHandle) -> Result<(), Errno>;

    /// Requests a replace of the fields set in `request`.
    fn replace(&mut self, handle: &OrderHandle, request: &ReplaceRequest) -> Result<(), Errno>;

    /// Releases the handle.
    ///
    /// With `force == false` the engine confirms with `Destroyed` once the order
    /// is safe to forget. With `force == true` the handle is dropped at once and
    /// no confirmation is expected.
    fn destroy(&mut self, handle: OrderHandle, force: bool) -> Result<(), Errno>;

    /// Reconciles state from an object sent by a peer node.
    fn on_node_object(&mut self, _object: &Object, _from: NodeId) {}
}

impl OrderEngine for Box<dyn OrderEngine> {
    fn create(&mut self, ticket: &OrderTicket) -> Result<OrderHandle, Errno> {
        (**self).create(ticket)
    }

    fn set_option(&mut self, handle: &OrderHandle, option: OrderOption) -> Result<(), Errno> {
        (**self).set_option(handle, option)
    }

    fn send(&mut self, handle: &OrderHandle) -> Result<(), Errno> {
        (**self).send(handle)
    }

    fn cancel(&mut self, handle: &OrderHandle) -> Result<(), Errno> {
        (**self).cancel(handle)
    }

    fn replace(&mut self, handle: &OrderHandle, request: &ReplaceRequest) -> Result<(), Errno> {
        (**self).replace(handle, request)
    }

    fn destroy(&mut self, handle: OrderHandle, force: bool) -> Result<(), Errno> {
        (**self).destroy(handle, force)
    }

    fn on_node_object(&mut self, object: &Object, from: NodeId) {
        (**self).on_node_object(object, from)
    }
}
