//! Defines the `EventSink` trait engines use to reach the node event loop.

use crate::model::market_data::MdataEvent;
use crate::model::order::OrderEvent;

/// Destination of asynchronous engine output.
///
/// The node hands a sink to every engine at construction. Engines may post
/// from any thread; the events are dispatched later on the node loop thread.
pub trait EventSink: Send {
    /// Posts an order confirmation.
    fn post_order(&self, event: OrderEvent);

    /// Posts a market-data event.
    fn post_mdata(&self, event: MdataEvent);
}
