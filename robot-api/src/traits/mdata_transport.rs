//! Defines the `MarketDataTransport` trait for feed connections.
//!
//! A transport connects to one or more feeds and posts every inbound message
//! as an `MdataEvent` to the `EventSink` it was built with.

use crate::error::Errno;
use crate::model::identity::InstrumentId;
use crate::model::market_data::{MdataMessage, SubscriptionMask};

/// A connection to market-data feeds.
///
/// # Examples
///
/// ```
/// use robot::{Errno, InstrumentId, MarketDataTransport, MdataMessage, SubscriptionMask};
///
/// struct Silent;
///
/// impl MarketDataTransport for Silent {
///     fn connect(&mut self) -> Result<(), Errno> {
///         Ok(())
///     }
///
///     fn disconnect(&mut self) {}
///
///     fn subscribe(
///         &mut self,
///         _instr_id: Option<InstrumentId>,
///         _mask: SubscriptionMask,
///     ) -> Result<(), Errno> {
///         Ok(())
///     }
///
///     fn publish(&mut self, _message: &MdataMessage) -> Result<(), Errno> {
///         Ok(())
///     }
/// }
/// ```
pub trait MarketDataTransport {
    /// Establishes the feed connections.
    fn connect(&mut self) -> Result<(), Errno>;

    /// Tears the connections down. Must tolerate repeated calls.
    fn disconnect(&mut self);

    /// Issues a subscribe request. `None` selects the market-wide channel.
    ///
    /// The outcome arrives later as `MdataEvent::SubscribeResult`.
    fn subscribe(
        &mut self,
        instr_id: Option<InstrumentId>,
        mask: SubscriptionMask,
    ) -> Result<(), Errno>;

    /// Cancels a subscription.
    fn unsubscribe(
        &mut self,
        _instr_id: Option<InstrumentId>,
        _mask: SubscriptionMask,
    ) -> Result<(), Errno> {
        Ok(())
    }

    /// Publishes an outbound message when this node is a data source.
    fn publish(&mut self, message: &MdataMessage) -> Result<(), Errno>;
}

impl MarketDataTransport for Box<dyn MarketDataTransport> {
    fn connect(&mut self) -> Result<(), Errno> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn subscribe(
        &mut self,
        instr_id: Option<InstrumentId>,
        mask: SubscriptionMask,
    ) -> Result<(), Errno> {
        (**self).subscribe(instr_id, mask)
    }

    fn unsubscribe(
        &mut self,
        instr_id: Option<InstrumentId>,
        mask: SubscriptionMask,
    ) -> Result<(), Errno> {
        (**self).unsubscribe(instr_id, mask)
    }

    fn publish(&mut self, message: &MdataMessage) -> Result<(), Errno> {
        (**self).publish(message)
    }
}
