//! Shared model and collaborator traits of the robot runtime.
//!
//! Everything a node, an order engine or a market-data feed has to agree on
//! lives here: identities, instruments, order and market-data types, node
//! descriptors, cached node objects and the error taxonomy.

pub mod error;
pub mod model;
pub mod traits;

pub use error::{Errno, Error, Result};
pub use model::identity::{InstrumentId, NodeId, ObjectId, SubscriptionId, TimerId};
pub use model::instrument::Instrument;
pub use model::instrument_db::InstrumentDB;
pub use model::market_data::{
    BookLevel, BookSnapshot, CommonInfoFlags, CommonInfoSnapshot, FeedState, MdataEvent,
    MdataMessage, ProtoType, QuoteSnapshot, SubscriptionMask, TradeSnapshot, BOOK_DEPTH,
};
pub use model::node::{NodeDescriptor, NodeFlags, NodeStatistic, NodeStatus, NodeVersion};
pub use model::identity::INIT_NODE_ID;
pub use model::types::{Price, Qty, Timestamp};
pub use model::object::{FieldValue, Object, ObjectType, OrderRecord, Payload, ResetHint};
pub use model::order::{
    OrderEvent, OrderEventKind, OrderHandle, OrderOption, OrderState, OrderTicket, RejReason,
    ReplaceMask, ReplaceRequest, Side,
};
pub use traits::event_sink::EventSink;
pub use traits::mdata_transport::MarketDataTransport;
pub use traits::order_engine::OrderEngine;

pub mod prelude {
    pub use crate::error::{Errno, Error, Result};
    pub use crate::model::instrument::Instrument;
    pub use crate::model::instrument_db::InstrumentDB;
    pub use crate::model::market_data::{MdataEvent, SubscriptionMask};
    pub use crate::model::order::{OrderEvent, OrderState, Side};
    pub use crate::traits::{EventSink, MarketDataTransport, OrderEngine};
}
