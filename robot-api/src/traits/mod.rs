pub mod event_sink;
pub mod mdata_transport;
pub mod order_engine;

pub use event_sink::EventSink;
pub use mdata_transport::MarketDataTransport;
pub use order_engine::OrderEngine;
