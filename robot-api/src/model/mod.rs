pub mod identity;
pub mod instrument;
pub mod instrument_db;
pub mod market_data;
pub mod node;
pub mod object;
pub mod order;
pub mod types;
