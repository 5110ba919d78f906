//! Scalar units shared by orders and market data.

/// Price of an order, trade or book level.
pub type Price = f64;

/// Quantity in lots.
pub type Qty = i64;

/// Nanoseconds since the Unix epoch.
pub type Timestamp = u64;
