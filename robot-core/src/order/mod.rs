//! Order life cycle.
//!
//! The `OrderPool` owns every order of a node together with its engine
//! handle. Requests (`send`, `cancel`, `replace`, `destroy`) are forwarded to
//! the `OrderEngine` and only move the order into an `awaiting_*` state; the
//! engine's confirmations come back through the node event queue and are
//! applied with `OrderPool::apply`.

#[allow(clippy::module_inception)]
mod order;
mod pool;

pub use order::{NewOrder, Order};
pub use pool::{OrderNotice, OrderPool};

#[cfg(test)]
mod tests;
