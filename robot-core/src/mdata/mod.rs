//! Market-data subscriptions and dispatch.
//!
//! The transport posts raw `MdataEvent`s into the node queue. On the loop
//! thread, `MarketDataEngine::apply` resolves each one against the instrument
//! db, updates subscription status and the last-value caches, and turns it
//! into an `MdataNotice` for the handler.

mod engine;
mod notice;
mod subscription;

pub use engine::{EngineState, MarketDataEngine};
pub use notice::MdataNotice;
pub use subscription::{Subscription, SubscriptionStatus};
