//! Identifiers shared across the runtime.

/// Registry slot id of a node. `0` marks an unused slot.
pub type NodeId = i16;

/// Id of an object inside the node object store.
pub type ObjectId = u64;

/// Numeric instrument id assigned by the instrument database.
pub type InstrumentId = u64;

/// Handle of a market-data subscription.
pub type SubscriptionId = u32;

/// Handle of a node timer.
pub type TimerId = u32;

/// Id of the init node, the first slot of the registry.
pub const INIT_NODE_ID: NodeId = 1;
