//! # Robot Core Library
//!
//! Runtime for trading robots: the nodes of one system, their event loops and
//! the order and market-data machinery a robot is built from.
//!
//! ## Modules
//! - `args`: Standard command-line arguments of every node binary.
//! - `config`: Hierarchical node configuration.
//! - `fs`: System directory layout and state persistence.
//! - `registry`: Shared table of the nodes of a system.
//! - `node`: A node: registry slot, object cache, timers, signals and event queue.
//! - `process`: The event loop and the control protocol.
//! - `order`: Order state machine and order pool.
//! - `mdata`: Market-data subscriptions and dispatch.
//! - `robot`: Composition of the above behind user handler traits.
//! - `launcher`: Boot helpers for binaries.

pub mod args;
pub mod config;
pub mod fs;
pub mod launcher;
pub mod logging;
pub mod mdata;
pub mod node;
pub mod order;
pub mod process;
pub mod registry;
pub mod robot;
pub mod system;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use args::CommonArgs;
pub use config::Config;
pub use mdata::{MarketDataEngine, MdataNotice};
pub use node::{Event, EventSender, Node};
pub use order::{NewOrder, Order, OrderNotice, OrderPool};
pub use process::{Application, HookResult, Process, StopHandle};
pub use crate::robot::{MarketDataEvents, OrderEvents, Robot, RobotContext, RobotEvents, RobotHandler};
pub use system::System;
