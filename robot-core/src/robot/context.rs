use crate::mdata::MarketDataEngine;
use crate::node::Node;
use crate::order::{NewOrder, Order, OrderPool};
use robot::{Instrument, InstrumentDB, ReplaceRequest, Result, SubscriptionId, SubscriptionMask};

/// What a handler can reach while it handles one event.
///
/// Built per dispatch from disjoint borrows of the robot's parts and the node.
pub struct RobotContext<'a> {
    pub node: &'a mut Node,
    pub instruments: &'a mut InstrumentDB,
    pub mdata: &'a mut MarketDataEngine,
    pub orders: &'a mut OrderPool,
}

impl RobotContext<'_> {
    pub fn add_instrument(
        &mut self,
        alias: &str,
        name: &str,
        long_name: &str,
        class: &str,
    ) -> Result<&Instrument> {
        self.instruments.add(alias, name, long_name, class)
    }

    pub fn create_order(&mut self, request: NewOrder) -> Result<&Order> {
        self.orders.create_order(self.instruments, request)
    }

    pub fn send_order(&mut self, name: &str) -> Result<()> {
        self.orders.send(name)
    }

    pub fn cancel_order(&mut self, name: &str) -> Result<()> {
        self.orders.cancel(name)
    }

    pub fn replace_order(&mut self, name: &str, request: ReplaceRequest) -> Result<()> {
        self.orders.replace(name, request)
    }

    pub fn destroy_order(&mut self, name: &str, force: bool) -> Result<()> {
        self.orders.destroy(name, force)
    }

    pub fn subscribe(&mut self, alias: Option<&str>, mask: SubscriptionMask) -> Result<SubscriptionId> {
        self.mdata.subscribe(self.instruments, alias, mask)
    }
}
