//! A trading robot: a process application that owns an instrument db, a
//! market-data engine and an order pool, and hands their confirmations to a
//! user handler.
//!
//! Engine output reaches the robot as node events. Each event is first applied
//! to the owning component, which returns an owned notice; the handler then
//! runs with a `RobotContext` over all components. Notices the handler itself
//! causes (forced destroys) are flushed before the dispatch returns.

mod context;
mod handler;

pub use context::RobotContext;
pub use handler::{MarketDataEvents, OrderEvents, RobotEvents, RobotHandler};

use crate::fs::load_instrument_db;
use crate::mdata::MarketDataEngine;
use crate::node::Node;
use crate::order::OrderPool;
use crate::process::{Application, HookResult};
use handler::{deliver_mdata, deliver_order};
use log::{debug, error, trace};
use robot::{
    FieldValue, InstrumentDB, MarketDataTransport, MdataEvent, NodeId, NodeStatus, Object,
    OrderEngine, OrderEvent, ResetHint, TimerId,
};

/// Config element of the market-data engine.
pub const MDATA_CONFIG: &str = "mdata_engine";

pub struct Robot<H: RobotHandler> {
    instruments: InstrumentDB,
    mdata: MarketDataEngine,
    orders: OrderPool,
    handler: H,
}

impl<H: RobotHandler> Robot<H> {
    pub fn new(instruments: InstrumentDB, mdata: MarketDataEngine, orders: OrderPool, handler: H) -> Self {
        Self {
            instruments,
            mdata,
            orders,
            handler,
        }
    }

    /// Builds a robot for `node`.
    ///
    /// Loads the instrument db of the node's system and configures the
    /// market-data engine from the `mdata_engine` element of the node config.
    pub fn for_node(
        node: &Node,
        order_engine: Box<dyn OrderEngine>,
        transport: Box<dyn MarketDataTransport>,
        handler: H,
    ) -> anyhow::Result<Self> {
        let instruments = load_instrument_db(node.system().get_paths())?;
        let mdata_config = node.config().get_child(MDATA_CONFIG);
        let mdata = MarketDataEngine::new(mdata_config.as_ref(), transport)?;
        debug!(
            "robot '{}' built with {} instruments",
            node.name(),
            instruments.len()
        );
        Ok(Self::new(instruments, mdata, OrderPool::new(order_engine), handler))
    }

    pub fn instruments(&self) -> &InstrumentDB {
        &self.instruments
    }

    pub fn mdata(&self) -> &MarketDataEngine {
        &self.mdata
    }

    pub fn orders(&self) -> &OrderPool {
        &self.orders
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Runs `hook` with a context over the robot, then delivers every order
    /// notice queued meanwhile. The first failure is returned; later ones are
    /// logged.
    fn with_context<F>(&mut self, node: &mut Node, hook: F) -> HookResult
    where
        F: FnOnce(&mut H, &mut RobotContext<'_>) -> HookResult,
    {
        let Robot {
            instruments,
            mdata,
            orders,
            handler,
        } = self;
        let mut ctx = RobotContext {
            node,
            instruments,
            mdata,
            orders,
        };
        let mut outcome = hook(handler, &mut ctx);
        loop {
            let notices = ctx.orders.take_notices();
            if notices.is_empty() {
                break;
            }
            for notice in notices {
                trace!("queued notice {:?} for '{}'", notice.kind, notice.name());
                let delivered = deliver_order(&mut *handler, &mut ctx, &notice);
                if let Err(e) = delivered {
                    if outcome.is_ok() {
                        outcome = Err(e);
                    } else {
                        error!("order '{}' handler failed: {:#}", notice.name(), e);
                        ctx.node.note_error();
                    }
                }
            }
        }
        outcome
    }
}

impl<H: RobotHandler> Application for Robot<H> {
    /// Starts market data and leaves the node inactive until activated.
    fn prepare(&mut self, node: &mut Node) -> HookResult {
        self.mdata.start()?;
        node.set_status(NodeStatus::Inactive)?;
        self.with_context(node, |h, ctx| h.on_prepare(ctx))
    }

    fn finish(&mut self, node: &mut Node) {
        if let Err(e) = self.with_context(node, |h, ctx| h.on_finish(ctx)) {
            error!("robot '{}' finish failed: {:#}", node.name(), e);
            node.note_error();
        }
        self.mdata.stop();
    }

    fn start(&mut self, node: &mut Node) -> HookResult {
        self.with_context(node, |h, ctx| h.on_start(ctx))
    }

    fn stop(&mut self, node: &mut Node) -> HookResult {
        self.with_context(node, |h, ctx| h.on_stop(ctx))
    }

    fn shutdown(&mut self, node: &mut Node) -> HookResult {
        self.with_context(node, |h, ctx| h.on_shutdown(ctx))
    }

    fn activate(&mut self, node: &mut Node) -> HookResult {
        self.with_context(node, |h, ctx| h.on_activate(ctx))
    }

    fn deactivate(&mut self, node: &mut Node) -> HookResult {
        self.with_context(node, |h, ctx| h.on_deactivate(ctx))
    }

    fn reset(&mut self, node: &mut Node, hint: ResetHint) -> HookResult {
        self.with_context(node, |h, ctx| h.on_reset(ctx, hint))
    }

    fn reconfig(&mut self, node: &mut Node) -> HookResult {
        self.with_context(node, |h, ctx| h.on_reconfig(ctx))
    }

    /// Peer objects belong to the order engine.
    fn on_object(&mut self, _node: &mut Node, object: &Object, from: NodeId) -> HookResult {
        self.orders.process_node_object(object, from);
        Ok(())
    }

    fn on_field(&mut self, node: &mut Node, name: &str, value: &FieldValue) -> HookResult {
        self.with_context(node, |h, ctx| h.on_field(ctx, name, value))
    }

    fn on_timer(&mut self, node: &mut Node, id: TimerId) -> HookResult {
        self.with_context(node, |h, ctx| h.on_timer(ctx, id))
    }

    fn on_order_event(&mut self, node: &mut Node, event: OrderEvent) -> HookResult {
        match self.orders.apply(event) {
            Some(notice) => self.with_context(node, |h, ctx| deliver_order(h, ctx, &notice)),
            None => Ok(()),
        }
    }

    fn on_mdata_event(&mut self, node: &mut Node, event: MdataEvent) -> HookResult {
        match self.mdata.apply(&self.instruments, event) {
            Some(notice) => self.with_context(node, |h, ctx| deliver_mdata(h, ctx, &notice)),
            None => Ok(()),
        }
    }

    fn on_idle(&mut self, node: &mut Node) -> HookResult {
        self.with_context(node, |h, ctx| h.on_idle(ctx))
    }
}
