//! Recording doubles of the engine and transport traits, for tests.
//!
//! Both doubles are cheap clones sharing one call log, so a test can keep a
//! clone after boxing the other into a pool or an engine.

use parking_lot::Mutex;
use robot::{
    Errno, InstrumentId, MarketDataTransport, MdataMessage, NodeId, Object, OrderEngine,
    OrderHandle, OrderOption, OrderTicket, ReplaceRequest, SubscriptionMask,
};
use std::sync::Arc;

/// One call received by `SpyOrderEngine`. Handles are recorded by raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Create(OrderTicket),
    SetOption(u64, OrderOption),
    Send(u64),
    Cancel(u64),
    Replace(u64, ReplaceRequest),
    Destroy { handle: u64, force: bool },
    NodeObject { object: Object, from: NodeId },
}

#[derive(Debug, Default)]
struct EngineLog {
    calls: Vec<EngineCall>,
    fail_next: Option<Errno>,
    next_handle: u64,
}

/// Order engine that records every call and accepts everything, unless told
/// to fail the next call.
#[derive(Debug, Clone, Default)]
pub struct SpyOrderEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl SpyOrderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call (of any kind) fail with `errno`.
    pub fn fail_next(&self, errno: Errno) {
        self.log.lock().fail_next = Some(errno);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.log.lock().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.log.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn clear(&self) {
        self.log.lock().calls.clear();
    }

    fn record(&self, call: EngineCall) -> Result<(), Errno> {
        let mut log = self.log.lock();
        log.calls.push(call);
        match log.fail_next.take() {
            Some(errno) => Err(errno),
            None => Ok(()),
        }
    }
}

impl OrderEngine for SpyOrderEngine {
    fn create(&mut self, ticket: &OrderTicket) -> Result<OrderHandle, Errno> {
        self.record(EngineCall::Create(ticket.clone()))?;
        let mut log = self.log.lock();
        log.next_handle += 1;
        Ok(OrderHandle::new(log.next_handle))
    }

    fn set_option(&mut self, handle: &OrderHandle, option: OrderOption) -> Result<(), Errno> {
        self.record(EngineCall::SetOption(handle.raw(), option))
    }

    fn send(&mut self, handle: &OrderHandle) -> Result<(), Errno> {
        self.record(EngineCall::Send(handle.raw()))
    }

    fn cancel(&mut self, handle: &OrderHandle) -> Result<(), Errno> {
        self.record(EngineCall::Cancel(handle.raw()))
    }

    fn replace(&mut self, handle: &OrderHandle, request: &ReplaceRequest) -> Result<(), Errno> {
        self.record(EngineCall::Replace(handle.raw(), request.clone()))
    }

    fn destroy(&mut self, handle: OrderHandle, force: bool) -> Result<(), Errno> {
        self.record(EngineCall::Destroy {
            handle: handle.raw(),
            force,
        })
    }

    fn on_node_object(&mut self, object: &Object, from: NodeId) {
        // a failure cannot be reported from here
        let _ = self.record(EngineCall::NodeObject {
            object: object.clone(),
            from,
        });
    }
}

/// One call received by `ScriptedTransport`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Connect,
    Disconnect,
    Subscribe(Option<InstrumentId>, SubscriptionMask),
    Unsubscribe(Option<InstrumentId>, SubscriptionMask),
    Publish(MdataMessage),
}

/// Market-data transport with scripted connect and subscribe outcomes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    calls: Arc<Mutex<Vec<TransportCall>>>,
    connect_error: Option<Errno>,
    subscribe_error: Option<Errno>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_connect(errno: Errno) -> Self {
        Self {
            connect_error: Some(errno),
            ..Self::default()
        }
    }

    pub fn failing_subscribe(errno: Errno) -> Self {
        Self {
            subscribe_error: Some(errno),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().push(call);
    }
}

impl MarketDataTransport for ScriptedTransport {
    fn connect(&mut self) -> Result<(), Errno> {
        self.record(TransportCall::Connect);
        self.connect_error.map_or(Ok(()), Err)
    }

    fn disconnect(&mut self) {
        self.record(TransportCall::Disconnect);
    }

    fn subscribe(
        &mut self,
        instr_id: Option<InstrumentId>,
        mask: SubscriptionMask,
    ) -> Result<(), Errno> {
        self.record(TransportCall::Subscribe(instr_id, mask));
        self.subscribe_error.map_or(Ok(()), Err)
    }

    fn unsubscribe(
        &mut self,
        instr_id: Option<InstrumentId>,
        mask: SubscriptionMask,
    ) -> Result<(), Errno> {
        self.record(TransportCall::Unsubscribe(instr_id, mask));
        Ok(())
    }

    fn publish(&mut self, message: &MdataMessage) -> Result<(), Errno> {
        self.record(TransportCall::Publish(message.clone()));
        Ok(())
    }
}
