//! The process layer: drives a node's event loop and maps control objects and
//! signals onto application hooks.
//!
//! A `Process` pumps `Node::receive` and dispatches every event of a batch to
//! an `Application`. Hook failures and panics are logged and counted in the
//! node statistic per event; they never stop the loop nor drop the rest of
//! the batch. Only a shutdown signal or a `StopHandle` ends the loop.

pub mod control;

pub use control::{ControlCommand, SignalAction};

use crate::node::{Event, Node};
use anyhow::Context;
use log::{debug, error, info};
use robot::{FieldValue, MdataEvent, NodeId, Object, OrderEvent, Payload, ResetHint, Result, TimerId};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of an application hook.
pub type HookResult = anyhow::Result<()>;

/// Hooks a process dispatches to. Every hook defaults to a no-op.
pub trait Application {
    /// Called once by `Process::run` before the loop starts. A failure aborts `run`.
    fn prepare(&mut self, _node: &mut Node) -> HookResult {
        Ok(())
    }

    /// Called once by `Process::run` after the loop ends.
    fn finish(&mut self, _node: &mut Node) {}

    fn start(&mut self, _node: &mut Node) -> HookResult {
        Ok(())
    }

    fn stop(&mut self, _node: &mut Node) -> HookResult {
        Ok(())
    }

    /// A shutdown signal was caught; the loop ends after the current batch.
    fn shutdown(&mut self, _node: &mut Node) -> HookResult {
        Ok(())
    }

    fn activate(&mut self, _node: &mut Node) -> HookResult {
        Ok(())
    }

    fn deactivate(&mut self, _node: &mut Node) -> HookResult {
        Ok(())
    }

    fn reset(&mut self, _node: &mut Node, _hint: ResetHint) -> HookResult {
        Ok(())
    }

    /// The node config was reloaded.
    fn reconfig(&mut self, _node: &mut Node) -> HookResult {
        Ok(())
    }

    /// A data object from a peer node (or from this node).
    fn on_object(&mut self, _node: &mut Node, _object: &Object, _from: NodeId) -> HookResult {
        Ok(())
    }

    fn on_field(&mut self, _node: &mut Node, _name: &str, _value: &FieldValue) -> HookResult {
        Ok(())
    }

    fn on_timer(&mut self, _node: &mut Node, _id: TimerId) -> HookResult {
        Ok(())
    }

    fn on_order_event(&mut self, _node: &mut Node, _event: OrderEvent) -> HookResult {
        Ok(())
    }

    fn on_mdata_event(&mut self, _node: &mut Node, _event: MdataEvent) -> HookResult {
        Ok(())
    }

    /// `receive` timed out without events.
    fn on_idle(&mut self, _node: &mut Node) -> HookResult {
        Ok(())
    }
}

/// Clears the run flag of a process from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub struct Process<A: Application> {
    node: Node,
    app: A,
    running: Arc<AtomicBool>,
}

impl<A: Application> Process<A> {
    /// Wraps a node.
    ///
    /// Catches SIGTERM, SIGINT and SIGHUP, and queues a `start` control
    /// object to the node itself unless it runs out of system.
    pub fn new(mut node: Node, app: A) -> Result<Self> {
        for signum in SignalAction::CAUGHT {
            node.catch_signal(signum)?;
        }
        if !node.is_out_of_system() {
            node.send_object(ControlCommand::Start.to_object(), node.id())?;
        }
        Ok(Self {
            node,
            app,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Receives one batch and dispatches it.
    ///
    /// # Returns
    ///
    /// The number of dispatched events; `0` on a timeout tick.
    pub fn receive(&mut self) -> Result<usize> {
        let batch = self.node.receive()?;
        if batch.is_empty() {
            self.guarded("idle", |process| process.app.on_idle(&mut process.node));
            return Ok(0);
        }
        let count = batch.len();
        for event in batch {
            self.dispatch(event);
        }
        Ok(count)
    }

    /// Calls the application's `prepare` hook.
    pub fn prepare(&mut self) -> anyhow::Result<()> {
        self.app
            .prepare(&mut self.node)
            .with_context(|| format!("node '{}' failed to prepare", self.node.name()))
    }

    /// Calls the application's `finish` hook.
    pub fn finish(&mut self) {
        self.app.finish(&mut self.node);
        info!("node '{}' finished", self.node.name());
    }

    /// Runs the loop until a shutdown signal or a `StopHandle` clears the run flag.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.prepare()?;
        info!("node '{}' running", self.node.name());

        while self.is_running() {
            match panic::catch_unwind(AssertUnwindSafe(|| self.receive())) {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    error!("node '{}' receive failed: {}", self.node.name(), e);
                    self.node.note_error();
                }
                Err(payload) => {
                    error!(
                        "node '{}' receive panicked: {}",
                        self.node.name(),
                        panic_message(payload.as_ref())
                    );
                    self.node.note_error();
                }
            }
        }

        self.finish();
        Ok(())
    }

    /// Dispatches one event. A panicking handler costs only its own event.
    fn dispatch(&mut self, event: Event) {
        self.guarded(event.kind_name(), |process| process.handle(event));
    }

    fn guarded(&mut self, what: &str, hook: impl FnOnce(&mut Self) -> HookResult) {
        match panic::catch_unwind(AssertUnwindSafe(|| hook(self))) {
            Ok(outcome) => self.report(outcome, what),
            Err(payload) => {
                error!(
                    "node '{}' {} handler panicked: {}",
                    self.node.name(),
                    what,
                    panic_message(payload.as_ref())
                );
                self.node.note_error();
            }
        }
    }

    fn handle(&mut self, event: Event) -> HookResult {
        match event {
            Event::Object { object, from } => self.on_object(object, from),
            Event::Signal(signum) => self.on_signal(signum),
            Event::Timer(id) => self.app.on_timer(&mut self.node, id),
            Event::Order(event) => self.app.on_order_event(&mut self.node, event),
            Event::Mdata(event) => self.app.on_mdata_event(&mut self.node, event),
        }
    }

    fn report(&self, outcome: HookResult, what: &str) {
        if let Err(e) = outcome {
            error!("node '{}' {} handler failed: {:#}", self.node.name(), what, e);
            self.node.note_error();
        }
    }

    fn on_object(&mut self, object: Object, from: NodeId) -> HookResult {
        if let Some(command) = ControlCommand::from_object(&object) {
            return self.on_control(command);
        }
        match object.get_payload() {
            Payload::Field { name, value } => self.app.on_field(&mut self.node, name, value),
            _ => self.app.on_object(&mut self.node, &object, from),
        }
    }

    fn on_control(&mut self, command: ControlCommand) -> HookResult {
        debug!("node '{}' control {:?}", self.node.name(), command);
        let status = self.node.status()?;
        if !command.applies_to(status) {
            debug!("node '{}' is {}, {:?} skipped", self.node.name(), status, command);
            return Ok(());
        }
        match command {
            ControlCommand::Start => self.app.start(&mut self.node)?,
            ControlCommand::Stop => self.app.stop(&mut self.node)?,
            ControlCommand::Activate => self.app.activate(&mut self.node)?,
            ControlCommand::Deactivate => self.app.deactivate(&mut self.node)?,
            ControlCommand::Reset(hint) => {
                if hint.contains(ResetHint::STATISTIC) {
                    self.node.reset_statistic()?;
                }
                self.app.reset(&mut self.node, hint)?;
            }
            ControlCommand::Reconfig => {
                self.node.reconfigure()?;
                self.app.reconfig(&mut self.node)?;
            }
        }
        if let Some(status) = command.status_after() {
            self.node.set_status(status)?;
        }
        Ok(())
    }

    fn on_signal(&mut self, signum: i32) -> HookResult {
        match SignalAction::from_signal(signum) {
            Some(SignalAction::Shutdown) => {
                info!("node '{}' caught signal {}, shutting down", self.node.name(), signum);
                self.running.store(false, Ordering::SeqCst);
                self.app.shutdown(&mut self.node)
            }
            Some(SignalAction::Reconfigure) => {
                info!("node '{}' caught signal {}, reconfiguring", self.node.name(), signum);
                self.node.reconfigure()?;
                self.app.reconfig(&mut self.node)
            }
            None => {
                debug!("node '{}' ignores signal {}", self.node.name(), signum);
                Ok(())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
