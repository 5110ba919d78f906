//! Delivery of POSIX signals into the node event queue.
//!
//! Each caught signal gets a listener task on a small private tokio runtime.
//! The listener only forwards the signal number; handling happens on the node
//! loop thread like any other event.

use crate::node::event::EventSender;
use log::{debug, warn};
use robot::{Error, Result};
use std::collections::HashMap;
use tokio::runtime::Runtime;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

pub struct SignalChannel {
    sender: EventSender,
    runtime: Option<Runtime>,
    listeners: HashMap<i32, JoinHandle<()>>,
}

impl SignalChannel {
    pub fn new(sender: EventSender) -> Self {
        Self {
            sender,
            runtime: None,
            listeners: HashMap::new(),
        }
    }

    /// Starts forwarding `signum` to the node. Catching twice is a no-op.
    pub fn catch(&mut self, signum: i32) -> Result<()> {
        if self.listeners.contains_key(&signum) {
            return Ok(());
        }
        if self.runtime.is_none() {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("node-signal")
                .enable_all()
                .build()?;
            self.runtime = Some(runtime);
        }
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| Error::ResourceUnavailable("signal runtime".into()))?;

        let mut stream = {
            let _guard = runtime.enter();
            signal(SignalKind::from_raw(signum))?
        };
        let sender = self.sender.clone();
        let listener = runtime.spawn(async move {
            while stream.recv().await.is_some() {
                if sender.signal(signum).is_err() {
                    break;
                }
            }
        });
        self.listeners.insert(signum, listener);
        debug!("catching signal {}", signum);
        Ok(())
    }

    /// Stops forwarding `signum`. Returns false if it was not caught.
    pub fn free(&mut self, signum: i32) -> bool {
        match self.listeners.remove(&signum) {
            Some(listener) => {
                listener.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_caught(&self, signum: i32) -> bool {
        self.listeners.contains_key(&signum)
    }

    /// Stops every listener and shuts the runtime down.
    pub fn release(&mut self) {
        for (signum, listener) in self.listeners.drain() {
            debug!("releasing signal {}", signum);
            listener.abort();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for SignalChannel {
    fn drop(&mut self) {
        if !self.listeners.is_empty() {
            warn!("signal channel dropped with {} listeners", self.listeners.len());
        }
        self.release();
    }
}
