//! A node: one named participant of a system.
//!
//! A node owns its registry slot, its config, its object cache and the event
//! queue everything else posts into (peer objects, signals, engine
//! confirmations, market data). `receive` is the only blocking call; the
//! process layer loops it.

pub mod event;
pub mod link;
pub mod signal;
pub mod store;
pub mod timer;

pub use event::{Event, EventSender};
pub use link::Link;
pub use signal::SignalChannel;
pub use store::{Cursor, ObjectStore, DEFAULT_TYPE_CAPACITY};
pub use timer::TimerQueue;

use crate::config::Config;
use crate::registry::Registration;
use crate::system::System;
use log::{debug, info, warn};
use robot::{
    Errno, Error, NodeDescriptor, NodeId, NodeStatistic, NodeStatus, NodeVersion, Object,
    ObjectId, ObjectType, Result, TimerId, Timestamp,
};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Wait bound of `receive` when the config does not set one.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 100;

/// Most events returned by one `receive`.
const MAX_BATCH: usize = 256;

/// Object types cached unless the config says otherwise.
const CACHED_TYPES: [ObjectType; 4] = [
    ObjectType::Order,
    ObjectType::Instr,
    ObjectType::Signal,
    ObjectType::Field,
];

pub struct Node {
    system: System,
    id: NodeId,
    name: String,
    out_of_system: bool,
    config: Config,
    config_path: Option<PathBuf>,
    wait_timeout: Duration,
    store: ObjectStore,
    signals: SignalChannel,
    timers: TimerQueue,
    events: mpsc::Receiver<Event>,
    sender: EventSender,
}

impl Node {
    /// Builds a node and claims its registry slot.
    ///
    /// The config is read from `<root>/config/<name>.json` when that file
    /// exists; otherwise the node runs with an empty config.
    ///
    /// # Returns
    ///
    /// * `Err(Error::AlreadyRunning)` if a live node already holds `name`.
    /// * `Err(Error::Registry(Errno::Failed))` if the registry is full.
    /// * `Err(Error::Config)` on a malformed config.
    pub fn new(system: &System, name: &str, out_of_system: bool) -> Result<Self> {
        let path = system.get_paths().get_config_file_path(name);
        if path.exists() {
            let config = Config::load(&path)?;
            Self::build(system, name, out_of_system, config, Some(path))
        } else {
            debug!("no config file {:?}, using an empty config", path);
            Self::build(system, name, out_of_system, Config::empty(name), None)
        }
    }

    /// Builds a node with an in-memory config.
    pub fn with_config(
        system: &System,
        name: &str,
        out_of_system: bool,
        config: Config,
    ) -> Result<Self> {
        Self::build(system, name, out_of_system, config, None)
    }

    fn build(
        system: &System,
        name: &str,
        out_of_system: bool,
        config: Config,
        config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let wait_timeout = wait_timeout_from(&config)?;
        let mut store = ObjectStore::new();
        configure_cache(&mut store, &config)?;

        let group = config
            .get_child("node")
            .and_then(|node| node.get_attr_s("group").ok())
            .unwrap_or_default();
        let id = system.get_registry().register(Registration {
            name: name.to_string(),
            group,
            out_of_system,
            version: Self::version(),
            config: config_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            start_ts: now_ts(),
        })?;

        let (tx, events) = mpsc::channel();
        let sender = EventSender::new(tx);
        system.get_link().attach(id, sender.clone());
        info!(
            "node '{}' started as id {} (wait timeout {:?})",
            name, id, wait_timeout
        );

        Ok(Self {
            system: system.clone(),
            id,
            name: name.to_string(),
            out_of_system,
            config,
            config_path,
            wait_timeout,
            store,
            signals: SignalChannel::new(sender.clone()),
            timers: TimerQueue::new(),
            events,
            sender,
        })
    }

    /// Version of the running binary.
    pub fn version() -> NodeVersion {
        let major = env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0);
        let minor = env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0);
        let mut version = NodeVersion::new(major, minor, option_env!("ROBOT_GIT_HASH").unwrap_or("0000000"));
        version.is_debug = cfg!(debug_assertions);
        version.uncommitted = option_env!("ROBOT_GIT_DIRTY").is_some();
        version
    }

    /// Waits for the next batch of events.
    ///
    /// Blocks at most the configured wait timeout, less if a timer is due
    /// sooner. Returns an empty batch on a timeout tick. Objects of cached
    /// types are stored before they are returned; signals nobody catches any
    /// more are dropped.
    pub fn receive(&mut self) -> Result<Vec<Event>> {
        let wait = self
            .timers
            .next_due_in(Instant::now())
            .map_or(self.wait_timeout, |due| due.min(self.wait_timeout));

        let mut batch = Vec::new();
        match self.events.recv_timeout(wait) {
            Ok(event) => batch.push(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::Registry(Errno::NotConnected))
            }
        }
        while batch.len() < MAX_BATCH {
            match self.events.try_recv() {
                Ok(event) => batch.push(event),
                Err(_) => break,
            }
        }
        batch.extend(self.timers.expire(Instant::now()).into_iter().map(Event::Timer));

        let signals = &self.signals;
        batch.retain(|event| match event {
            Event::Signal(signum) => signals.is_caught(*signum),
            _ => true,
        });

        let mut received = 0;
        for event in &batch {
            if let Event::Object { object, from } = event {
                received += 1;
                if self.store.is_registered(object.get_type()) {
                    if let Err(e) = self.store.put(object.clone()) {
                        warn!("object {} from node {} not cached: {}", object.get_type(), from, e);
                        self.note_warning();
                    }
                }
            }
        }
        self.system.get_registry().update(self.id, |slot| {
            slot.statistic.msg_in_cnt += received;
            slot.statistic.curr_ts = now_ts();
        })?;
        Ok(batch)
    }

    /// Re-reads the config file and re-derives the wait timeout and cache capacities.
    ///
    /// Cached objects, timers and caught signals are kept.
    pub fn reconfigure(&mut self) -> Result<()> {
        if let Some(path) = &self.config_path {
            self.config = Config::load(path)?;
        }
        self.wait_timeout = wait_timeout_from(&self.config)?;
        configure_cache(&mut self.store, &self.config)?;
        info!(
            "node '{}' reconfigured (wait timeout {:?})",
            self.name, self.wait_timeout
        );
        Ok(())
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_out_of_system(&self) -> bool {
        self.out_of_system
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// Home directory shared by the nodes of the system.
    pub fn home_dir(&self) -> PathBuf {
        self.system.get_registry().header().home_dir
    }

    pub fn get_variable(&self, name: &str) -> Option<String> {
        self.config.get_variable(name)
    }

    /// Current registry descriptor of this node.
    pub fn descriptor(&self) -> Result<NodeDescriptor> {
        self.system.get_registry().lookup_by_id(self.id)
    }

    pub fn status(&self) -> Result<NodeStatus> {
        Ok(self.descriptor()?.status)
    }

    pub fn set_status(&self, status: NodeStatus) -> Result<()> {
        self.system.get_registry().set_status(self.id, status)
    }

    pub fn statistic(&self) -> Result<NodeStatistic> {
        Ok(self.descriptor()?.statistic)
    }

    pub fn reset_statistic(&self) -> Result<()> {
        self.system
            .get_registry()
            .update(self.id, |slot| slot.statistic.reset())
    }

    pub fn note_error(&self) {
        self.bump(|statistic| statistic.error_cnt += 1);
    }

    pub fn note_warning(&self) {
        self.bump(|statistic| statistic.warn_cnt += 1);
    }

    pub fn catch_signal(&mut self, signum: i32) -> Result<()> {
        self.signals.catch(signum)
    }

    pub fn free_signal(&mut self, signum: i32) -> bool {
        self.signals.free(signum)
    }

    pub fn create_object(&mut self, object_type: ObjectType) -> Result<&mut Object> {
        self.store.create_object(object_type)
    }

    pub fn get_object(&self, object_type: ObjectType, id: ObjectId) -> Option<&Object> {
        self.store.get_object(object_type, id)
    }

    pub fn get_object_count(&self, object_type: ObjectType) -> usize {
        self.store.get_object_count(object_type)
    }

    pub fn shrink_cache(&mut self, object_type: ObjectType, target_count: usize) -> Result<usize> {
        self.store.shrink(object_type, target_count)
    }

    pub fn create_cursor(&self, object_type: ObjectType, offset: usize) -> Result<Cursor<'_>> {
        self.store.create_cursor(object_type, offset)
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ObjectStore {
        &mut self.store
    }

    /// Sends an object to node `to` (which may be this node).
    ///
    /// # Returns
    ///
    /// * `Err(Error::Registry(Errno::UnableToRoute))` if `to` is not attached.
    pub fn send_object(&self, object: Object, to: NodeId) -> Result<()> {
        self.system.get_link().deliver(object, self.id, to)?;
        self.bump(|statistic| statistic.msg_out_cnt += 1);
        Ok(())
    }

    /// Injection handle of this node's event queue.
    pub fn event_sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn start_timer(&mut self, interval: Duration) -> TimerId {
        self.timers.start(interval)
    }

    pub fn start_repeat_timer(&mut self, start: Duration, repeat: Duration) -> TimerId {
        self.timers.start_repeat(start, repeat)
    }

    pub fn stop_timer(&mut self, id: TimerId) -> bool {
        self.timers.stop(id)
    }

    pub fn is_timer_armed(&self, id: TimerId) -> bool {
        self.timers.is_armed(id)
    }

    fn bump(&self, f: impl FnOnce(&mut NodeStatistic)) {
        if let Err(e) = self
            .system
            .get_registry()
            .update(self.id, |slot| f(&mut slot.statistic))
        {
            debug!("statistic of node {} not updated: {}", self.id, e);
        }
    }
}

impl Drop for Node {
    /// Marks the slot dead, then releases the signal channel, then the claim.
    fn drop(&mut self) {
        let registry = self.system.get_registry();
        if let Err(e) = registry.set_status(self.id, NodeStatus::Dead) {
            warn!("node '{}' could not be marked dead: {}", self.name, e);
        }
        self.signals.release();
        self.system.get_link().detach(self.id);
        if let Err(e) = registry.release(self.id) {
            warn!("node '{}' registry claim not released: {}", self.name, e);
        }
        info!("node '{}' stopped", self.name);
    }
}

fn wait_timeout_from(config: &Config) -> Result<Duration> {
    let millis = match config.get_child("node") {
        Some(node) => node.get_attr_i_or("wait_timeout_ms", DEFAULT_WAIT_TIMEOUT_MS as i64)?,
        None => DEFAULT_WAIT_TIMEOUT_MS as i64,
    };
    let millis = u64::try_from(millis)
        .map_err(|_| Error::Config(format!("negative wait_timeout_ms {}", millis)))?;
    Ok(Duration::from_millis(millis))
}

/// Registers the cached types; `node/cache` maps type names to capacities.
fn configure_cache(store: &mut ObjectStore, config: &Config) -> Result<()> {
    let cache = config.get_child("node/cache");
    for object_type in CACHED_TYPES {
        let capacity = match &cache {
            Some(cache) => cache.get_attr_i_or(object_type.name(), DEFAULT_TYPE_CAPACITY as i64)?,
            None => DEFAULT_TYPE_CAPACITY as i64,
        };
        let capacity = usize::try_from(capacity).map_err(|_| {
            Error::Config(format!("negative cache capacity for '{}'", object_type))
        })?;
        store.register_type(object_type, capacity);
    }
    Ok(())
}

pub(crate) fn now_ts() -> Timestamp {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map_or(0, |nanos| nanos.max(0) as Timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::PathManager;
    use robot::Payload;
    use serde_json::json;

    fn system() -> System {
        System::new("test", PathManager::from_root("/nonexistent/robot"))
    }

    fn config(value: serde_json::Value) -> Config {
        Config::from_value("n", value).unwrap()
    }

    #[test]
    fn test_wait_timeout_from_config() {
        let system = system();
        let node = Node::with_config(
            &system,
            "fast",
            true,
            config(json!({ "node": { "wait_timeout_ms": 5 } })),
        )
        .unwrap();
        assert_eq!(node.wait_timeout(), Duration::from_millis(5));

        let node = Node::new(&system, "default", true).unwrap();
        assert_eq!(node.wait_timeout(), Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS));
    }

    #[test]
    fn test_second_live_node_with_same_name_fails() {
        let system = system();
        let node = Node::new(&system, "robot", false).unwrap();
        assert!(matches!(
            Node::new(&system, "robot", false),
            Err(Error::AlreadyRunning(_))
        ));

        let id = node.id();
        drop(node);
        let slot = system.get_registry().lookup_by_id(id).unwrap();
        assert_eq!(slot.status, NodeStatus::Dead);
        assert_eq!(slot.pid, 0);
        assert!(!system.get_link().is_attached(id));
        assert!(Node::new(&system, "robot", false).is_ok());
    }

    #[test]
    fn test_objects_to_self_are_received_and_cached() {
        let system = system();
        let mut node = Node::with_config(
            &system,
            "self",
            true,
            config(json!({ "node": { "wait_timeout_ms": 10 } })),
        )
        .unwrap();

        let signal = Object::new(
            0,
            Payload::Signal {
                name: "spread".into(),
                value: 0.5,
            },
        );
        node.send_object(signal, node.id()).unwrap();
        node.send_object(Object::control(Payload::Start), node.id()).unwrap();

        let batch = node.receive().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(node.get_object_count(ObjectType::Signal), 1);
        assert_eq!(node.get_object_count(ObjectType::Start), 0);

        let statistic = node.statistic().unwrap();
        assert_eq!(statistic.msg_in_cnt, 2);
        assert_eq!(statistic.msg_out_cnt, 2);

        assert!(node.receive().unwrap().is_empty());
    }

    #[test]
    fn test_timer_fires_inside_receive() {
        let system = system();
        let mut node = Node::with_config(
            &system,
            "timed",
            true,
            config(json!({ "node": { "wait_timeout_ms": 1000 } })),
        )
        .unwrap();

        let id = node.start_timer(Duration::from_millis(5));
        let started = Instant::now();
        let mut fired = Vec::new();
        while fired.is_empty() && started.elapsed() < Duration::from_secs(2) {
            fired = node.receive().unwrap();
        }
        assert_eq!(fired, vec![Event::Timer(id)]);
        assert!(started.elapsed() < Duration::from_millis(900));
        assert!(!node.is_timer_armed(id));
    }

    #[test]
    fn test_uncaught_signals_are_dropped() {
        let system = system();
        let mut node = Node::with_config(&system, "sig", true, config(json!({}))).unwrap();
        node.event_sender().signal(libc::SIGUSR1).unwrap();
        assert!(node.receive().unwrap().is_empty());
    }

    #[test]
    fn test_unroutable_peer() {
        let system = system();
        let node = Node::with_config(&system, "lonely", true, config(json!({}))).unwrap();
        assert!(matches!(
            node.send_object(Object::control(Payload::Stop), 77),
            Err(Error::Registry(Errno::UnableToRoute))
        ));
    }

    #[test]
    fn test_cache_capacity_from_config() {
        let system = system();
        let mut node = Node::with_config(
            &system,
            "small",
            true,
            config(json!({ "node": { "cache": { "order": 1 } } })),
        )
        .unwrap();
        node.create_object(ObjectType::Order).unwrap();
        assert!(matches!(
            node.create_object(ObjectType::Order),
            Err(Error::ResourceUnavailable(_))
        ));
        assert!(node.create_cursor(ObjectType::Start, 0).is_err());
    }
}
