//! Directory of the nodes of one system.
//!
//! The registry is a fixed table of `REGISTRY_CAPACITY` slots. A node claims a
//! slot on construction, updates its own descriptor while it runs and marks it
//! dead on shutdown. Every node of the system holds a clone of the same
//! `Registry` handle; slot claims happen under the table lock, so two nodes can
//! never take the same slot or the same live name.

use crate::fs::save_state;
use log::{debug, info};
use parking_lot::Mutex;
use robot::{
    Errno, Error, NodeDescriptor, NodeFlags, NodeId, NodeStatistic, NodeStatus, NodeVersion,
    Result, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of slots in the table.
pub const REGISTRY_CAPACITY: usize = 1024;

/// System-wide part of the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryHeader {
    pub system_name: String,
    pub root_dir: PathBuf,
    pub home_dir: PathBuf,
}

/// What a node supplies when it claims a slot.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub group: String,
    pub out_of_system: bool,
    pub version: NodeVersion,
    pub config: String,
    pub start_ts: Timestamp,
}

#[derive(Debug)]
struct Table {
    header: RegistryHeader,
    slots: Vec<NodeDescriptor>,
}

/// Snapshot written by `Registry::dump`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistryDump {
    pub header: RegistryHeader,
    pub nodes: Vec<NodeDescriptor>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    table: Arc<Mutex<Table>>,
}

impl Registry {
    /// Creates an empty registry.
    ///
    /// # Arguments
    ///
    /// * `system_name` - Name of the system.
    /// * `root_dir` - Root directory; the home dir is `<root>/data`.
    pub fn new(system_name: &str, root_dir: &Path) -> Self {
        let header = RegistryHeader {
            system_name: system_name.to_string(),
            root_dir: root_dir.to_path_buf(),
            home_dir: root_dir.join("data"),
        };
        Self {
            table: Arc::new(Mutex::new(Table {
                header,
                slots: vec![NodeDescriptor::empty(); REGISTRY_CAPACITY],
            })),
        }
    }

    pub fn header(&self) -> RegistryHeader {
        self.table.lock().header.clone()
    }

    /// Claims a slot for a node.
    ///
    /// A dead slot left by a previous run of the same name is reused; otherwise
    /// the first unused slot is taken.
    ///
    /// # Returns
    ///
    /// * `Ok(NodeId)` of the claimed slot.
    /// * `Err(Error::AlreadyRunning)` if a live node holds the name.
    /// * `Err(Error::Registry(Errno::Failed))` if the table is full.
    pub fn register(&self, registration: Registration) -> Result<NodeId> {
        let mut table = self.table.lock();

        if table
            .slots
            .iter()
            .any(|slot| slot.is_alive() && slot.name == registration.name)
        {
            return Err(Error::AlreadyRunning(registration.name));
        }

        let index = table
            .slots
            .iter()
            .position(|slot| slot.is_used() && slot.name == registration.name)
            .or_else(|| table.slots.iter().position(|slot| !slot.is_used()))
            .ok_or(Error::Registry(Errno::Failed))?;

        let mut flags = NodeFlags::empty();
        if registration.out_of_system {
            flags.insert(NodeFlags::STAND_ALONE);
        }

        let id = (index + 1) as NodeId;
        table.slots[index] = NodeDescriptor {
            id,
            name: registration.name,
            group: registration.group,
            pid: std::process::id(),
            status: NodeStatus::Inactive,
            flags,
            statistic: NodeStatistic::new(registration.start_ts),
            version: registration.version,
            config: registration.config,
        };
        info!(
            "node '{}' registered in slot {}",
            table.slots[index].name, id
        );
        Ok(id)
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<NodeDescriptor> {
        self.find(|slot| slot.name == name)
            .ok_or_else(|| Error::NotFound(format!("node '{}'", name)))
    }

    pub fn lookup_by_id(&self, id: NodeId) -> Result<NodeDescriptor> {
        self.find(|slot| slot.id == id)
            .ok_or_else(|| Error::NotFound(format!("node id {}", id)))
    }

    /// Returns the first live node of the process, or any used slot with that pid.
    pub fn lookup_by_pid(&self, pid: u32) -> Result<NodeDescriptor> {
        self.find(|slot| slot.pid == pid && slot.is_alive())
            .or_else(|| self.find(|slot| slot.pid == pid))
            .ok_or_else(|| Error::NotFound(format!("node with pid {}", pid)))
    }

    /// Returns a snapshot of every used slot, in slot order.
    pub fn iterate(&self) -> Vec<NodeDescriptor> {
        self.table
            .lock()
            .slots
            .iter()
            .filter(|slot| slot.is_used())
            .cloned()
            .collect()
    }

    /// Applies `f` to the descriptor of `id`.
    pub fn update<R>(&self, id: NodeId, f: impl FnOnce(&mut NodeDescriptor) -> R) -> Result<R> {
        let mut table = self.table.lock();
        let slot = slot_mut(&mut table, id)?;
        Ok(f(slot))
    }

    pub fn set_status(&self, id: NodeId, status: NodeStatus) -> Result<()> {
        self.update(id, |slot| {
            debug!("node '{}' status {} -> {}", slot.name, slot.status, status);
            slot.status = status;
        })
    }

    /// Drops the process claim on a slot.
    ///
    /// The descriptor stays visible (normally as dead) so viewers can see the
    /// node went away; the name can be registered again.
    pub fn release(&self, id: NodeId) -> Result<()> {
        self.update(id, |slot| {
            slot.pid = 0;
            if slot.status != NodeStatus::Dead {
                slot.status = NodeStatus::Dead;
            }
        })
    }

    /// Number of used slots.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .slots
            .iter()
            .filter(|slot| slot.is_used())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes a JSON snapshot of the header and used slots for external viewers.
    pub fn dump(&self, path: &Path) -> anyhow::Result<()> {
        let dump = RegistryDump {
            header: self.header(),
            nodes: self.iterate(),
        };
        save_state(path, &dump)
    }

    fn find(&self, predicate: impl Fn(&NodeDescriptor) -> bool) -> Option<NodeDescriptor> {
        self.table
            .lock()
            .slots
            .iter()
            .find(|slot| slot.is_used() && predicate(slot))
            .cloned()
    }
}

fn slot_mut(table: &mut Table, id: NodeId) -> Result<&mut NodeDescriptor> {
    if id <= 0 || id as usize > table.slots.len() {
        return Err(Error::Registry(Errno::InvalidArg));
    }
    let slot = &mut table.slots[id as usize - 1];
    if !slot.is_used() {
        return Err(Error::Registry(Errno::NotFound));
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str) -> Registration {
        Registration {
            name: name.to_string(),
            group: String::new(),
            out_of_system: false,
            version: NodeVersion::new(0, 1, "abcdef0"),
            config: String::new(),
            start_ts: 1,
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new("test", Path::new("/tmp/root"));
        let a = registry.register(registration("a")).unwrap();
        let b = registry.register(registration("b")).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        assert_eq!(registry.lookup_by_name("b").unwrap().id, b);
        assert_eq!(registry.lookup_by_id(a).unwrap().name, "a");
        assert_eq!(
            registry.lookup_by_pid(std::process::id()).unwrap().pid,
            std::process::id()
        );
        assert!(matches!(registry.lookup_by_name("c"), Err(Error::NotFound(_))));
        assert_eq!(registry.header().home_dir, PathBuf::from("/tmp/root/data"));
    }

    #[test]
    fn test_live_name_cannot_be_claimed_twice() {
        let registry = Registry::new("test", Path::new("."));
        let id = registry.register(registration("robot")).unwrap();
        assert!(matches!(
            registry.register(registration("robot")),
            Err(Error::AlreadyRunning(_))
        ));

        registry.release(id).unwrap();
        let again = registry.register(registration("robot")).unwrap();
        assert_eq!(again, id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_full_table_fails() {
        let registry = Registry::new("test", Path::new("."));
        for i in 0..REGISTRY_CAPACITY {
            registry.register(registration(&format!("n{}", i))).unwrap();
        }
        assert!(matches!(
            registry.register(registration("overflow")),
            Err(Error::Registry(Errno::Failed))
        ));
    }

    #[test]
    fn test_iterate_skips_unused_slots() {
        let registry = Registry::new("test", Path::new("."));
        registry.register(registration("a")).unwrap();
        let b = registry.register(registration("b")).unwrap();
        registry.set_status(b, NodeStatus::Active).unwrap();

        let nodes = registry.iterate();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].status, NodeStatus::Active);
        assert!(registry.set_status(0, NodeStatus::Active).is_err());
        assert!(registry.set_status(5, NodeStatus::Active).is_err());
    }

    #[test]
    fn test_dump_writes_live_slots() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new("test", dir.path());
        registry.register(registration("a")).unwrap();

        let path = dir.path().join("data").join("registry.json");
        registry.dump(&path).unwrap();
        let dump: RegistryDump = crate::fs::load_state(&path).unwrap();
        assert_eq!(dump.nodes.len(), 1);
        assert_eq!(dump.header.system_name, "test");
    }
}
