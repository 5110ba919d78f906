//! Node descriptor types stored in the registry.

use crate::model::identity::NodeId;
use crate::model::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Active = 1,
    Offline = 2,
    Dead = 3,
    Inactive = 4,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeStatus::Active => "active",
            NodeStatus::Offline => "offline",
            NodeStatus::Dead => "dead",
            NodeStatus::Inactive => "inactive",
        };
        f.write_str(name)
    }
}

/// Node flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeFlags(u32);

impl NodeFlags {
    /// Not controlled by the init node.
    pub const STAND_ALONE: Self = Self(0x1);
    /// Not shown by viewers.
    pub const HIDDEN: Self = Self(0x2);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

/// Per-node counters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStatistic {
    pub error_cnt: u64,
    pub warn_cnt: u64,
    pub msg_in_cnt: u64,
    pub msg_out_cnt: u64,
    pub start_ts: Timestamp,
    pub curr_ts: Timestamp,
}

impl NodeStatistic {
    pub fn new(start_ts: Timestamp) -> Self {
        Self {
            start_ts,
            curr_ts: start_ts,
            ..Default::default()
        }
    }

    /// Clears the counters, keeping the timestamps.
    pub fn reset(&mut self) {
        self.error_cnt = 0;
        self.warn_cnt = 0;
        self.msg_in_cnt = 0;
        self.msg_out_cnt = 0;
    }
}

/// Build version of a node binary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeVersion {
    pub major: u16,
    pub minor: u16,
    /// Short git hash, 7 characters.
    pub git_hash: String,
    pub is_debug: bool,
    pub uncommitted: bool,
}

impl NodeVersion {
    pub fn new(major: u16, minor: u16, git_hash: &str) -> Self {
        Self {
            major,
            minor,
            git_hash: git_hash.chars().take(7).collect(),
            is_debug: false,
            uncommitted: false,
        }
    }
}

impl fmt::Display for NodeVersion {
    /// Renders `major.minor.hash`, with `*` for uncommitted builds and wrapped
    /// in brackets for debug builds.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut version = format!("{}.{}.{}", self.major, self.minor, self.git_hash);
        if self.uncommitted {
            version.push('*');
        }
        if self.is_debug {
            write!(f, "[{}]", version)
        } else {
            f.write_str(&version)
        }
    }
}

/// One registry slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Slot id, `0` when the slot is unused.
    pub id: NodeId,
    pub name: String,
    pub group: String,
    /// Owning process id, `0` once the claim is released.
    pub pid: u32,
    pub status: NodeStatus,
    pub flags: NodeFlags,
    pub statistic: NodeStatistic,
    pub version: NodeVersion,
    pub config: String,
}

impl NodeDescriptor {
    /// Returns an unused slot.
    pub fn empty() -> Self {
        Self {
            id: 0,
            name: String::new(),
            group: String::new(),
            pid: 0,
            status: NodeStatus::Dead,
            flags: NodeFlags::empty(),
            statistic: NodeStatistic::default(),
            version: NodeVersion::default(),
            config: String::new(),
        }
    }

    pub fn is_used(&self) -> bool {
        self.id != 0
    }

    pub fn is_alive(&self) -> bool {
        self.is_used() && self.status != NodeStatus::Dead
    }
}
