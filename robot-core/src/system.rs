//! The context every node of one system is built from.

use crate::args::CommonArgs;
use crate::fs::PathManager;
use crate::node::Link;
use crate::registry::Registry;
use std::sync::Arc;

/// Shared handles of one system: the node registry, the peer link and the
/// directory layout.
///
/// Cloning is cheap; all clones see the same registry and link.
#[derive(Debug, Clone)]
pub struct System {
    registry: Registry,
    link: Link,
    paths: Arc<PathManager>,
}

impl System {
    pub fn new(system_name: &str, paths: PathManager) -> Self {
        Self {
            registry: Registry::new(system_name, paths.get_root_dir()),
            link: Link::new(),
            paths: Arc::new(paths),
        }
    }

    pub fn from_args(args: &CommonArgs) -> Self {
        Self::new(&args.get_system(), PathManager::from_args(args))
    }

    pub fn get_registry(&self) -> &Registry {
        &self.registry
    }

    pub fn get_link(&self) -> &Link {
        &self.link
    }

    pub fn get_paths(&self) -> &PathManager {
        &self.paths
    }
}
