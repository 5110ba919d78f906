use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;

/// Manages the standard directory layout under the system root.
///
/// * `<root>/config` - per-node configuration files.
/// * `<root>/data` - the home directory shared by nodes (instrument db, dumps).
#[derive(Debug, Clone)]
pub struct PathManager {
    root_dir: PathBuf,
    config_dir: PathBuf,
    data_dir: PathBuf,
    temp_dir: PathBuf,
}

impl PathManager {
    /// Creates a PathManager rooted at `root_dir`.
    ///
    /// # Arguments
    ///
    /// * `root_dir` - Root directory of the system.
    ///
    /// # Returns
    ///
    /// A new `PathManager`.
    pub fn from_root(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            config_dir: root_dir.join("config"),
            data_dir: root_dir.join("data"),
            temp_dir: env::temp_dir().join("robot"),
            root_dir,
        }
    }

    /// Creates a PathManager from the common arguments.
    pub fn from_args(args: &crate::args::CommonArgs) -> Self {
        Self::from_root(args.get_root_dir())
    }

    pub fn get_root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Returns the home directory of the system nodes.
    pub fn get_data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn get_config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the path of the config file of the named node.
    pub fn get_config_file_path(&self, node_name: &str) -> PathBuf {
        self.config_dir.join(format!("{}.json", node_name))
    }

    /// Loads a configuration object from the `config` directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Relative path inside config dir.
    ///
    /// # Returns
    ///
    /// * `Ok(T)` on success.
    /// * `Err` on IO or parse error.
    pub fn load_config<T>(&self, path: &Path) -> std::io::Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config_path = self.config_dir.join(path);
        let file = fs::File::open(config_path)?;
        let config = std::io::BufReader::new(file);
        let config = serde_json::from_reader(config)?;
        Ok(config)
    }

    /// Ensures all managed directories exist, creating them if necessary.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if directories exist or were created.
    /// * `Err` if creation fails.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(&self.temp_dir)?;
        Ok(())
    }

    pub fn get_data_file_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(path)
    }

    pub fn get_temp_file_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.temp_dir.join(path)
    }
}
