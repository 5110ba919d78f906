//! Hierarchical configuration provider.
//!
//! A `Config` is a node of a JSON tree: object-valued members are children,
//! scalar members are attributes. Children are addressed with `/`-separated
//! paths (`"node/cache"`). Attribute getters accept both native JSON scalars
//! and their string spelling (`"100"`, `"true"`).

use robot::{Error, Result};
use serde_json::{Map, Value};
use std::env;
use std::path::Path;

/// Member holding the text content of an element.
const TEXT_ATTR: &str = "#text";

/// Child holding substitution variables.
const VARIABLES_CHILD: &str = "variables";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    name: String,
    members: Map<String, Value>,
}

impl Config {
    /// Creates an empty config element.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Map::new(),
        }
    }

    /// Wraps a JSON value. Anything but an object is rejected.
    pub fn from_value(name: impl Into<String>, value: Value) -> Result<Self> {
        let name = name.into();
        match value {
            Value::Object(members) => Ok(Self { name, members }),
            other => Err(Error::Config(format!(
                "config '{}' must be an object, got {}",
                name, other
            ))),
        }
    }

    /// Loads a config file. The root element is named after the file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("unable to parse {:?}: {}", path, e)))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_value(name, value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text content of the element, if any.
    pub fn text(&self) -> Option<&str> {
        self.members.get(TEXT_ATTR).and_then(Value::as_str)
    }

    pub fn has_child(&self, path: &str) -> bool {
        self.get_child(path).is_some()
    }

    /// Returns the child at `path`.
    pub fn get_child(&self, path: &str) -> Option<Config> {
        let mut name = self.name.as_str();
        let mut members = &self.members;
        for part in path.split('/').filter(|part| !part.is_empty()) {
            members = members.get(part)?.as_object()?;
            name = part;
        }
        Some(Config {
            name: name.to_string(),
            members: members.clone(),
        })
    }

    /// Returns the direct children, in document order.
    pub fn children(&self) -> Vec<Config> {
        self.members
            .iter()
            .filter_map(|(name, value)| {
                value.as_object().map(|members| Config {
                    name: name.clone(),
                    members: members.clone(),
                })
            })
            .collect()
    }

    pub fn children_count(&self) -> usize {
        self.members.values().filter(|value| value.is_object()).count()
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_ok()
    }

    pub fn get_attr_s(&self, name: &str) -> Result<String> {
        match self.attr(name)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(self.wrong_type(name, "string")),
        }
    }

    pub fn get_attr_i(&self, name: &str) -> Result<i64> {
        match self.attr(name)? {
            Value::Number(n) => n.as_i64().ok_or_else(|| self.wrong_type(name, "integer")),
            Value::String(s) => s.trim().parse().map_err(|_| self.wrong_type(name, "integer")),
            _ => Err(self.wrong_type(name, "integer")),
        }
    }

    pub fn get_attr_d(&self, name: &str) -> Result<f64> {
        match self.attr(name)? {
            Value::Number(n) => n.as_f64().ok_or_else(|| self.wrong_type(name, "double")),
            Value::String(s) => s.trim().parse().map_err(|_| self.wrong_type(name, "double")),
            _ => Err(self.wrong_type(name, "double")),
        }
    }

    pub fn get_attr_b(&self, name: &str) -> Result<bool> {
        match self.attr(name)? {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
            Value::String(s) => match s.trim() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(self.wrong_type(name, "boolean")),
            },
            _ => Err(self.wrong_type(name, "boolean")),
        }
    }

    /// Integer attribute with a fallback for a missing attribute.
    ///
    /// A present attribute of the wrong type is still an error.
    pub fn get_attr_i_or(&self, name: &str, default: i64) -> Result<i64> {
        if self.members.contains_key(name) {
            self.get_attr_i(name)
        } else {
            Ok(default)
        }
    }

    pub fn get_attr_b_or(&self, name: &str, default: bool) -> Result<bool> {
        if self.members.contains_key(name) {
            self.get_attr_b(name)
        } else {
            Ok(default)
        }
    }

    /// Looks up a variable in the `variables` child, then in the environment.
    pub fn get_variable(&self, name: &str) -> Option<String> {
        self.get_child(VARIABLES_CHILD)
            .and_then(|vars| vars.get_attr_s(name).ok())
            .or_else(|| env::var(name).ok())
    }

    fn attr(&self, name: &str) -> Result<&Value> {
        match self.members.get(name) {
            Some(value) if !value.is_object() && !value.is_null() => Ok(value),
            _ => Err(Error::Config(format!(
                "attribute '{}' not found in '{}'",
                name, self.name
            ))),
        }
    }

    fn wrong_type(&self, name: &str, expected: &str) -> Error {
        Error::Config(format!(
            "attribute '{}' of '{}' is not a {}",
            name, self.name, expected
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Config {
        Config::from_value(
            "sber_mm",
            json!({
                "node": { "wait_timeout_ms": "250", "cache": { "order": 1000 } },
                "mdata_engine": { "feed": "sim", "snapshot": true },
                "variables": { "ACCOUNT": "ACC1" },
                "#text": "market maker"
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_child_paths_and_attributes() {
        let config = sample();
        assert!(config.has_child("node/cache"));
        assert!(!config.has_child("node/missing"));

        let node = config.get_child("node").unwrap();
        assert_eq!(node.name(), "node");
        assert_eq!(node.get_attr_i("wait_timeout_ms").unwrap(), 250);
        assert_eq!(node.children_count(), 1);

        let cache = config.get_child("node/cache").unwrap();
        assert_eq!(cache.get_attr_i("order").unwrap(), 1000);

        let mdata = config.get_child("mdata_engine").unwrap();
        assert!(mdata.get_attr_b("snapshot").unwrap());
        assert_eq!(mdata.get_attr_s("feed").unwrap(), "sim");
        assert_eq!(config.text(), Some("market maker"));
    }

    #[test]
    fn test_missing_and_mistyped_attributes() {
        let config = sample();
        let mdata = config.get_child("mdata_engine").unwrap();
        assert!(matches!(mdata.get_attr_i("feed"), Err(Error::Config(_))));
        assert!(mdata.get_attr_d("absent").is_err());
        assert!(!mdata.has_attr("absent"));
        assert_eq!(mdata.get_attr_i_or("absent", 7).unwrap(), 7);
        assert!(!config.has_attr("node"));
    }

    #[test]
    fn test_variables_fall_back_to_environment() {
        let config = sample();
        assert_eq!(config.get_variable("ACCOUNT").as_deref(), Some("ACC1"));
        assert!(config.get_variable("ROBOT_SURELY_UNSET_VARIABLE").is_none());
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        assert!(Config::from_value("x", json!([1, 2])).is_err());
    }
}
