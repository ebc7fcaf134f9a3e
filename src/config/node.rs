//! Recursive configuration tree
//!
//! A `ConfigNode` is built once from a parsed [`Mapping`] and never mutated
//! afterwards. Every entry is classified into a [`ConfigValue`] at
//! construction time, so accessors never inspect runtime types.

use crate::config::value::{Mapping, Value};
use indexmap::IndexMap;
use std::fmt;

/// Scalar leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

impl Scalar {
    fn to_value(&self) -> Value {
        match self {
            Scalar::Integer(i) => Value::Integer(*i),
            Scalar::Float(x) => Value::Float(*x),
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::Boolean(b) => Value::Boolean(*b),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::String(s) => write!(f, "{}", s),
            Scalar::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// One classified entry of a config tree
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Scalar(Scalar),
    /// Sequences are kept as plain values
    Sequence(Vec<Value>),
    Node(ConfigNode),
    Null,
}

impl ConfigValue {
    fn classify(value: &Value) -> Self {
        match value {
            Value::Null => ConfigValue::Null,
            Value::Boolean(b) => ConfigValue::Scalar(Scalar::Boolean(*b)),
            Value::Integer(i) => ConfigValue::Scalar(Scalar::Integer(*i)),
            Value::Float(x) => ConfigValue::Scalar(Scalar::Float(*x)),
            Value::String(s) => ConfigValue::Scalar(Scalar::String(s.clone())),
            Value::Sequence(items) => ConfigValue::Sequence(items.clone()),
            Value::Mapping(m) => ConfigValue::Node(ConfigNode::new(m)),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ConfigValue::Scalar(s) => s.to_value(),
            ConfigValue::Sequence(items) => Value::Sequence(items.clone()),
            ConfigValue::Node(node) => Value::Mapping(node.as_mapping()),
            ConfigValue::Null => Value::Null,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Scalar(Scalar::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Scalar(Scalar::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&ConfigNode> {
        match self {
            ConfigValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            ConfigValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Scalar(s) => write!(f, "{}", s),
            ConfigValue::Sequence(items) => write!(f, "{}", Value::Sequence(items.clone())),
            ConfigValue::Node(node) => write!(f, "{}", Value::Mapping(node.as_mapping())),
            ConfigValue::Null => write!(f, ""),
        }
    }
}

/// One level of a recursively nested configuration document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigNode {
    entries: IndexMap<String, ConfigValue>,
}

impl ConfigNode {
    /// Classify every entry of `mapping`. Nulls are kept, never dropped.
    pub fn new(mapping: &Mapping) -> Self {
        let entries = mapping
            .iter()
            .map(|(key, value)| (key.clone(), ConfigValue::classify(value)))
            .collect();

        Self { entries }
    }

    /// An empty node, the result of looking up anything that isn't there
    pub fn empty() -> Self {
        Self::default()
    }

    fn find(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    /// Exact lookup first, then the hyphenated spelling of `key`.
    fn lookup(&self, key: &str) -> Option<&ConfigValue> {
        self.find(key).or_else(|| {
            let hyphenated = key.replace('_', "-");
            if hyphenated != key {
                self.find(&hyphenated)
            } else {
                None
            }
        })
    }

    /// Value at `key`, or `default` when absent.
    pub fn get<'a>(&'a self, key: &str, default: &'a ConfigValue) -> &'a ConfigValue {
        self.lookup(key).unwrap_or(default)
    }

    /// Value at `key`, if present.
    pub fn get_opt(&self, key: &str) -> Option<&ConfigValue> {
        self.lookup(key)
    }

    /// Child node at `key`. Missing keys and non-node values yield an empty node.
    pub fn node(&self, key: &str) -> ConfigNode {
        self.lookup(key)
            .and_then(ConfigValue::as_node)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_node(&self, key: &str) -> Option<&ConfigNode> {
        self.lookup(key).and_then(ConfigValue::as_node)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.lookup(key).and_then(ConfigValue::as_str)
    }

    /// String at `key`, or `default` when absent or not a string.
    pub fn get_str_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or(default).to_string()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.lookup(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.lookup(key).and_then(ConfigValue::as_i64)
    }

    /// String members of the sequence at `key`; non-strings are skipped.
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        self.lookup(key)
            .and_then(ConfigValue::as_sequence)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Presence check, exact key only.
    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Immediate child keys in insertion order
    pub fn list_keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert the tree back into a plain mapping, depth first.
    pub fn as_mapping(&self) -> Mapping {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), value.to_value()))
            .collect()
    }
}

impl From<&Mapping> for ConfigNode {
    fn from(mapping: &Mapping) -> Self {
        ConfigNode::new(mapping)
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Mapping {
        let mut velocity = Mapping::new();
        velocity.insert("enabled".to_string(), Value::Boolean(false));
        velocity.insert("secret".to_string(), Value::Null);

        let mut general = Mapping::new();
        general.insert("hostname".to_string(), "env1.example.net".into());
        general.insert("max-players".to_string(), Value::Integer(40));

        let mut root = Mapping::new();
        root.insert("general".to_string(), Value::Mapping(general));
        root.insert("velocity".to_string(), Value::Mapping(velocity));
        root.insert(
            "groups".to_string(),
            Value::Sequence(vec!["lobby".into(), "survival".into()]),
        );
        root.insert("ratio".to_string(), Value::Float(0.5));
        root.insert("empty".to_string(), Value::Null);
        root
    }

    #[test]
    fn test_construction_classifies_every_entry() {
        let node = ConfigNode::new(&sample());

        assert!(matches!(node.get_opt("general"), Some(ConfigValue::Node(_))));
        assert!(matches!(node.get_opt("groups"), Some(ConfigValue::Sequence(_))));
        assert!(matches!(
            node.get_opt("ratio"),
            Some(ConfigValue::Scalar(Scalar::Float(_)))
        ));
        assert_eq!(node.get_opt("empty"), Some(&ConfigValue::Null));
        assert_eq!(node.len(), 5);
    }

    #[test]
    fn test_hyphen_underscore_fallback() {
        let node = ConfigNode::new(&sample()).node("general");

        assert_eq!(node.get_i64("max_players"), Some(40));
        assert_eq!(node.get_i64("max-players"), Some(40));
        assert!(!node.contains("max_players"));
        assert!(node.contains("max-players"));
    }

    #[test]
    fn test_missing_key_yields_empty_node_or_default() {
        let node = ConfigNode::new(&sample());

        assert!(node.node("does-not-exist").is_empty());
        assert!(node.node("ratio").is_empty());

        let fallback = ConfigValue::Scalar(Scalar::String("fallback".to_string()));
        assert_eq!(node.get("nope", &fallback), &fallback);
        assert_eq!(node.get_str_or("nope", "x"), "x");
    }

    #[test]
    fn test_list_keys_preserves_insertion_order() {
        let node = ConfigNode::new(&sample());
        assert_eq!(
            node.list_keys(),
            vec!["general", "velocity", "groups", "ratio", "empty"]
        );
    }

    #[test]
    fn test_as_mapping_roundtrips_source() {
        let source = sample();
        let node = ConfigNode::new(&source);
        assert_eq!(node.as_mapping(), source);
    }

    #[test]
    fn test_get_str_list_skips_non_strings() {
        let mut root = Mapping::new();
        root.insert(
            "enabled_groups".to_string(),
            Value::Sequence(vec!["a".into(), Value::Integer(3), "b".into()]),
        );
        let node = ConfigNode::new(&root);

        assert_eq!(node.get_str_list("enabled_groups"), vec!["a", "b"]);
        assert!(node.get_str_list("missing").is_empty());
    }
}
