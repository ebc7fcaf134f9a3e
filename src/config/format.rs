//! Format adapters
//!
//! Each adapter turns raw text into a plain [`Mapping`] and back. Format
//! quirks (YAML null rendering, TOML's lack of null, `=` inside ENV values)
//! stay inside the adapter so nothing downstream special-cases a format.

use crate::config::value::{Mapping, Value};
use crate::ErrorCategory;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{kind} parse error: {message}")]
    Parse { kind: ConfigKind, message: String },
    #[error("{kind} serialization error: {message}")]
    Serialize { kind: ConfigKind, message: String },
    #[error("{kind} cannot represent the value at '{key}': {reason}")]
    Unrepresentable {
        kind: ConfigKind,
        key: String,
        reason: String,
    },
}

impl FormatError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::MalformedInput
    }
}

/// Supported config formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    Yaml,
    Toml,
    Env,
}

impl ConfigKind {
    pub fn adapter(self) -> &'static dyn FormatAdapter {
        match self {
            ConfigKind::Yaml => &YamlFormat,
            ConfigKind::Toml => &TomlFormat,
            ConfigKind::Env => &EnvFormat,
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => Some(ConfigKind::Yaml),
            Some("toml") => Some(ConfigKind::Toml),
            Some("env") => Some(ConfigKind::Env),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKind::Yaml => write!(f, "YAML"),
            ConfigKind::Toml => write!(f, "TOML"),
            ConfigKind::Env => write!(f, "ENV"),
        }
    }
}

impl FromStr for ConfigKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigKind::Yaml),
            "toml" => Ok(ConfigKind::Toml),
            "env" => Ok(ConfigKind::Env),
            _ => Err(format!("Invalid config format: {}", s)),
        }
    }
}

/// Serialization options shared by all adapters
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Wrap ENV values in double quotes
    pub quote_env_values: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            quote_env_values: true,
        }
    }
}

/// Common load/write contract of every config format
pub trait FormatAdapter: Send + Sync {
    fn kind(&self) -> ConfigKind;

    fn parse(&self, text: &str) -> Result<Mapping, FormatError>;

    fn serialize(&self, mapping: &Mapping, options: &WriteOptions) -> Result<String, FormatError>;

    /// Parse `text`, logging the failure and falling back to an empty mapping.
    fn parse_or_empty(&self, text: &str, origin: &str) -> Mapping {
        match self.parse(text) {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(
                    format = %self.kind(),
                    origin = origin,
                    error = %e,
                    content = text,
                    "Failed to parse config, falling back to an empty mapping"
                );
                Mapping::new()
            }
        }
    }
}

/// YAML adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl YamlFormat {
    fn convert(value: serde_yaml::Value) -> Value {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Boolean(b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(x) = n.as_f64() {
                    Value::Float(x)
                } else {
                    Value::String(n.to_string())
                }
            }
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(items) => {
                Value::Sequence(items.into_iter().map(Self::convert).collect())
            }
            serde_yaml::Value::Mapping(m) => Value::Mapping(Self::convert_mapping(m)),
            serde_yaml::Value::Tagged(tagged) => Self::convert(tagged.value),
        }
    }

    fn convert_mapping(mapping: serde_yaml::Mapping) -> Mapping {
        mapping
            .into_iter()
            .map(|(key, value)| (Self::key_string(key), Self::convert(value)))
            .collect()
    }

    fn key_string(key: serde_yaml::Value) -> String {
        match key {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Null => "~".to_string(),
            other => serde_yaml::to_string(&other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        }
    }

    /// Rewrite `null` tokens emitted by the serializer as empty scalars.
    ///
    /// Lines inside block scalars are left alone.
    fn blank_nulls(rendered: &str) -> String {
        let mut out = String::with_capacity(rendered.len());
        let mut block_indent: Option<usize> = None;

        for line in rendered.lines() {
            let indent = line.len() - line.trim_start().len();

            if let Some(parent_indent) = block_indent {
                if line.trim().is_empty() || indent > parent_indent {
                    out.push_str(line);
                    out.push('\n');
                    continue;
                }
                block_indent = None;
            }

            let trimmed = line.trim_end();
            let rewritten = if trimmed.ends_with(": null") {
                &trimmed[..trimmed.len() - " null".len()]
            } else if trimmed.trim_start() == "- null" {
                &trimmed[..trimmed.len() - " null".len()]
            } else {
                trimmed
            };

            let tail = rewritten.rsplit(' ').next().unwrap_or("");
            if matches!(tail, "|" | "|-" | "|+" | ">" | ">-" | ">+") {
                block_indent = Some(indent);
            }

            out.push_str(rewritten);
            out.push('\n');
        }

        out
    }
}

impl FormatAdapter for YamlFormat {
    fn kind(&self) -> ConfigKind {
        ConfigKind::Yaml
    }

    fn parse(&self, text: &str) -> Result<Mapping, FormatError> {
        let document: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| FormatError::Parse {
                kind: ConfigKind::Yaml,
                message: e.to_string(),
            })?;

        match document {
            serde_yaml::Value::Null => Ok(Mapping::new()),
            serde_yaml::Value::Mapping(m) => Ok(Self::convert_mapping(m)),
            other => Err(FormatError::Parse {
                kind: ConfigKind::Yaml,
                message: format!("expected a mapping at the document root, got {:?}", other),
            }),
        }
    }

    fn serialize(&self, mapping: &Mapping, _options: &WriteOptions) -> Result<String, FormatError> {
        let rendered = serde_yaml::to_string(mapping).map_err(|e| FormatError::Serialize {
            kind: ConfigKind::Yaml,
            message: e.to_string(),
        })?;

        Ok(Self::blank_nulls(&rendered))
    }
}

/// TOML adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl TomlFormat {
    fn convert(value: toml::Value) -> Value {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Integer(i),
            toml::Value::Float(x) => Value::Float(x),
            toml::Value::Boolean(b) => Value::Boolean(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Self::convert).collect())
            }
            toml::Value::Table(table) => Value::Mapping(Self::convert_table(table)),
        }
    }

    fn convert_table(table: toml::Table) -> Mapping {
        table
            .into_iter()
            .map(|(key, value)| (key, Self::convert(value)))
            .collect()
    }

    /// TOML has no null, so nulls are dropped.
    fn to_toml(value: &Value) -> Option<toml::Value> {
        match value {
            Value::Null => None,
            Value::Boolean(b) => Some(toml::Value::Boolean(*b)),
            Value::Integer(i) => Some(toml::Value::Integer(*i)),
            Value::Float(x) => Some(toml::Value::Float(*x)),
            Value::String(s) => Some(toml::Value::String(s.clone())),
            Value::Sequence(items) => Some(toml::Value::Array(
                items.iter().filter_map(Self::to_toml).collect(),
            )),
            Value::Mapping(m) => Some(toml::Value::Table(Self::to_table(m))),
        }
    }

    fn to_table(mapping: &Mapping) -> toml::Table {
        let mut table = toml::Table::new();
        for (key, value) in mapping {
            match Self::to_toml(value) {
                Some(v) => {
                    table.insert(key.clone(), v);
                }
                None => debug!(key = %key, "Dropping null value from TOML output"),
            }
        }
        table
    }
}

impl FormatAdapter for TomlFormat {
    fn kind(&self) -> ConfigKind {
        ConfigKind::Toml
    }

    fn parse(&self, text: &str) -> Result<Mapping, FormatError> {
        let table: toml::Table = toml::from_str(text).map_err(|e| FormatError::Parse {
            kind: ConfigKind::Toml,
            message: e.to_string(),
        })?;

        Ok(Self::convert_table(table))
    }

    fn serialize(&self, mapping: &Mapping, _options: &WriteOptions) -> Result<String, FormatError> {
        toml::to_string_pretty(&Self::to_table(mapping)).map_err(|e| FormatError::Serialize {
            kind: ConfigKind::Toml,
            message: e.to_string(),
        })
    }
}

/// `KEY=value` line adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvFormat;

impl EnvFormat {
    fn unquote(value: &str) -> &str {
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            &value[1..value.len() - 1]
        } else {
            value
        }
    }

    fn render(key: &str, value: &Value) -> Result<String, FormatError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(s) if s.contains(['\n', '\r']) => Err(FormatError::Unrepresentable {
                kind: ConfigKind::Env,
                key: key.to_string(),
                reason: "line breaks would split the entry".to_string(),
            }),
            Value::Boolean(_) | Value::Integer(_) | Value::Float(_) | Value::String(_) => {
                Ok(value.to_string())
            }
            Value::Sequence(_) | Value::Mapping(_) => Err(FormatError::Unrepresentable {
                kind: ConfigKind::Env,
                key: key.to_string(),
                reason: "nested values have no KEY=value form".to_string(),
            }),
        }
    }
}

impl FormatAdapter for EnvFormat {
    fn kind(&self) -> ConfigKind {
        ConfigKind::Env
    }

    fn parse(&self, text: &str) -> Result<Mapping, FormatError> {
        let mut mapping = Mapping::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').unwrap_or((line, ""));
            mapping.insert(
                key.trim().to_string(),
                Value::String(Self::unquote(value).to_string()),
            );
        }

        Ok(mapping)
    }

    fn serialize(&self, mapping: &Mapping, options: &WriteOptions) -> Result<String, FormatError> {
        let mut out = String::new();

        for (key, value) in mapping {
            let rendered = Self::render(key, value)?;
            if options.quote_env_values {
                out.push_str(&format!("{}=\"{}\"\n", key, rendered));
            } else {
                out.push_str(&format!("{}={}\n", key, rendered));
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(ConfigKind::from_path(Path::new("a/b.yml")), Some(ConfigKind::Yaml));
        assert_eq!(ConfigKind::from_path(Path::new("env1.toml")), Some(ConfigKind::Toml));
        assert_eq!(ConfigKind::from_path(Path::new("env1.env")), Some(ConfigKind::Env));
        assert_eq!(ConfigKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(ConfigKind::from_str("YML").unwrap(), ConfigKind::Yaml);
        assert_eq!(ConfigKind::from_str("toml").unwrap(), ConfigKind::Toml);
        assert!(ConfigKind::from_str("ini").is_err());
    }

    #[test]
    fn test_blank_nulls_rewrites_mapping_and_sequence_entries() {
        let rendered = "foo: null\nbar:\n- null\n- 1\nbaz: 'null'\n";
        assert_eq!(
            YamlFormat::blank_nulls(rendered),
            "foo:\nbar:\n-\n- 1\nbaz: 'null'\n"
        );
    }

    #[test]
    fn test_blank_nulls_skips_block_scalars() {
        let rendered = "motd: |-\n  a: null\n  b\nafter: null\n";
        assert_eq!(
            YamlFormat::blank_nulls(rendered),
            "motd: |-\n  a: null\n  b\nafter:\n"
        );
    }

    #[test]
    fn test_env_parse_splits_on_first_equals() {
        let mapping = EnvFormat
            .parse("A=1\n\nB=x=y=z\n# comment\nC=\"quoted value\"\nD\n")
            .unwrap();

        assert_eq!(mapping["A"], Value::String("1".to_string()));
        assert_eq!(mapping["B"], Value::String("x=y=z".to_string()));
        assert_eq!(mapping["C"], Value::String("quoted value".to_string()));
        assert_eq!(mapping["D"], Value::String(String::new()));
        assert_eq!(mapping.len(), 4);
    }

    #[test]
    fn test_env_serialize_quoting() {
        let mut mapping = Mapping::new();
        mapping.insert("MC_TYPE".to_string(), "FABRIC".into());
        mapping.insert("PORT".to_string(), Value::Integer(25577));

        let quoted = EnvFormat.serialize(&mapping, &WriteOptions::default()).unwrap();
        assert_eq!(quoted, "MC_TYPE=\"FABRIC\"\nPORT=\"25577\"\n");

        let bare = EnvFormat
            .serialize(&mapping, &WriteOptions { quote_env_values: false })
            .unwrap();
        assert_eq!(bare, "MC_TYPE=FABRIC\nPORT=25577\n");
    }

    #[test]
    fn test_env_rejects_nested_values() {
        let mut mapping = Mapping::new();
        mapping.insert("LIST".to_string(), Value::Sequence(vec![]));

        let err = EnvFormat
            .serialize(&mapping, &WriteOptions::default())
            .unwrap_err();
        assert!(matches!(err, FormatError::Unrepresentable { .. }));
        assert_eq!(err.category(), ErrorCategory::MalformedInput);
    }

    #[test]
    fn test_toml_drops_nulls() {
        let mut mapping = Mapping::new();
        mapping.insert("kept".to_string(), "yes".into());
        mapping.insert("dropped".to_string(), Value::Null);

        let text = TomlFormat.serialize(&mapping, &WriteOptions::default()).unwrap();
        let reparsed = TomlFormat.parse(&text).unwrap();

        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed["kept"], Value::String("yes".to_string()));
    }

    #[test]
    fn test_yaml_root_must_be_mapping() {
        assert!(YamlFormat.parse("- a\n- b\n").is_err());
        assert!(YamlFormat.parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_or_empty_degrades() {
        let mapping = YamlFormat.parse_or_empty("foo: [unclosed", "inline");
        assert!(mapping.is_empty());

        let mapping = TomlFormat.parse_or_empty("= nope", "inline");
        assert!(mapping.is_empty());
    }
}
