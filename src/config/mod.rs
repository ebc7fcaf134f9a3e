//! Format-agnostic configuration handling
//!
//! # Data Flow
//! ```text
//! file on disk (YAML / TOML / KEY=value)
//!     → finder.rs (walk up from a base directory)
//!     → format.rs (adapter parses text into a plain Mapping)
//!     → node.rs (Mapping classified into an immutable ConfigNode)
//!     → loader.rs (LoadedConfig memoized in a ConfigCache)
//!
//! On write:
//!     ConfigNode::as_mapping() snapshot
//!     → caller edits the Mapping (value.rs set_path)
//!     → writer.rs (adapter serializes, header prepended, file replaced, chmod)
//! ```

pub mod finder;
pub mod format;
pub mod loader;
pub mod node;
pub mod value;
pub mod writer;

pub use finder::{ConfigFinder, FinderError};
pub use format::{ConfigKind, EnvFormat, FormatAdapter, FormatError, TomlFormat, WriteOptions, YamlFormat};
pub use loader::{ConfigCache, ConfigError, LoadedConfig};
pub use node::{ConfigNode, ConfigValue, Scalar};
pub use value::{get_path, set_path, Mapping, Value};
pub use writer::{ConfigWriter, DEFAULT_FILE_MODE};
