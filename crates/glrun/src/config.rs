//! # Harness configuration
//!
//! Read from JSON. Every field has a default, and the defaults reproduce the
//! stock map viewer: `index.wasm`, a 16 KiB staging window exported as
//! `global_chunk`, point data then metadata.
//!
//! ```json
//! {
//!   "module": "index.wasm",
//!   "payloads": [
//!     { "uri": "map_data.bin", "export": "pushMapData" },
//!     { "uri": "map_data.json", "export": "pushMetadata" }
//!   ],
//!   "flags": [{ "name": "setDebugPath", "on": true }]
//! }
//! ```

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Default staging window size in bytes.
pub const STAGING_CAPACITY: u32 = 16384;

#[derive(Debug)]
pub enum Error {
    Io(PathBuf, std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "failed to read config {}: {}", path.display(), e),
            Self::Parse(e) => write!(f, "failed to parse config: {}", e),
            Self::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Resource limits for a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budget {
    /// Largest the guest's linear memory may grow to.
    pub memory_bytes: usize,
}

impl Budget {
    pub fn standard() -> Self {
        Self {
            memory_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::standard()
    }
}

/// One bulk payload: where to get it and which export consumes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub uri: String,
    pub export: String,
}

impl Payload {
    pub fn new(uri: impl Into<String>, export: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            export: export.into(),
        }
    }
}

/// A boolean export and the value it is called with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub name: String,
    pub on: bool,
}

impl Flag {
    pub fn new(name: impl Into<String>, on: bool) -> Self {
        Self { name: name.into(), on }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Path of the guest module, relative to the payload root.
    pub module: PathBuf,
    /// Name of the `i32` global holding the staging region's address.
    pub staging_export: String,
    pub staging_capacity: u32,
    /// Loaded in order, each to completion before the next starts.
    pub payloads: Vec<Payload>,
    /// Width over height, passed to `init`.
    pub aspect: f32,
    /// Boolean exports called in this order after `init`.
    pub flags: Vec<Flag>,
    pub budget: Budget,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let flags = ["setDebugWayFinding", "setDebugPointNeighbors", "setDebugPath"]
            .into_iter()
            .map(|name| Flag::new(name, false))
            .collect();
        Self {
            module: PathBuf::from("index.wasm"),
            staging_export: "global_chunk".to_string(),
            staging_capacity: STAGING_CAPACITY,
            payloads: vec![
                Payload::new("map_data.bin", "pushMapData"),
                Payload::new("map_data.json", "pushMetadata"),
            ],
            aspect: 1.0,
            flags,
            budget: Budget::default(),
        }
    }
}

impl HarnessConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(Error::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.staging_capacity == 0 {
            return Err(Error::Invalid("staging_capacity must be positive".into()));
        }
        if !(self.aspect.is_finite() && self.aspect > 0.0) {
            return Err(Error::Invalid(format!("aspect {} is not a positive number", self.aspect)));
        }
        if let Some(p) = self.payloads.iter().find(|p| p.export.is_empty()) {
            return Err(Error::Invalid(format!("payload '{}' has no consume export", p.uri)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = HarnessConfig::from_json("{}").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.staging_capacity, 16384);
        assert_eq!(config.payloads[0], Payload::new("map_data.bin", "pushMapData"));
        let names: Vec<&str> = config.flags.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["setDebugWayFinding", "setDebugPointNeighbors", "setDebugPath"]);
        assert!(config.flags.iter().all(|f| !f.on));
    }

    #[test]
    fn test_flags_keep_file_order() {
        let config = HarnessConfig::from_json(
            r#"{ "flags": [
                { "name": "setDebugPath", "on": true },
                { "name": "setDebugWayFinding", "on": false }
            ] }"#,
        )
        .unwrap();
        assert_eq!(
            config.flags,
            vec![Flag::new("setDebugPath", true), Flag::new("setDebugWayFinding", false)]
        );
    }

    #[test]
    fn test_partial_override() {
        let config = HarnessConfig::from_json(
            r#"{
                "staging_capacity": 4096,
                "payloads": [{ "uri": "tiles.bin", "export": "pushTiles" }],
                "flags": [{ "name": "setDebugPath", "on": true }],
                "budget": { "memory_bytes": 1048576 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.staging_capacity, 4096);
        assert_eq!(config.payloads, vec![Payload::new("tiles.bin", "pushTiles")]);
        assert_eq!(config.flags, vec![Flag::new("setDebugPath", true)]);
        assert_eq!(config.budget.memory_bytes, 1 << 20);
        assert_eq!(config.staging_export, "global_chunk");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            HarnessConfig::from_json(r#"{ "staging_capacity": 0 }"#),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            HarnessConfig::from_json(r#"{ "aspect": -2.0 }"#),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            HarnessConfig::from_json(r#"{ "payloads": [{ "uri": "x" }] }"#),
            Err(Error::Parse(_))
        ));
    }
}
