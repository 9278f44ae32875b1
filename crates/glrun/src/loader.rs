//! Resolves payload URIs to byte sources.
//!
//! A [`Loader`] plays the part `fetch` plays in a browser: it turns a name
//! like `map_data.bin` into a stream. The streaming bridge never sees URIs.

use std::collections::HashMap;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::source;
use crate::source::ByteSource;
use crate::source::MemorySource;
use crate::source::ReaderSource;

#[async_trait::async_trait]
pub trait Loader: Send + Sync {
    /// Opens the payload named by `uri`.
    async fn open(&self, uri: &str) -> source::Result<Box<dyn ByteSource>>;
}

/// Serves payloads from files under a root directory.
///
/// URIs are relative paths. Absolute paths and `..` components are
/// rejected so a config can't reach outside the root.
#[derive(Clone, Debug)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, uri: &str) -> source::Result<PathBuf> {
        let rel = Path::new(uri);
        let contained = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if uri.is_empty() || !contained {
            return Err(source::Error::InvalidUri(uri.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait::async_trait]
impl Loader for DirLoader {
    async fn open(&self, uri: &str) -> source::Result<Box<dyn ByteSource>> {
        let path = self.resolve(uri)?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(ReaderSource::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(source::Error::NotFound(uri.to_string()))
            }
            Err(e) => Err(source::Error::Io(e)),
        }
    }
}

/// Serves payloads from memory. Each `open` starts a fresh stream.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(uri.into(), bytes.into());
    }

    pub fn with(mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, bytes);
        self
    }
}

#[async_trait::async_trait]
impl Loader for MemoryLoader {
    async fn open(&self, uri: &str) -> source::Result<Box<dyn ByteSource>> {
        let bytes = self
            .entries
            .get(uri)
            .ok_or_else(|| source::Error::NotFound(uri.to_string()))?;
        Ok(Box::new(MemorySource::new(bytes.clone())))
    }
}
