//! Probe surface of the optimization engine's storage backends.
//!
//! The engine owns trial persistence; this crate only needs enough of the
//! backend to classify it and to hand back a reproducible reference.  Rather
//! than dispatching over the engine's concrete types, consumers probe three
//! attributes: a canonical name, an optional connection URL, and an optional
//! wrapped inner backend (for caching layers).

use std::fmt;

/// Attribute-probe contract for a study's storage backend handle.
pub trait StorageBackend: Send + Sync {
    /// Canonical backend name, e.g. "InMemoryStorage" or "RDBStorage".
    fn backend_name(&self) -> &str;

    /// Connection string, for backends reachable by URL.  `None` for
    /// ephemeral backends and for handles from library versions that no
    /// longer expose it.
    fn url(&self) -> Option<&str> {
        None
    }

    /// The wrapped underlying backend, for caching layers.
    fn inner(&self) -> Option<&dyn StorageBackend> {
        None
    }
}

impl fmt::Debug for dyn StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageBackend({})", self.backend_name())
    }
}

/// In-process storage with no durable location.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage;

impl StorageBackend for InMemoryStorage {
    fn backend_name(&self) -> &str {
        "InMemoryStorage"
    }
}

/// Direct relational store addressed by a connection string.
#[derive(Debug, Clone)]
pub struct RdbStorage {
    pub url: String,
}

impl RdbStorage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl StorageBackend for RdbStorage {
    fn backend_name(&self) -> &str {
        "RDBStorage"
    }

    fn url(&self) -> Option<&str> {
        Some(&self.url)
    }
}

/// Caching layer wrapping a canonical store.
pub struct CachedStorage {
    pub backend: Box<dyn StorageBackend>,
}

impl CachedStorage {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }
}

impl StorageBackend for CachedStorage {
    fn backend_name(&self) -> &str {
        "CachedStorage"
    }

    fn inner(&self) -> Option<&dyn StorageBackend> {
        Some(self.backend.as_ref())
    }
}

/// Key-value remote store.
#[derive(Debug, Clone)]
pub struct RedisStorage {
    pub url: String,
}

impl RedisStorage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl StorageBackend for RedisStorage {
    fn backend_name(&self) -> &str {
        "RedisStorage"
    }

    fn url(&self) -> Option<&str> {
        Some(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_storage_unwraps_to_backend() {
        let cached = CachedStorage::new(Box::new(RdbStorage::new("postgresql://db/studies")));
        assert_eq!(cached.backend_name(), "CachedStorage");

        let inner = cached.inner().unwrap();
        assert_eq!(inner.backend_name(), "RDBStorage");
        assert_eq!(inner.url(), Some("postgresql://db/studies"));
    }

    #[test]
    fn in_memory_has_no_url() {
        let storage = InMemoryStorage;
        assert_eq!(storage.backend_name(), "InMemoryStorage");
        assert!(storage.url().is_none());
        assert!(storage.inner().is_none());
    }
}
