//! `objreplay-store` - Object storage abstraction for the content replayer
//!
//! This crate defines the [`ObjStorage`] trait used by the replay pipeline,
//! the [`ObjectId`] content digest type, and the built-in backends
//! (in-memory and path-slicing filesystem).

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod memory;
pub mod pathslicing;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use memory::InMemoryObjStorage;
pub use pathslicing::PathSlicingObjStorage;

/// Size of an object identifier in bytes (SHA-256 digest).
pub const ID_SIZE: usize = 32;

/// A content-addressed object identifier.
///
/// Object ids are the SHA-256 digest of the object bytes. They are
/// rendered as lowercase hex in logs, config files, and journal records.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; ID_SIZE]);

impl ObjectId {
    /// Compute the identifier for the given object bytes.
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; ID_SIZE];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Build an identifier from raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse an identifier from its hex representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s).map_err(|_| StorageError::InvalidId {
            value: s.to_string(),
        })?;
        let bytes: [u8; ID_SIZE] = raw.try_into().map_err(|_| StorageError::InvalidId {
            value: s.to_string(),
        })?;
        Ok(Self(bytes))
    }

    /// Get the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// Get the hex representation of this identifier.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors produced by object storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested object does not exist in the backend.
    ///
    /// Not-found is terminal: callers must not retry it.
    #[error("object {id} not found")]
    NotFound {
        /// Identifier of the missing object.
        id: ObjectId,
    },

    /// An identifier could not be parsed.
    #[error("invalid object id: {value}")]
    InvalidId {
        /// The offending input.
        value: String,
    },

    /// The stored bytes do not hash to the requested identifier.
    #[error("corrupt object {id}: digest mismatch")]
    Corrupt {
        /// Identifier of the corrupt object.
        id: ObjectId,
    },

    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a new backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Check whether this error means the object is missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// An object storage backend.
///
/// Implementations store immutable blobs addressed by their content
/// digest. `add` must be idempotent: storing the same object twice is
/// not an error and must leave the stored bytes unchanged.
#[async_trait::async_trait]
pub trait ObjStorage: Send + Sync {
    /// A short name identifying the backend (for logging).
    fn name(&self) -> &'static str;

    /// Fetch an object by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the object is missing, or
    /// another variant on backend failure.
    async fn get(&self, id: &ObjectId) -> Result<Vec<u8>>;

    /// Store an object under the given id.
    ///
    /// No presence check is performed; an existing object is overwritten
    /// with identical bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure.
    async fn add(&self, id: &ObjectId, data: &[u8]) -> Result<()>;

    /// Check whether an object is present.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure.
    async fn contains(&self, id: &ObjectId) -> Result<bool>;
}

/// Configuration for an object storage backend.
///
/// The `cls` tag selects the backend, mirroring how backends are named
/// in config files:
///
/// ```toml
/// [src]
/// cls = "pathslicing"
/// root = "/srv/objects"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cls", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-process map backend.
    Memory,
    /// Filesystem backend with digest-prefix directory slicing.
    Pathslicing {
        /// Root directory holding the sliced object tree.
        root: PathBuf,
        /// Number of two-character prefix levels (defaults to 3).
        #[serde(default = "default_slicing_depth")]
        depth: usize,
    },
}

/// Default number of directory levels for the pathslicing backend.
fn default_slicing_depth() -> usize {
    3
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory
    }
}

/// Build a storage backend from its configuration.
///
/// # Errors
///
/// Returns an error if the backend cannot be initialized, such as when
/// the pathslicing root cannot be created.
pub fn get_objstorage(config: &StoreConfig) -> Result<Box<dyn ObjStorage>> {
    match config {
        StoreConfig::Memory => Ok(Box::new(InMemoryObjStorage::new())),
        StoreConfig::Pathslicing { root, depth } => Ok(Box::new(PathSlicingObjStorage::new(
            root.clone(),
            *depth,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_from_data_is_stable() {
        let id1 = ObjectId::from_data(b"hello");
        let id2 = ObjectId::from_data(b"hello");
        assert_eq!(id1, id2);

        let other = ObjectId::from_data(b"world");
        assert_ne!(id1, other);
    }

    #[test]
    fn test_object_id_hex_round_trip() {
        let id = ObjectId::from_data(b"some content");
        let hexed = id.to_hex();
        assert_eq!(hexed.len(), 64);

        let parsed = ObjectId::from_hex(&hexed).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_object_id_from_hex_rejects_garbage() {
        assert!(ObjectId::from_hex("not hex").is_err());
        assert!(ObjectId::from_hex("abcd").is_err()); // too short
        let err = ObjectId::from_hex("zz").unwrap_err();
        assert!(err.to_string().contains("invalid object id"));
    }

    #[test]
    fn test_object_id_display_matches_hex() {
        let id = ObjectId::from_data(b"x");
        assert_eq!(id.to_string(), id.to_hex());
    }

    #[test]
    fn test_object_id_debug_contains_hex() {
        let id = ObjectId::from_data(b"x");
        let debug = format!("{id:?}");
        assert!(debug.contains(&id.to_hex()));
    }

    #[test]
    fn test_object_id_serde_as_hex_string() {
        let id = ObjectId::from_data(b"serialized");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));

        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_object_id_ordering_matches_bytes() {
        let a = ObjectId::from_bytes([0u8; ID_SIZE]);
        let b = ObjectId::from_bytes([1u8; ID_SIZE]);
        assert!(a < b);
    }

    #[test]
    fn test_storage_error_is_not_found() {
        let id = ObjectId::from_data(b"gone");
        assert!(StorageError::NotFound { id }.is_not_found());
        assert!(!StorageError::backend("boom").is_not_found());
    }

    #[test]
    fn test_storage_error_display() {
        let id = ObjectId::from_data(b"gone");
        let err = StorageError::NotFound { id };
        assert!(err.to_string().contains(&id.to_hex()));

        let err = StorageError::backend("flaky");
        assert_eq!(err.to_string(), "backend error: flaky");
    }

    #[test]
    fn test_store_config_default_is_memory() {
        assert_eq!(StoreConfig::default(), StoreConfig::Memory);
    }

    #[test]
    fn test_store_config_deserialize_memory() {
        let config: StoreConfig = serde_json::from_str(r#"{"cls": "memory"}"#).unwrap();
        assert_eq!(config, StoreConfig::Memory);
    }

    #[test]
    fn test_store_config_deserialize_pathslicing() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"cls": "pathslicing", "root": "/srv/objects"}"#).unwrap();
        match config {
            StoreConfig::Pathslicing { root, depth } => {
                assert_eq!(root, PathBuf::from("/srv/objects"));
                assert_eq!(depth, 3);
            }
            StoreConfig::Memory => panic!("expected pathslicing config"),
        }
    }

    #[test]
    fn test_get_objstorage_memory() {
        let storage = get_objstorage(&StoreConfig::Memory).unwrap();
        assert_eq!(storage.name(), "memory");
    }
}
