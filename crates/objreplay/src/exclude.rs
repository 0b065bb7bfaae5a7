//! Exclusion list for objects that must not be replayed.
//!
//! The list is a file of concatenated, sorted, fixed-width binary digests.
//! It is loaded fully into memory and membership is answered with a binary
//! search over the flat byte array, so a list of tens of millions of
//! digests costs one allocation and O(log n) lookups.

use std::path::Path;

use tracing::info;

use objreplay_store::{ObjectId, ID_SIZE};

use crate::error::{Error, Result};

/// A sorted set of excluded object digests.
#[derive(Debug, Clone, Default)]
pub struct HashFilter {
    /// Concatenated sorted digests, `count * ID_SIZE` bytes.
    array: Vec<u8>,
    /// Number of digests in the array.
    count: usize,
}

impl HashFilter {
    /// Create an empty filter that excludes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a filter from a list of ids (sorted internally).
    #[must_use]
    pub fn from_ids(mut ids: Vec<ObjectId>) -> Self {
        ids.sort_unstable();
        let mut array = Vec::with_capacity(ids.len() * ID_SIZE);
        for id in &ids {
            array.extend_from_slice(id.as_bytes());
        }
        Self {
            count: ids.len(),
            array,
        }
    }

    /// Load a filter from a file of sorted concatenated digests.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its size is not a
    /// multiple of the digest width.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let array = std::fs::read(path)?;
        if array.len() % ID_SIZE != 0 {
            return Err(Error::ExcludeFileTruncated {
                path: path.to_path_buf(),
                size: array.len() as u64,
            });
        }

        let count = array.len() / ID_SIZE;
        info!("loaded {} excluded digests from {}", count, path.display());
        Ok(Self { array, count })
    }

    /// Number of digests in the filter.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check whether the filter is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Get the digest at the given position.
    fn digest_at(&self, position: usize) -> &[u8] {
        &self.array[position * ID_SIZE..(position + 1) * ID_SIZE]
    }

    /// Check whether an object id is in the filter.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        let needle: &[u8] = id.as_bytes();
        let mut left = 0;
        let mut right = self.count;
        while left < right {
            let middle = left + (right - left) / 2;
            match self.digest_at(middle).cmp(needle) {
                std::cmp::Ordering::Equal => return true,
                std::cmp::Ordering::Less => left = middle + 1,
                std::cmp::Ordering::Greater => right = middle,
            }
        }
        false
    }
}
