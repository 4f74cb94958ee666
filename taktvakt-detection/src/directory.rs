//! ## taktvakt-detection::directory
//! **Fixed-capacity key/value table shared by the control plane and detection**
//!
//! The control-plane service overwrites slots; the detection service looks
//! keys up while answering queries on another core. Both go through one
//! `RwLock`, so a reader never observes a half-written entry.

use parking_lot::RwLock;
use taktvakt_config::DirectorySeed;
use taktvakt_protocols::{truncate_on_char_boundary, MAX_FIELD_LEN};

use crate::error::DetectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub key: String,
    pub value: String,
}

impl DirectoryEntry {
    /// Both fields are cut to [`MAX_FIELD_LEN`] bytes.
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: truncate_on_char_boundary(key, MAX_FIELD_LEN).to_owned(),
            value: truncate_on_char_boundary(value, MAX_FIELD_LEN).to_owned(),
        }
    }
}

#[derive(Debug)]
pub struct Directory {
    slots: RwLock<Vec<DirectoryEntry>>,
}

impl Directory {
    /// A table of `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(vec![DirectoryEntry::new("", ""); capacity]),
        }
    }

    /// A table whose first slots hold `seeds`, in order.
    pub fn seeded(capacity: usize, seeds: &[DirectorySeed]) -> Result<Self, DetectionError> {
        if seeds.len() > capacity {
            return Err(DetectionError::TooManySeeds {
                seeds: seeds.len(),
                capacity,
            });
        }
        let directory = Self::new(capacity);
        {
            let mut slots = directory.slots.write();
            for (slot, seed) in slots.iter_mut().zip(seeds) {
                *slot = DirectoryEntry::new(&seed.key, &seed.value);
            }
        }
        Ok(directory)
    }

    pub fn capacity(&self) -> usize {
        self.slots.read().len()
    }

    /// Value of the first slot whose key equals `key` exactly.
    pub fn lookup(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        self.slots
            .read()
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.clone())
    }

    /// Overwrites slot `index`.
    pub fn update_slot(&self, index: usize, key: &str, value: &str) -> Result<(), DetectionError> {
        let mut slots = self.slots.write();
        let capacity = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or(DetectionError::SlotOutOfRange { index, capacity })?;
        *slot = DirectoryEntry::new(key, value);
        Ok(())
    }

    /// Consistent copy of every slot, in slot order.
    pub fn snapshot(&self) -> Vec<DirectoryEntry> {
        self.slots.read().clone()
    }
}
