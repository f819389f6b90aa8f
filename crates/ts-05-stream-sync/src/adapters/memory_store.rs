//! In-memory stream store.

use parking_lot::RwLock;
use shared_types::{ItemSize, StoreError};

use crate::ports::StreamStore;

/// Items `base..base + len` held in memory.
#[derive(Debug)]
pub struct MemoryStreamStore<I> {
    base: u64,
    items: RwLock<Vec<I>>,
}

impl<I> MemoryStreamStore<I> {
    /// Empty store whose first index is `base`.
    pub fn new(base: u64) -> Self {
        Self::with_items(base, Vec::new())
    }

    /// Store pre-filled with `items` at `base..`.
    pub fn with_items(base: u64, items: Vec<I>) -> Self {
        Self {
            base,
            items: RwLock::new(items),
        }
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl<I: Clone> MemoryStreamStore<I> {
    /// Item at `index`.
    pub fn get(&self, index: u64) -> Option<I> {
        let offset = index.checked_sub(self.base)?;
        self.items.read().get(offset as usize).cloned()
    }

    /// Copy of every item.
    pub fn items(&self) -> Vec<I> {
        self.items.read().clone()
    }
}

impl<I> StreamStore<I> for MemoryStreamStore<I>
where
    I: ItemSize + Clone + PartialEq + Send + Sync,
{
    fn next_index(&self) -> u64 {
        self.base + self.items.read().len() as u64
    }

    fn read_range(&self, from: u64, max_count: u64, max_size: u64) -> Vec<I> {
        let Some(offset) = from.checked_sub(self.base) else {
            return Vec::new();
        };
        let items = self.items.read();
        let mut out = Vec::new();
        let mut size = 0u64;
        for item in items.iter().skip(offset as usize).take(max_count as usize) {
            size = size.saturating_add(item.encoded_size());
            if !out.is_empty() && size > max_size {
                break;
            }
            out.push(item.clone());
        }
        out
    }

    fn apply(&self, start: u64, items: Vec<I>) -> Result<(), StoreError> {
        let mut held = self.items.write();
        let next = self.base + held.len() as u64;
        if start > next {
            return Err(StoreError::Gap { start, next });
        }

        let mut fresh = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let index = start + i as u64;
            if index < self.base {
                continue;
            }
            if index < next {
                if held[(index - self.base) as usize] != item {
                    return Err(StoreError::Conflict { index });
                }
            } else {
                fresh.push(item);
            }
        }
        held.extend(fresh);
        Ok(())
    }
}
