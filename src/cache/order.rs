//! Creation Order Module
//!
//! Tracks the order in which keys were (re)written so size-bound eviction can
//! drop the oldest entries without recording access times.

use std::collections::VecDeque;

// == Creation Order ==
/// Keys ordered by write time.
///
/// - Front = oldest write
/// - Back = newest write
///
/// Reads never reorder keys; only a write (including an overwrite) moves a
/// key to the back.
#[derive(Debug, Default)]
pub struct CreationOrder {
    order: VecDeque<String>,
}

impl CreationOrder {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Record Write ==
    /// Marks `key` as the most recently written.
    pub fn record_write(&mut self, key: &str) {
        self.remove(key);
        self.order.push_back(key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Pop Oldest ==
    /// Returns and forgets the oldest written key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.front()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
