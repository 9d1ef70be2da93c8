//! Visit counter domain: the persisted record and the store contract.

pub mod store;

use serde::{Deserialize, Serialize};

/// The sole persisted record: `{"count": N}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub count: u64,
}

impl CounterRecord {
    pub fn incremented(self) -> Option<Self> {
        self.count.checked_add(1).map(|count| Self { count })
    }
}
