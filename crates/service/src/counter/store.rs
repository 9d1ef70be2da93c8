use crate::errors::StoreError;
use async_trait::async_trait;

/// Trait abstraction for visit counter storage.
///
/// Implementations serialize all operations on their record: no two
/// `increment` calls may observe the same previous value.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Make sure the record exists (created with count 0); returns the stored count.
    async fn initialize(&self) -> Result<u64, StoreError>;
    /// Add one, persist durably, return the new count.
    async fn increment(&self) -> Result<u64, StoreError>;
    /// Current persisted count.
    async fn read(&self) -> Result<u64, StoreError>;
}
