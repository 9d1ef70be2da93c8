use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing record cannot be read or written (I/O, permissions, timeout).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// The record exists but is not `{"count": <non-negative integer>}`.
    #[error("malformed counter record: {0}")]
    MalformedRecord(String),
}

impl StoreError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedRecord(_))
    }
}
