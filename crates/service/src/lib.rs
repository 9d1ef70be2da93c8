//! Service layer owning the persisted visit counter.
//! - `counter`: the record type and the `CounterStore` contract
//! - `file`: the JSON file implementation used in production
//! - `storage`: the generic single-record file store underneath it

pub mod errors;
pub mod counter;
pub mod file;
pub mod storage;

pub use counter::{store::CounterStore, CounterRecord};
pub use errors::StoreError;
pub use file::counter_store::FileCounterStore;
