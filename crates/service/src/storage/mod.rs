//! Storage abstractions for service layer
//!
//! Contains the file-backed record store shared by services that persist a
//! single small JSON document.

pub mod json_record_store;
