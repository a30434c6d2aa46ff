//! Integration tests for sqlbridge-core
//!
//! Drives the connection registry and both hooks against in-memory stub
//! backends that count every call they receive.

mod common;

mod test_registry;
mod test_sqlite_hook;
mod test_storage_hook;
