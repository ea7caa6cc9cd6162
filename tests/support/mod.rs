//! Shared helpers for integration tests.

pub mod raw_server;
