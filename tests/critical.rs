//! Critical failure-path tests: interrupted transfers, cancellation, credential handling.
//!
//! Run with: `cargo test --test critical`

mod support;

#[path = "critical/interrupted_operations.rs"]
mod interrupted_operations;
#[path = "critical/network_failures.rs"]
mod network_failures;
#[path = "critical/credential_leakage.rs"]
mod credential_leakage;
