//! All integration tests for sluice
#![expect(
    clippy::unwrap_used,
    reason = "integration test crate: unwraps are fine in test code"
)]

mod common;
mod sluice_src;
