//! Scheduler test suite.
//!
//! These tests drive the real global scheduler state, so every test that
//! touches it is `#[serial]` and starts by re-initializing through
//! `helpers::boot`.

pub mod helpers;

mod core_request;
mod provision;
