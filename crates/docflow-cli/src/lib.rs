//! Library half of the `docflow` binary, so command handlers can be
//! exercised directly from integration tests.

pub mod commands;
