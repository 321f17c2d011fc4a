//! berth-cli: Command-line interface for berth
//!
//! Provides the `berth` CLI, which runs Compose projects together with the
//! synchronization and forwarding sessions declared in their `x-berth`
//! block.

pub mod commands;
pub mod output;
