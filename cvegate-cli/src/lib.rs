//! cvegate command-line tool.
//!
//! The binary in `main.rs` is a thin dispatcher; the library exposes the
//! command handlers for integration testing.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
