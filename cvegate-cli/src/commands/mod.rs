//! Command handlers -- one module per subcommand

pub mod check;
pub mod config;
