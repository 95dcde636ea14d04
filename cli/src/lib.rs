//! Command line client for the Lightning assets daemon

mod commands;

pub use commands::*;
