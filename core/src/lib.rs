//! Lightning Assets Client Core Library
//! 
//! Core types, traits, and abstractions for the Lightning assets client.
//! This crate provides the foundation for the contract store, the contract
//! lifecycle manager and the client daemon.

pub mod types;
pub mod traits;
pub mod error;
pub mod config;
pub mod convert;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use config::*;
pub use convert::*;
