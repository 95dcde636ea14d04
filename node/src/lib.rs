//! Lightning assets client daemon
//! 
//! Combines the client components:
//! - Contract store and lifecycle manager
//! - LND payment backend and remote contract service
//! - Price feed
//! - HTTP API

mod api;
mod feed;
mod node;
mod runtime;

pub use api::*;
pub use feed::*;
pub use node::*;
pub use runtime::*;
