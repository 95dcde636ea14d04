//! Contract lifecycle module for the Lightning assets client
//! 
//! Implements the client side of asset contracts:
//! - Proposing contracts and decoding their terms
//! - Funding contracts by paying margin and init invoices
//! - Closing contracts with the remote service
//! - Broadcasting contract updates to subscribers

pub mod manager;
pub mod hub;
pub mod prices;
pub mod lnd;
pub mod remote;

pub use manager::*;
pub use hub::*;
pub use prices::*;
pub use lnd::*;
pub use remote::*;
