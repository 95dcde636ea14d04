//! Lightning Assets Client Contract Store
//! 
//! Durable, transactional storage of contract records keyed by contract id.
//! A record is present exactly while its contract is proposed and not yet
//! closed.

pub mod store;
pub mod memory;
pub mod persistent;

pub use store::*;
pub use memory::*;
pub use persistent::*;
