//! Sweep job implementations.

pub mod purge;
pub mod revocation;

pub use purge::AccountPurgeJob;
pub use revocation::RevocationSweepJob;
