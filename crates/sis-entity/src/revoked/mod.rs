//! Revocation domain entities.

pub mod model;
pub mod reason;

pub use model::RevokedToken;
pub use reason::RevocationReason;
