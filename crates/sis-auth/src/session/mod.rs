//! Sessions: lifecycle management and per-request authentication.

pub mod authenticator;
pub mod context;
pub mod manager;

pub use authenticator::{Authentication, Authenticator, Identity, SessionStatus};
pub use context::RequestContext;
pub use manager::{SessionManager, SignedSession};
