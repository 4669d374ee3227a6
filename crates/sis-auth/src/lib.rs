//! # sis-auth
//!
//! Authentication and authorization core for the school information system.
//!
//! ## Modules
//!
//! - `password`: Argon2id credential hashing
//! - `jwt`: access and refresh token issuance and verification
//! - `cookie`: session cookie construction and extraction
//! - `session`: sign-up/in/out, bootstrap, and per-request authentication
//! - `rbac`: role allow-list and permission gates
//! - `registry`: permission CRUD, grant/revoke, and seed permissions
//! - `assignment`: moving new accounts to a functional role
//! - `payload`: validated request payloads
//! - `state`: the assembled components shared with the transport

pub mod assignment;
pub mod cookie;
pub mod jwt;
pub mod password;
pub mod payload;
pub mod rbac;
pub mod registry;
pub mod session;
pub mod state;

pub use assignment::RoleAssigner;
pub use cookie::CookieFactory;
pub use jwt::{Claims, IssuedToken, TokenCodec, TokenKind};
pub use password::PasswordHasher;
pub use rbac::{PermissionGate, RoleGate};
pub use registry::{PermissionRegistry, SeedSet};
pub use session::{
    Authentication, Authenticator, Identity, RequestContext, SessionManager, SessionStatus,
    SignedSession,
};
pub use state::AuthState;
