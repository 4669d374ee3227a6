//! # sis-database
//!
//! PostgreSQL connection management, schema migrations, the collaborator
//! traits the auth core talks to, and two implementations of them: Postgres
//! repositories for production and an in-memory store for tests and local
//! runs.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
mod rules;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{
    AccountConflicts, AccountStore, PermissionStore, PermissionUnitOfWork, PurgeReport,
    RevocationStore,
};
