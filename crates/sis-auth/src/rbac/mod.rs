//! Role and permission gates.

pub mod permission_gate;
pub mod role_gate;

pub use permission_gate::PermissionGate;
pub use role_gate::RoleGate;
