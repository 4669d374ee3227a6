//! Administrator domain entities.

pub mod model;

pub use model::{AdminProfile, AdminWithGrants};
