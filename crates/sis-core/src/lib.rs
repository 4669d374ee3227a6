//! # sis-core
//!
//! Core crate for the school information system auth layer. Contains the
//! configuration schema, the unified error system, and the structured denial
//! handed to whatever transport sits in front of the gates.
//!
//! This crate has **no** internal dependencies on other SIS crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::{AppError, Denial, ErrorKind};
pub use result::AppResult;
