//! # sis-entity
//!
//! Domain entity models for the school information system auth core. Every
//! struct in this crate represents a database row or a domain value object.
//! Row types derive `sqlx::FromRow`; enums map onto Postgres enum types.

pub mod admin;
pub mod permission;
pub mod profile;
pub mod revoked;
pub mod user;
