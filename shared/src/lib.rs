//! Shared types for the Warehouse Inventory Platform
//!
//! This crate contains framework-free domain types shared between the
//! backend and any future clients: pagination, role levels, and input
//! validation rules.

pub mod roles;
pub mod types;
pub mod validation;

pub use roles::*;
pub use types::*;
pub use validation::*;
