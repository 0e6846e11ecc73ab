//! HTTP handlers for the Warehouse Inventory Platform

pub mod auth;
pub mod health;
pub mod movement;
pub mod product;
pub mod user;
pub mod warehouse;

pub use auth::*;
pub use health::*;
pub use movement::*;
pub use product::*;
pub use user::*;
pub use warehouse::*;
