//! Business logic services for the Warehouse Inventory Platform

pub mod auth;
pub mod movement;
pub mod product;
pub mod user;
pub mod warehouse;

pub use auth::AuthService;
pub use movement::MovementService;
pub use product::ProductService;
pub use user::UserService;
pub use warehouse::WarehouseService;
