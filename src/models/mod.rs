pub mod auth;
pub mod campaign;
pub mod common;
pub mod consolation;
pub mod coupon;
pub mod entitlement;
pub mod magic_box;
pub mod pagination;
pub mod prize;

pub use auth::*;
pub use campaign::*;
pub use common::*;
pub use consolation::*;
pub use coupon::*;
pub use entitlement::*;
pub use magic_box::*;
pub use pagination::*;
pub use prize::*;
