pub mod campaign_service;
pub mod consolation_service;
pub mod coupon_service;
pub mod distribution_service;
pub mod entitlement_service;
pub mod magic_box_service;
pub mod prize_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use campaign_service::*;
pub use consolation_service::*;
pub use coupon_service::*;
pub use distribution_service::*;
pub use entitlement_service::*;
pub use magic_box_service::*;
pub use prize_service::*;
