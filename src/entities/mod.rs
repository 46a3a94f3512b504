pub mod consolation_offers;
pub mod discount_coupons;
pub mod magic_box_campaigns;
pub mod magic_box_openings;
pub mod magic_box_prizes;
pub mod magic_boxes;
pub mod subscription_types;
pub mod user_entitlements;

pub use consolation_offers as consolation_offer_entity;
pub use discount_coupons as discount_coupon_entity;
pub use discount_coupons::CouponSource;
pub use magic_box_campaigns as campaign_entity;
pub use magic_box_openings as opening_entity;
pub use magic_box_prizes as prize_entity;
pub use magic_box_prizes::PrizeType;
pub use magic_boxes as box_entity;
pub use subscription_types as subscription_type_entity;
pub use user_entitlements as entitlement_entity;
