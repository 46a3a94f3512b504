use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{CouponSource, discount_coupon_entity};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DiscountCouponResponse {
    pub id: i64,
    pub code: String,
    pub discount_percentage: i32,
    pub source: CouponSource,
    pub box_id: Option<i64>,
    pub is_used: bool,
    pub expires_at: DateTime<Utc>,
}

impl From<discount_coupon_entity::Model> for DiscountCouponResponse {
    fn from(m: discount_coupon_entity::Model) -> Self {
        DiscountCouponResponse {
            id: m.id,
            code: m.code,
            discount_percentage: m.discount_percentage,
            source: m.source,
            box_id: m.box_id,
            is_used: m.is_used,
            expires_at: m.expires_at,
        }
    }
}
