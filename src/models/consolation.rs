use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::consolation_offer_entity;
use crate::error::{AppError, AppResult};

use super::{DiscountCouponResponse, prize::validate_discount_percentage};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateConsolationOfferRequest {
    pub title: String,
    pub description: Option<String>,
    /// 0-100
    pub discount_percentage: i32,
}

impl CreateConsolationOfferRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() || self.title.len() > 255 {
            return Err(AppError::ValidationError(
                "Title must be between 1 and 255 characters".into(),
            ));
        }
        validate_discount_percentage(self.discount_percentage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConsolationOfferResponse {
    pub id: i64,
    pub campaign_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub discount_percentage: i32,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<consolation_offer_entity::Model> for ConsolationOfferResponse {
    fn from(m: consolation_offer_entity::Model) -> Self {
        ConsolationOfferResponse {
            id: m.id,
            campaign_id: m.campaign_id,
            title: m.title,
            description: m.description,
            discount_percentage: m.discount_percentage,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AcceptConsolationRequest {
    pub offer_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AcceptConsolationResponse {
    pub offer: ConsolationOfferResponse,
    pub coupon: DiscountCouponResponse,
}
