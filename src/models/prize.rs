use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{PrizeType, prize_entity};
use crate::error::{AppError, AppResult};
use crate::utils::Weighted;

/// 奖品类型相关的附加字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct PrizePayload {
    pub subscription_type_id: Option<i64>,
    /// 0-100
    pub discount_percentage: Option<i32>,
    pub visit_count: Option<i32>,
    pub videocall_count: Option<i32>,
}

impl PrizePayload {
    /// 按奖品类型校验附加字段
    pub fn validate_for(&self, prize_type: PrizeType) -> AppResult<()> {
        if let Some(pct) = self.discount_percentage {
            validate_discount_percentage(pct)?;
        }
        for count in [self.visit_count, self.videocall_count].into_iter().flatten() {
            if count < 0 {
                return Err(AppError::ValidationError(
                    "Visit and videocall counts cannot be negative".into(),
                ));
            }
        }

        match prize_type {
            PrizeType::Subscription if self.subscription_type_id.is_none() => Err(
                AppError::ValidationError("Subscription prizes need a subscription_type_id".into()),
            ),
            PrizeType::DiscountCoupon if self.discount_percentage.is_none() => Err(
                AppError::ValidationError("Discount prizes need a discount_percentage".into()),
            ),
            PrizeType::VisitPackage if self.visit_count.unwrap_or(0) < 1 => Err(
                AppError::ValidationError("Visit packages need a positive visit_count".into()),
            ),
            PrizeType::VideocallPackage if self.videocall_count.unwrap_or(0) < 1 => {
                Err(AppError::ValidationError(
                    "Videocall packages need a positive videocall_count".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// 创建奖品请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreatePrizeRequest {
    pub name: String,
    pub description: Option<String>,
    pub prize_type: PrizeType,
    /// 相对权重 (>= 1)
    pub weight: i32,
    /// 库存 (>= 1)
    pub quantity: i32,
    #[serde(flatten)]
    pub payload: PrizePayload,
}

impl CreatePrizeRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_prize_name(&self.name)?;
        validate_weight(self.weight)?;
        validate_quantity(self.quantity)?;
        self.payload.validate_for(self.prize_type)
    }
}

/// 更新奖品请求（字段为空则不修改）
/// 修改 quantity 时剩余库存按差值同步调整，且不会小于 0
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdatePrizeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub weight: Option<i32>,
    pub quantity: Option<i32>,
    pub subscription_type_id: Option<i64>,
    pub discount_percentage: Option<i32>,
    pub visit_count: Option<i32>,
    pub videocall_count: Option<i32>,
}

impl UpdatePrizeRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            validate_prize_name(name)?;
        }
        if let Some(weight) = self.weight {
            validate_weight(weight)?;
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }
        Ok(())
    }
}

/// 奖品信息（含展示用概率）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrizeResponse {
    pub id: i64,
    pub campaign_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub prize_type: PrizeType,
    pub weight: i32,
    pub quantity: i32,
    pub remaining_quantity: i32,
    /// 当前中奖概率 (%)，无库存时为 0
    pub probability_pct: f64,
    #[serde(flatten)]
    pub payload: PrizePayload,
    pub created_at: Option<DateTime<Utc>>,
}

impl PrizeResponse {
    pub fn from_model(m: prize_entity::Model, probability_pct: f64) -> Self {
        PrizeResponse {
            id: m.id,
            campaign_id: m.campaign_id,
            name: m.name,
            description: m.description,
            prize_type: m.prize_type,
            weight: m.weight,
            quantity: m.quantity,
            remaining_quantity: m.remaining_quantity,
            probability_pct,
            payload: PrizePayload {
                subscription_type_id: m.subscription_type_id,
                discount_percentage: m.discount_percentage,
                visit_count: m.visit_count,
                videocall_count: m.videocall_count,
            },
            created_at: m.created_at,
        }
    }
}

impl Weighted for prize_entity::Model {
    fn weight(&self) -> u64 {
        if self.is_available() {
            self.weight.max(0) as u64
        } else {
            0
        }
    }
}

pub(crate) fn validate_discount_percentage(pct: i32) -> AppResult<()> {
    if !(0..=100).contains(&pct) {
        return Err(AppError::ValidationError(
            "Discount percentage must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

fn validate_prize_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() || name.len() > 255 {
        return Err(AppError::ValidationError(
            "Prize name must be between 1 and 255 characters".into(),
        ));
    }
    Ok(())
}

fn validate_weight(weight: i32) -> AppResult<()> {
    if weight < 1 {
        return Err(AppError::ValidationError("Weight must be >= 1".into()));
    }
    Ok(())
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::ValidationError("Quantity must be >= 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prize(prize_type: PrizeType) -> CreatePrizeRequest {
        CreatePrizeRequest {
            name: "Free month".into(),
            description: None,
            prize_type,
            weight: 1,
            quantity: 1,
            payload: PrizePayload::default(),
        }
    }

    #[test]
    fn test_weight_and_quantity_bounds() {
        let mut req = prize(PrizeType::Nothing);
        assert!(req.validate().is_ok());
        req.weight = 0;
        assert!(req.validate().is_err());
        req.weight = 1;
        req.quantity = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_discount_range() {
        let mut req = prize(PrizeType::DiscountCoupon);
        assert!(req.validate().is_err(), "missing percentage");
        req.payload.discount_percentage = Some(101);
        assert!(req.validate().is_err());
        req.payload.discount_percentage = Some(-1);
        assert!(req.validate().is_err());
        req.payload.discount_percentage = Some(100);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_subscription_needs_type() {
        let mut req = prize(PrizeType::Subscription);
        assert!(req.validate().is_err());
        req.payload.subscription_type_id = Some(2);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_packages_need_counts() {
        let mut req = prize(PrizeType::VisitPackage);
        assert!(req.validate().is_err());
        req.payload.visit_count = Some(5);
        assert!(req.validate().is_ok());

        let mut req = prize(PrizeType::VideocallPackage);
        req.payload.videocall_count = Some(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_request_accepts_flat_payload_json() {
        let req: CreatePrizeRequest = serde_json::from_str(
            r#"{"name":"10% off","prize_type":"discount_coupon","weight":3,"quantity":20,"discount_percentage":10}"#,
        )
        .unwrap();
        assert_eq!(req.payload.discount_percentage, Some(10));
        assert!(req.validate().is_ok());
    }
}
