use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 奖品类型
/// - try_again / nothing: 未中奖，不扣减库存
/// - custom: 线下兑现的自定义奖品，不自动发放
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum PrizeType {
    #[sea_orm(string_value = "subscription")]
    Subscription,
    #[sea_orm(string_value = "discount_coupon")]
    DiscountCoupon,
    #[sea_orm(string_value = "visit_package")]
    VisitPackage,
    #[sea_orm(string_value = "videocall_package")]
    VideocallPackage,
    #[sea_orm(string_value = "try_again")]
    TryAgain,
    #[sea_orm(string_value = "nothing")]
    Nothing,
    #[sea_orm(string_value = "custom")]
    Custom,
}

impl PrizeType {
    /// A draw of this type counts as a win and consumes stock.
    pub fn is_win(&self) -> bool {
        !matches!(self, PrizeType::TryAgain | PrizeType::Nothing)
    }
}

impl std::fmt::Display for PrizeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrizeType::Subscription => write!(f, "subscription"),
            PrizeType::DiscountCoupon => write!(f, "discount_coupon"),
            PrizeType::VisitPackage => write!(f, "visit_package"),
            PrizeType::VideocallPackage => write!(f, "videocall_package"),
            PrizeType::TryAgain => write!(f, "try_again"),
            PrizeType::Nothing => write!(f, "nothing"),
            PrizeType::Custom => write!(f, "custom"),
        }
    }
}

/// 开盒奖品配置实体
/// - weight: 相对权重，概率 = weight / 同活动有库存奖品权重之和
/// - quantity: 初始库存；remaining_quantity: 剩余库存，只减不增
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "magic_box_prizes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub campaign_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub prize_type: PrizeType,
    pub weight: i32,
    pub quantity: i32,
    pub remaining_quantity: i32,
    /// 订阅类奖品关联的订阅类型
    pub subscription_type_id: Option<i64>,
    /// 折扣百分比 (0-100)
    pub discount_percentage: Option<i32>,
    pub visit_count: Option<i32>,
    pub videocall_count: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 是否还有库存
    pub fn is_available(&self) -> bool {
        self.remaining_quantity > 0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::magic_box_campaigns::Entity",
        from = "Column::CampaignId",
        to = "super::magic_box_campaigns::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Campaign,
}

impl Related<super::magic_box_campaigns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
