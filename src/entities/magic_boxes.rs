use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 盒子实体
/// - is_opened 只会从 false 变为 true 一次
/// - won_prize_id 仅在抽中实际奖品时写入，写入后不再变化
/// - 以上字段只由开盒服务写入
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "magic_boxes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: i64,
    pub is_opened: bool,
    pub opened_at: Option<DateTime<Utc>>,
    pub won_prize_id: Option<i64>,
    /// 未中奖时用户领取的安慰优惠
    pub consolation_offer_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
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
