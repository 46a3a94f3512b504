use super::magic_box_prizes::PrizeType;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 开盒记录实体
/// - 每个盒子最多一条 (box_id 唯一)
/// - outcome_json 保存返回给客户端的结果快照，用于幂等重放
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "magic_box_openings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub box_id: i64,
    pub campaign_id: i64,
    /// 实际获得奖励的用户（管理员预览时可能不同于盒子所属用户）
    pub user_id: i64,
    pub prize_id: Option<i64>,
    pub prize_type: PrizeType,
    pub won: bool,
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub outcome_json: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
