use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 开盒活动实体
/// 删除活动时级联删除奖品、盒子、开盒记录与安慰优惠
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "magic_box_campaigns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub starts_at: DateTime<Utc>,
    /// NULL = 无结束时间
    pub ends_at: Option<DateTime<Utc>>,
    /// 每个用户最多可参与（被分配盒子）的次数
    pub max_participations_per_user: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 活动已过结束时间
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|end| end <= now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::magic_box_prizes::Entity")]
    Prizes,
    #[sea_orm(has_many = "super::magic_boxes::Entity")]
    Boxes,
}

impl Related<super::magic_box_prizes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Prizes.def()
    }
}

impl Related<super::magic_boxes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Boxes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
