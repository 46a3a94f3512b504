use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{PrizeType, box_entity, prize_entity};

use super::AuthUser;

/// 分配盒子请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AssignBoxesRequest {
    pub user_id: i64,
    /// 分配数量 (默认 1)
    pub count: Option<u32>,
}

/// 盒子列表查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct BoxQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub campaign_id: Option<i64>,
    pub user_id: Option<i64>,
    pub is_opened: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MagicBoxResponse {
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: i64,
    pub is_opened: bool,
    pub opened_at: Option<DateTime<Utc>>,
    pub won_prize_id: Option<i64>,
    pub consolation_offer_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<box_entity::Model> for MagicBoxResponse {
    fn from(m: box_entity::Model) -> Self {
        MagicBoxResponse {
            id: m.id,
            campaign_id: m.campaign_id,
            user_id: m.user_id,
            is_opened: m.is_opened,
            opened_at: m.opened_at,
            won_prize_id: m.won_prize_id,
            consolation_offer_id: m.consolation_offer_id,
            created_at: m.created_at,
        }
    }
}

/// 开盒请求体
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct OpenBoxRequest {
    /// 管理员预览时代替盒子所属用户领取奖励
    pub target_user_id: Option<i64>,
    /// 客户端为每次开盒尝试生成的幂等键，重试时保持不变
    pub idempotency_key: Option<String>,
}

/// 开盒命令：调用者显式传入，服务内部不读取任何全局登录状态
#[derive(Debug, Clone)]
pub struct OpenBoxCommand {
    pub box_id: i64,
    pub caller: AuthUser,
    pub target_user_id: Option<i64>,
    pub idempotency_key: Option<String>,
}

impl OpenBoxCommand {
    pub fn new(box_id: i64, caller: AuthUser) -> Self {
        Self {
            box_id,
            caller,
            target_user_id: None,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_target_user(mut self, user_id: i64) -> Self {
        self.target_user_id = Some(user_id);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Won,
    Lost,
}

/// 开盒结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct OpenBoxOutcome {
    pub success: bool,
    pub message: String,
    pub outcome: OutcomeKind,
    pub box_id: i64,
    pub opened_at: DateTime<Utc>,
    /// 该结果来自同一幂等键的重放
    #[serde(default)]
    pub replayed: bool,
    pub prize_type: PrizeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videocall_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_with_existing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_visits_now: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_videocalls_now: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_type_id: Option<i64>,
    /// 订阅附带训练计划，前端需要弹出排期日历
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes_program: Option<bool>,
}

impl OpenBoxOutcome {
    fn base(
        outcome: OutcomeKind,
        message: String,
        box_id: i64,
        opened_at: DateTime<Utc>,
        prize_type: PrizeType,
    ) -> Self {
        OpenBoxOutcome {
            success: true,
            message,
            outcome,
            box_id,
            opened_at,
            replayed: false,
            prize_type,
            prize_id: None,
            prize_name: None,
            prize_description: None,
            discount_percentage: None,
            discount_code: None,
            visit_count: None,
            videocall_count: None,
            merged_with_existing: None,
            total_visits_now: None,
            total_videocalls_now: None,
            subscription_type_id: None,
            includes_program: None,
        }
    }

    /// 未中奖（含 "再来一次" 与无可用奖品）
    pub fn lost(box_id: i64, opened_at: DateTime<Utc>, prize_type: PrizeType) -> Self {
        let message = match prize_type {
            PrizeType::TryAgain => "Not this time, try again with your next box",
            _ => "No prize this time",
        };
        Self::base(
            OutcomeKind::Lost,
            message.to_string(),
            box_id,
            opened_at,
            prize_type,
        )
    }

    /// 中奖，奖励相关字段由开盒服务在发放后补全
    pub fn won(box_id: i64, opened_at: DateTime<Utc>, prize: &prize_entity::Model) -> Self {
        Self::base(
            OutcomeKind::Won,
            format!("Congratulations! You won {}", prize.name),
            box_id,
            opened_at,
            prize.prize_type,
        )
        .with_prize(prize)
    }

    pub fn with_prize(mut self, prize: &prize_entity::Model) -> Self {
        self.prize_id = Some(prize.id);
        self.prize_name = Some(prize.name.clone());
        self.prize_description = prize.description.clone();
        self
    }

    pub fn is_win(&self) -> bool {
        self.outcome == OutcomeKind::Won
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lost_outcome_omits_reward_fields_on_the_wire() {
        let outcome = OpenBoxOutcome::lost(3, Utc::now(), PrizeType::TryAgain);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "lost");
        assert_eq!(json["prize_type"], "try_again");
        assert!(json.get("discount_code").is_none());
        assert!(!outcome.is_win());
    }

    #[test]
    fn test_stored_outcome_without_replayed_flag_parses() {
        let outcome = OpenBoxOutcome::lost(3, Utc::now(), PrizeType::Nothing);
        let mut json = serde_json::to_value(&outcome).unwrap();
        json.as_object_mut().unwrap().remove("replayed");
        let parsed: OpenBoxOutcome = serde_json::from_value(json).unwrap();
        assert!(!parsed.replayed);
    }
}
