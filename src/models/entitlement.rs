use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{entitlement_entity, subscription_type_entity};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionTypeResponse {
    pub id: i64,
    pub name: String,
    pub visit_count: i32,
    pub videocall_count: i32,
    pub duration_days: i32,
    pub includes_program: bool,
}

impl From<subscription_type_entity::Model> for SubscriptionTypeResponse {
    fn from(m: subscription_type_entity::Model) -> Self {
        SubscriptionTypeResponse {
            id: m.id,
            name: m.name,
            visit_count: m.visit_count,
            videocall_count: m.videocall_count,
            duration_days: m.duration_days,
            includes_program: m.includes_program,
        }
    }
}

/// 用户当前持有的权益
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserEntitlementResponse {
    pub id: i64,
    pub subscription_type_id: Option<i64>,
    pub visits_remaining: i32,
    pub videocalls_remaining: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub source: String,
}

impl UserEntitlementResponse {
    pub fn from_model(m: entitlement_entity::Model, now: DateTime<Utc>) -> Self {
        UserEntitlementResponse {
            id: m.id,
            subscription_type_id: m.subscription_type_id,
            visits_remaining: m.visits_remaining,
            videocalls_remaining: m.videocalls_remaining,
            expires_at: m.expires_at,
            is_expired: m.is_expired(now),
            source: m.source,
        }
    }
}

/// 一次权益发放的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitlementGrant {
    pub entitlement_id: i64,
    /// 是否累加到了已有的同类权益上
    pub merged_with_existing: bool,
    pub total_visits_now: i32,
    pub total_videocalls_now: i32,
}
