use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::campaign_entity;
use crate::error::{AppError, AppResult};

/// 创建活动请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub description: Option<String>,
    /// 默认立即开始
    pub starts_at: Option<DateTime<Utc>>,
    /// 为空表示长期有效
    pub ends_at: Option<DateTime<Utc>>,
    /// 每个用户最多可被分配的盒子数 (默认 1)
    pub max_participations_per_user: Option<i32>,
    /// 默认启用
    pub is_active: Option<bool>,
}

impl CreateCampaignRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_name(&self.name)?;
        if let Some(max) = self.max_participations_per_user {
            validate_max_participations(max)?;
        }
        let starts_at = self.starts_at.unwrap_or_else(Utc::now);
        validate_window(starts_at, self.ends_at)
    }
}

/// 更新活动请求（字段为空则不修改）
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// 为 true 时清除结束时间
    #[serde(default)]
    pub clear_ends_at: bool,
    pub max_participations_per_user: Option<i32>,
}

impl UpdateCampaignRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(max) = self.max_participations_per_user {
            validate_max_participations(max)?;
        }
        if self.clear_ends_at && self.ends_at.is_some() {
            return Err(AppError::ValidationError(
                "ends_at and clear_ends_at cannot be combined".into(),
            ));
        }
        Ok(())
    }
}

/// 启用 / 停用活动
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SetCampaignActiveRequest {
    pub is_active: bool,
}

/// 活动列表查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct CampaignQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CampaignResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub max_participations_per_user: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<campaign_entity::Model> for CampaignResponse {
    fn from(m: campaign_entity::Model) -> Self {
        CampaignResponse {
            id: m.id,
            name: m.name,
            description: m.description,
            is_active: m.is_active,
            starts_at: m.starts_at,
            ends_at: m.ends_at,
            max_participations_per_user: m.max_participations_per_user,
            created_at: m.created_at,
        }
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > 255 {
        return Err(AppError::ValidationError(
            "Name must be between 1 and 255 characters".into(),
        ));
    }
    Ok(())
}

fn validate_max_participations(max: i32) -> AppResult<()> {
    if max < 1 {
        return Err(AppError::ValidationError(
            "max_participations_per_user must be >= 1".into(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_window(
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
) -> AppResult<()> {
    if let Some(end) = ends_at {
        if end <= starts_at {
            return Err(AppError::ValidationError(
                "ends_at must be later than starts_at".into(),
            ));
        }
    }
    Ok(())
}
