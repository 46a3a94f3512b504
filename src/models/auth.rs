use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 角色由登录服务写入访问令牌，本服务只读取
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Trainer,
    Admin,
}

/// 当前请求的调用者，由鉴权中间件注入请求扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
