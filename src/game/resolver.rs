use crate::error::codes;
use crate::models::OpenBoxOutcome;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// 一次开盒请求。重试同一次尝试时必须复用 idempotency_key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequest {
    pub box_id: i64,
    pub idempotency_key: String,
}

/// 客户端看到的开盒失败，按服务端错误码解码
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Magic box not found")]
    NotFound,

    #[error("Magic box has already been opened")]
    AlreadyOpened,

    #[error("Request rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// 网络或服务端暂时性故障，提交状态未知，可用同一幂等键重试
    #[error("Temporarily unavailable: {0}")]
    Transient(String),
}

impl ResolveError {
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        match code {
            codes::NOT_FOUND => ResolveError::NotFound,
            codes::ALREADY_OPENED => ResolveError::AlreadyOpened,
            codes::DATABASE_ERROR | codes::INTERNAL_ERROR | codes::EXTERNAL_API_ERROR => {
                ResolveError::Transient(message.into())
            }
            other => ResolveError::Rejected {
                code: other.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ResolveError::Transient(_))
    }
}

/// 开盒服务的调用接口，由进程内服务与 HTTP 客户端分别实现
pub trait PrizeResolver {
    fn resolve(
        &self,
        request: &OpenRequest,
    ) -> impl Future<Output = Result<OpenBoxOutcome, ResolveError>> + Send;
}
