use crate::error::AppResult;
use crate::game::{OpenRequest, PrizeResolver, ResolveError};
use crate::models::{ApiResponse, OpenBoxOutcome, OpenBoxRequest};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// 通过 HTTP 调用开盒接口的 [`PrizeResolver`]，供前端宿主 / 运维脚本驱动网格游戏
#[derive(Clone)]
pub struct MagicBoxClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl MagicBoxClient {
    pub fn new(base_url: &str, access_token: &str) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent("magicbox-backend/client")
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn open_url(&self, box_id: i64) -> String {
        format!("{}/api/v1/magic-boxes/{box_id}/open", self.base_url)
    }
}

impl PrizeResolver for MagicBoxClient {
    async fn resolve(&self, request: &OpenRequest) -> Result<OpenBoxOutcome, ResolveError> {
        let body = OpenBoxRequest {
            target_user_id: None,
            idempotency_key: Some(request.idempotency_key.clone()),
        };
        // 发送失败或读取响应失败时提交状态未知，按暂时性错误处理
        let resp = self
            .http
            .post(self.open_url(request.box_id))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ResolveError::Transient(format!("Request failed: {e}")))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ResolveError::Transient(format!("Failed to read response: {e}")))?;

        decode_open_response(status, &bytes)
    }
}

/// 按统一响应格式解码开盒结果
///
/// 响应体无法解析时，5xx 视为暂时性错误，其余按 HTTP 状态拒绝。
pub fn decode_open_response(
    status: StatusCode,
    body: &[u8],
) -> Result<OpenBoxOutcome, ResolveError> {
    match serde_json::from_slice::<ApiResponse<OpenBoxOutcome>>(body) {
        Ok(ApiResponse {
            success: true,
            data: Some(outcome),
            ..
        }) => Ok(outcome),
        Ok(ApiResponse {
            error: Some(err), ..
        }) => Err(ResolveError::from_code(&err.code, err.message)),
        Ok(_) | Err(_) if status.is_server_error() => Err(ResolveError::Transient(format!(
            "Server responded with HTTP {}",
            status.as_u16()
        ))),
        Ok(_) | Err(_) => Err(ResolveError::Rejected {
            code: format!("HTTP_{}", status.as_u16()),
            message: "Unexpected response from magic box service".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MagicBoxConfig;
    use crate::database::test_pool;
    use crate::entities::PrizeType;
    use crate::game::{GameResult, GridGame};
    use crate::handlers::magic_box_config;
    use crate::middlewares::AuthMiddleware;
    use crate::models::{OutcomeKind, Role};
    use crate::services::test_support::*;
    use crate::services::{CouponService, EntitlementService, MagicBoxService};
    use crate::utils::JwtService;
    use actix_web::{App, HttpServer, web};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_decode_success_body() {
        let body = serde_json::json!({
            "success": true,
            "data": {
                "success": true,
                "message": "No prize this time",
                "outcome": "lost",
                "box_id": 4,
                "opened_at": "2026-05-01T10:00:00Z",
                "prize_type": "nothing"
            }
        });
        let outcome =
            decode_open_response(StatusCode::OK, body.to_string().as_bytes()).unwrap();
        assert_eq!(outcome.box_id, 4);
        assert_eq!(outcome.outcome, OutcomeKind::Lost);
        assert!(!outcome.replayed);
    }

    #[test]
    fn test_decode_replayed_outcome() {
        let mut stored = OpenBoxOutcome::lost(9, chrono::Utc::now(), PrizeType::TryAgain);
        stored.replayed = true;
        let body = serde_json::to_vec(&ApiResponse::success(stored.clone())).unwrap();
        assert_eq!(decode_open_response(StatusCode::OK, &body), Ok(stored));
    }

    #[test]
    fn test_decode_error_codes() {
        let body = br#"{"success":false,"error":{"code":"ALREADY_OPENED","message":"opened"}}"#;
        assert_eq!(
            decode_open_response(StatusCode::CONFLICT, body),
            Err(ResolveError::AlreadyOpened)
        );

        let body = br#"{"success":false,"error":{"code":"DATABASE_ERROR","message":"try again"}}"#;
        assert!(
            decode_open_response(StatusCode::SERVICE_UNAVAILABLE, body)
                .unwrap_err()
                .is_transient()
        );
    }

    #[test]
    fn test_decode_unparseable_body_by_status() {
        let err = decode_open_response(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>")
            .unwrap_err();
        assert!(err.is_transient());

        let err = decode_open_response(StatusCode::NOT_ACCEPTABLE, b"").unwrap_err();
        assert!(matches!(err, ResolveError::Rejected { ref code, .. } if code == "HTTP_406"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = MagicBoxClient::new("http://localhost:8080/", "t").unwrap();
        assert_eq!(
            client.open_url(3),
            "http://localhost:8080/api/v1/magic-boxes/3/open"
        );
    }

    #[actix_web::test]
    async fn test_grid_game_over_http() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        insert_prize(&pool, campaign.id, PrizeType::Nothing, 1, 10).await;
        let b = insert_box(&pool, campaign.id, 11).await;

        let service = MagicBoxService::new(
            pool.clone(),
            EntitlementService::new(pool.clone()),
            CouponService::new(pool.clone(), 30),
            &MagicBoxConfig::default(),
        );
        let jwt = JwtService::new("client-secret", 600);
        let token = jwt.generate_access_token(11, Role::Member).unwrap();

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HttpServer::new(move || {
            App::new()
                .wrap(AuthMiddleware::new(jwt.clone()))
                .app_data(web::Data::new(service.clone()))
                .service(web::scope("/api/v1").configure(magic_box_config))
        })
        .workers(1)
        .listen(listener)
        .unwrap()
        .run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let client = MagicBoxClient::new(&format!("http://{addr}"), &token).unwrap();
        let cfg = MagicBoxConfig {
            grid_size: 25,
            ..MagicBoxConfig::default()
        };
        let mut game = GridGame::from_config(StdRng::seed_from_u64(5), &cfg);
        assert_eq!(game.start(b.id).unwrap().size(), 25);
        let result = game.play(24, &client).await.unwrap();
        assert!(matches!(result, GameResult::Lost { .. }));

        // 已开启的盒子再次请求，客户端解码为 AlreadyOpened
        let again = client
            .resolve(&OpenRequest {
                box_id: b.id,
                idempotency_key: "another-attempt".into(),
            })
            .await;
        assert_eq!(again, Err(ResolveError::AlreadyOpened));

        handle.stop(true).await;
    }
}
