use crate::error::{AppError, AppResult};
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{ConsolationService, DistributionService, MagicBoxService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/magic-boxes/mine",
    tag = "magic_box",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)"),
        ("campaign_id" = Option<i64>, Query, description = "按活动过滤"),
        ("is_opened" = Option<bool>, Query, description = "按开启状态过滤")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取我的盒子成功", body = MagicBoxPageResponse),
        (status = 401, description = "未授权")
    )
)]
/// 当前用户被分配的盒子
pub async fn my_boxes(
    service: web::Data<DistributionService>,
    req: HttpRequest,
    query: web::Query<BoxQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_my_boxes(user.id, &query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/magic-boxes/{id}/open",
    tag = "magic_box",
    params(
        ("id" = i64, Path, description = "盒子ID")
    ),
    request_body = OpenBoxRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "开盒成功（中奖或未中奖）", body = OpenBoxOutcome),
        (status = 400, description = "幂等键非法"),
        (status = 403, description = "不是盒子所有者"),
        (status = 404, description = "盒子不存在"),
        (status = 409, description = "盒子已被开启"),
        (status = 503, description = "暂时性错误，可用同一幂等键重试")
    )
)]
/// 开启盒子:
/// 1. 条件更新认领盒子（并发请求只有一个成功）
/// 2. 在有库存的奖品中按权重抽取并原子扣减库存
/// 3. 发放奖励并返回结果
///
/// 请求体可省略；重试时带上同一个 idempotency_key 会拿到首次的结果
pub async fn open_box(
    service: web::Data<MagicBoxService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    let body = match parse_open_body(&body) {
        Ok(body) => body,
        Err(e) => return Ok(e.error_response()),
    };
    let cmd = OpenBoxCommand {
        box_id: path.into_inner(),
        caller,
        target_user_id: body.target_user_id,
        idempotency_key: body.idempotency_key,
    };
    match service.open_box(cmd).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": outcome }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/magic-boxes/{id}/outcome",
    tag = "magic_box",
    params(
        ("id" = i64, Path, description = "盒子ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取开盒结果成功", body = OpenBoxOutcome),
        (status = 403, description = "不是盒子所有者"),
        (status = 404, description = "盒子不存在或尚未开启")
    )
)]
/// 查询已开启盒子的结果（用于刷新页面后恢复展示）
pub async fn get_outcome(
    service: web::Data<MagicBoxService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.get_outcome(path.into_inner(), &caller).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": outcome }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/magic-boxes/{id}/consolation-offers",
    tag = "magic_box",
    params(
        ("id" = i64, Path, description = "盒子ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取安慰优惠成功", body = [ConsolationOfferResponse]),
        (status = 400, description = "盒子未开启或已中奖")
    )
)]
/// 未中奖盒子可选的安慰优惠
pub async fn consolation_offers(
    service: web::Data<ConsolationService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_offers_for_box(path.into_inner(), &caller).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/magic-boxes/{id}/consolation",
    tag = "magic_box",
    params(
        ("id" = i64, Path, description = "盒子ID")
    ),
    request_body = AcceptConsolationRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "领取成功", body = AcceptConsolationResponse),
        (status = 400, description = "盒子不满足条件或已领取过"),
        (status = 404, description = "优惠不存在")
    )
)]
/// 领取安慰优惠，每个盒子只能领取一次
pub async fn accept_consolation(
    service: web::Data<ConsolationService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<AcceptConsolationRequest>,
) -> Result<HttpResponse> {
    let caller = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service
        .accept(path.into_inner(), body.offer_id, &caller)
        .await
    {
        Ok(accepted) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": accepted,
            "message": "Consolation offer accepted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 请求体可为空；非空但无法解析时拒绝，避免丢失幂等键后照常开盒
fn parse_open_body(body: &[u8]) -> AppResult<OpenBoxRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(OpenBoxRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::ValidationError(format!("Invalid request body: {e}")))
}

/// 路由配置
pub fn magic_box_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/magic-boxes")
            .route("/mine", web::get().to(my_boxes))
            .route("/{id}/open", web::post().to(open_box))
            .route("/{id}/outcome", web::get().to(get_outcome))
            .route("/{id}/consolation-offers", web::get().to(consolation_offers))
            .route("/{id}/consolation", web::post().to(accept_consolation)),
    );
}
