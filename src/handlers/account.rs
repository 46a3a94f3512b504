use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{CouponService, EntitlementService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/me/entitlements",
    tag = "account",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取我的权益成功", body = [UserEntitlementResponse]),
        (status = 401, description = "未授权")
    )
)]
/// 当前用户的订阅 / 次数包权益
pub async fn my_entitlements(
    service: web::Data<EntitlementService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_for_user(user.id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/me/coupons",
    tag = "account",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取我的折扣券成功", body = [DiscountCouponResponse]),
        (status = 401, description = "未授权")
    )
)]
/// 当前用户的折扣券（开盒奖品与安慰优惠）
pub async fn my_coupons(service: web::Data<CouponService>, req: HttpRequest) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_for_user(user.id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/subscription-types",
    tag = "account",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取订阅类型成功", body = [SubscriptionTypeResponse])
    )
)]
pub async fn subscription_types(service: web::Data<EntitlementService>) -> Result<HttpResponse> {
    match service.list_subscription_types().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn account_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/me/entitlements", web::get().to(my_entitlements))
        .route("/me/coupons", web::get().to(my_coupons))
        .route("/subscription-types", web::get().to(subscription_types));
}
