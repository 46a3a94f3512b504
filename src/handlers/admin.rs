//! 管理端接口，统一挂在 `/admin` 下，由鉴权中间件限制为管理员访问

use crate::models::*;
use crate::services::{CampaignService, ConsolationService, DistributionService, PrizeService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

// ---------------------------------------------------------------- 活动

#[utoipa::path(
    get,
    path = "/admin/campaigns",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)"),
        ("is_active" = Option<bool>, Query, description = "按启用状态过滤")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取活动列表成功", body = CampaignPageResponse),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn list_campaigns(
    service: web::Data<CampaignService>,
    query: web::Query<CampaignQuery>,
) -> Result<HttpResponse> {
    match service.list_campaigns(&query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/campaigns",
    tag = "admin",
    request_body = CreateCampaignRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "创建活动成功", body = CampaignResponse),
        (status = 400, description = "参数错误")
    )
)]
pub async fn create_campaign(
    service: web::Data<CampaignService>,
    body: web::Json<CreateCampaignRequest>,
) -> Result<HttpResponse> {
    match service.create_campaign(body.into_inner()).await {
        Ok(campaign) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": campaign }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/campaigns/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取活动成功", body = CampaignResponse),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_campaign(
    service: web::Data<CampaignService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_campaign(path.into_inner()).await {
        Ok(campaign) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": campaign }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/campaigns/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = UpdateCampaignRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新活动成功", body = CampaignResponse),
        (status = 400, description = "参数错误"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn update_campaign(
    service: web::Data<CampaignService>,
    path: web::Path<i64>,
    body: web::Json<UpdateCampaignRequest>,
) -> Result<HttpResponse> {
    match service
        .update_campaign(path.into_inner(), body.into_inner())
        .await
    {
        Ok(campaign) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": campaign }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/campaigns/{id}/active",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = SetCampaignActiveRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "修改启用状态成功", body = CampaignResponse),
        (status = 404, description = "活动不存在")
    )
)]
/// 启用 / 停用活动
pub async fn set_campaign_active(
    service: web::Data<CampaignService>,
    path: web::Path<i64>,
    body: web::Json<SetCampaignActiveRequest>,
) -> Result<HttpResponse> {
    match service.set_active(path.into_inner(), body.is_active).await {
        Ok(campaign) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": campaign }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/campaigns/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除活动成功"),
        (status = 404, description = "活动不存在")
    )
)]
/// 删除活动及其奖品、盒子、开盒记录和安慰优惠
pub async fn delete_campaign(
    service: web::Data<CampaignService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.delete_campaign(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Campaign deleted" }))),
        Err(e) => Ok(e.error_response()),
    }
}

// ---------------------------------------------------------------- 奖品

#[utoipa::path(
    get,
    path = "/admin/campaigns/{id}/prizes",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取奖品列表成功（含当前概率）", body = [PrizeResponse]),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn list_prizes(
    service: web::Data<PrizeService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.list_prizes(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/campaigns/{id}/prizes",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = CreatePrizeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "创建奖品成功", body = PrizeResponse),
        (status = 400, description = "参数错误"),
        (status = 404, description = "活动或订阅类型不存在")
    )
)]
pub async fn create_prize(
    service: web::Data<PrizeService>,
    path: web::Path<i64>,
    body: web::Json<CreatePrizeRequest>,
) -> Result<HttpResponse> {
    match service.create_prize(path.into_inner(), body.into_inner()).await {
        Ok(prize) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": prize }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/campaigns/{id}/prizes/{prize_id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID"),
        ("prize_id" = i64, Path, description = "奖品ID")
    ),
    request_body = UpdatePrizeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新奖品成功", body = PrizeResponse),
        (status = 400, description = "参数错误"),
        (status = 404, description = "奖品不存在")
    )
)]
pub async fn update_prize(
    service: web::Data<PrizeService>,
    path: web::Path<(i64, i64)>,
    body: web::Json<UpdatePrizeRequest>,
) -> Result<HttpResponse> {
    let (campaign_id, prize_id) = path.into_inner();
    match service
        .update_prize(campaign_id, prize_id, body.into_inner())
        .await
    {
        Ok(prize) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": prize }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/campaigns/{id}/prizes/{prize_id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID"),
        ("prize_id" = i64, Path, description = "奖品ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除奖品成功"),
        (status = 404, description = "奖品不存在")
    )
)]
pub async fn delete_prize(
    service: web::Data<PrizeService>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (campaign_id, prize_id) = path.into_inner();
    match service.delete_prize(campaign_id, prize_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Prize deleted" }))),
        Err(e) => Ok(e.error_response()),
    }
}

// ---------------------------------------------------------------- 盒子分配

#[utoipa::path(
    post,
    path = "/admin/campaigns/{id}/boxes",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = AssignBoxesRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "分配盒子成功", body = [MagicBoxResponse]),
        (status = 400, description = "活动未启用 / 已结束，或超过每人上限"),
        (status = 404, description = "活动不存在")
    )
)]
/// 给用户分配盒子
pub async fn assign_boxes(
    service: web::Data<DistributionService>,
    path: web::Path<i64>,
    body: web::Json<AssignBoxesRequest>,
) -> Result<HttpResponse> {
    match service.assign_boxes(path.into_inner(), body.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/campaigns/{id}/boxes",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)"),
        ("user_id" = Option<i64>, Query, description = "按用户过滤"),
        ("is_opened" = Option<bool>, Query, description = "按开启状态过滤")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取活动盒子成功", body = MagicBoxPageResponse)
    )
)]
pub async fn list_campaign_boxes(
    service: web::Data<DistributionService>,
    path: web::Path<i64>,
    query: web::Query<BoxQuery>,
) -> Result<HttpResponse> {
    let query = BoxQuery {
        campaign_id: Some(path.into_inner()),
        ..query.into_inner()
    };
    match service.list_boxes(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/boxes",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)"),
        ("campaign_id" = Option<i64>, Query, description = "按活动过滤"),
        ("user_id" = Option<i64>, Query, description = "按用户过滤"),
        ("is_opened" = Option<bool>, Query, description = "按开启状态过滤")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取盒子列表成功", body = MagicBoxPageResponse)
    )
)]
pub async fn list_boxes(
    service: web::Data<DistributionService>,
    query: web::Query<BoxQuery>,
) -> Result<HttpResponse> {
    match service.list_boxes(&query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/boxes/{box_id}",
    tag = "admin",
    params(
        ("box_id" = i64, Path, description = "盒子ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除盒子成功"),
        (status = 400, description = "盒子已开启"),
        (status = 404, description = "盒子不存在")
    )
)]
/// 撤回未开启的盒子
pub async fn delete_box(
    service: web::Data<DistributionService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.delete_box(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Magic box deleted" }))),
        Err(e) => Ok(e.error_response()),
    }
}

// ---------------------------------------------------------------- 安慰优惠

#[utoipa::path(
    get,
    path = "/admin/campaigns/{id}/consolation-offers",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取安慰优惠成功", body = [ConsolationOfferResponse]),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn list_consolation_offers(
    service: web::Data<ConsolationService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.list_offers(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/campaigns/{id}/consolation-offers",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = CreateConsolationOfferRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "创建安慰优惠成功", body = ConsolationOfferResponse),
        (status = 400, description = "参数错误"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn create_consolation_offer(
    service: web::Data<ConsolationService>,
    path: web::Path<i64>,
    body: web::Json<CreateConsolationOfferRequest>,
) -> Result<HttpResponse> {
    match service.create_offer(path.into_inner(), body.into_inner()).await {
        Ok(offer) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": offer }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/campaigns/{id}/consolation-offers/{offer_id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID"),
        ("offer_id" = i64, Path, description = "安慰优惠ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除安慰优惠成功"),
        (status = 404, description = "安慰优惠不存在")
    )
)]
pub async fn delete_consolation_offer(
    service: web::Data<ConsolationService>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (campaign_id, offer_id) = path.into_inner();
    match service.delete_offer(campaign_id, offer_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Consolation offer deleted" }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/campaigns", web::get().to(list_campaigns))
            .route("/campaigns", web::post().to(create_campaign))
            .route("/campaigns/{id}", web::get().to(get_campaign))
            .route("/campaigns/{id}", web::put().to(update_campaign))
            .route("/campaigns/{id}", web::delete().to(delete_campaign))
            .route("/campaigns/{id}/active", web::put().to(set_campaign_active))
            .route("/campaigns/{id}/prizes", web::get().to(list_prizes))
            .route("/campaigns/{id}/prizes", web::post().to(create_prize))
            .route("/campaigns/{id}/prizes/{prize_id}", web::put().to(update_prize))
            .route("/campaigns/{id}/prizes/{prize_id}", web::delete().to(delete_prize))
            .route("/campaigns/{id}/boxes", web::post().to(assign_boxes))
            .route("/campaigns/{id}/boxes", web::get().to(list_campaign_boxes))
            .route(
                "/campaigns/{id}/consolation-offers",
                web::get().to(list_consolation_offers),
            )
            .route(
                "/campaigns/{id}/consolation-offers",
                web::post().to(create_consolation_offer),
            )
            .route(
                "/campaigns/{id}/consolation-offers/{offer_id}",
                web::delete().to(delete_consolation_offer),
            )
            .route("/boxes", web::get().to(list_boxes))
            .route("/boxes/{box_id}", web::delete().to(delete_box)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_campaign_prize_and_box_admin_flow() {
        let pool = test_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(CampaignService::new(pool.clone())))
                .app_data(web::Data::new(PrizeService::new(pool.clone())))
                .app_data(web::Data::new(DistributionService::new(pool.clone())))
                .configure(admin_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admin/campaigns")
            .set_json(json!({ "name": "Launch week", "max_participations_per_user": 2 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let campaign_id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("/admin/campaigns/{campaign_id}/prizes"))
            .set_json(json!({
                "name": "15% off",
                "prize_type": "discount_coupon",
                "weight": 1,
                "quantity": 5,
                "discount_percentage": 15
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["remaining_quantity"], 5);
        assert_eq!(body["data"]["probability_pct"], 100.0);

        let req = test::TestRequest::post()
            .uri(&format!("/admin/campaigns/{campaign_id}/boxes"))
            .set_json(json!({ "user_id": 42, "count": 3 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri(&format!("/admin/campaigns/{campaign_id}/boxes"))
            .set_json(json!({ "user_id": 42, "count": 2 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::get()
            .uri("/admin/boxes?user_id=42&is_opened=false")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 2);
    }
}
