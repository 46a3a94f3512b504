use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{CouponSource, PrizeType};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::magic_box::my_boxes,
        handlers::magic_box::open_box,
        handlers::magic_box::get_outcome,
        handlers::magic_box::consolation_offers,
        handlers::magic_box::accept_consolation,
        handlers::account::my_entitlements,
        handlers::account::my_coupons,
        handlers::account::subscription_types,
        handlers::admin::list_campaigns,
        handlers::admin::create_campaign,
        handlers::admin::get_campaign,
        handlers::admin::update_campaign,
        handlers::admin::set_campaign_active,
        handlers::admin::delete_campaign,
        handlers::admin::list_prizes,
        handlers::admin::create_prize,
        handlers::admin::update_prize,
        handlers::admin::delete_prize,
        handlers::admin::assign_boxes,
        handlers::admin::list_campaign_boxes,
        handlers::admin::list_boxes,
        handlers::admin::delete_box,
        handlers::admin::list_consolation_offers,
        handlers::admin::create_consolation_offer,
        handlers::admin::delete_consolation_offer,
    ),
    components(
        schemas(
            PrizeType,
            CouponSource,
            OutcomeKind,
            OpenBoxRequest,
            OpenBoxOutcome,
            MagicBoxResponse,
            MagicBoxPageResponse,
            AssignBoxesRequest,
            BoxQuery,
            CampaignResponse,
            CampaignPageResponse,
            CreateCampaignRequest,
            UpdateCampaignRequest,
            SetCampaignActiveRequest,
            CampaignQuery,
            PrizePayload,
            PrizeResponse,
            CreatePrizeRequest,
            UpdatePrizeRequest,
            ConsolationOfferResponse,
            CreateConsolationOfferRequest,
            AcceptConsolationRequest,
            AcceptConsolationResponse,
            DiscountCouponResponse,
            SubscriptionTypeResponse,
            UserEntitlementResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "magic_box", description = "Magic box opening API"),
        (name = "account", description = "Entitlements and coupons of the current user"),
        (name = "admin", description = "Campaign, prize, box and consolation management API"),
    ),
    info(
        title = "Magic Box API",
        version = "1.0.0",
        description = "Magic box prize resolution REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_open_endpoint_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/magic-boxes/{id}/open"));
        assert!(doc.paths.paths.contains_key("/admin/campaigns/{id}/prizes"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("MagicBoxPageResponse"));
    }
}
