use crate::entities::{
    CouponSource, box_entity as boxes, consolation_offer_entity as offers,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AcceptConsolationResponse, AuthUser, ConsolationOfferResponse, CreateConsolationOfferRequest,
};
use crate::services::CouponService;
use crate::services::campaign_service::find_campaign;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct ConsolationService {
    pool: DatabaseConnection,
    coupons: CouponService,
}

impl ConsolationService {
    pub fn new(pool: DatabaseConnection, coupons: CouponService) -> Self {
        Self { pool, coupons }
    }

    pub async fn create_offer(
        &self,
        campaign_id: i64,
        req: CreateConsolationOfferRequest,
    ) -> AppResult<ConsolationOfferResponse> {
        req.validate()?;
        find_campaign(&self.pool, campaign_id).await?;

        let now = Utc::now();
        let offer = offers::ActiveModel {
            campaign_id: Set(campaign_id),
            title: Set(req.title.trim().to_string()),
            description: Set(req.description),
            discount_percentage: Set(req.discount_percentage),
            is_active: Set(true),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(offer.into())
    }

    pub async fn list_offers(&self, campaign_id: i64) -> AppResult<Vec<ConsolationOfferResponse>> {
        find_campaign(&self.pool, campaign_id).await?;
        let list = offers::Entity::find()
            .filter(offers::Column::CampaignId.eq(campaign_id))
            .order_by_asc(offers::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn delete_offer(&self, campaign_id: i64, offer_id: i64) -> AppResult<()> {
        let result = offers::Entity::delete_many()
            .filter(offers::Column::Id.eq(offer_id))
            .filter(offers::Column::CampaignId.eq(campaign_id))
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "Consolation offer {offer_id} not found"
            )));
        }
        Ok(())
    }

    /// 未中奖盒子可选的安慰优惠
    pub async fn list_offers_for_box(
        &self,
        box_id: i64,
        caller: &AuthUser,
    ) -> AppResult<Vec<ConsolationOfferResponse>> {
        let magic_box = lost_box(&self.pool, box_id, caller).await?;
        let list = offers::Entity::find()
            .filter(offers::Column::CampaignId.eq(magic_box.campaign_id))
            .filter(offers::Column::IsActive.eq(true))
            .order_by_asc(offers::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 领取安慰优惠（每个盒子一次），发放折扣券给盒子所属用户
    pub async fn accept(
        &self,
        box_id: i64,
        offer_id: i64,
        caller: &AuthUser,
    ) -> AppResult<AcceptConsolationResponse> {
        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let magic_box = lost_box(&txn, box_id, caller).await?;

        let offer = offers::Entity::find_by_id(offer_id)
            .filter(offers::Column::CampaignId.eq(magic_box.campaign_id))
            .filter(offers::Column::IsActive.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Consolation offer {offer_id} not found")))?;

        let claimed = boxes::Entity::update_many()
            .col_expr(boxes::Column::ConsolationOfferId, Expr::value(offer_id))
            .col_expr(boxes::Column::UpdatedAt, Expr::value(now))
            .filter(boxes::Column::Id.eq(box_id))
            .filter(boxes::Column::ConsolationOfferId.is_null())
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            log::warn!("Consolation for box {box_id} already accepted");
            return Err(AppError::ValidationError(
                "A consolation offer was already accepted for this box".into(),
            ));
        }

        let coupon = self
            .coupons
            .issue_in(
                &txn,
                magic_box.user_id,
                offer.discount_percentage,
                CouponSource::Consolation,
                Some(box_id),
                now,
            )
            .await?;

        txn.commit().await?;
        log::info!(
            "User {} accepted consolation offer {offer_id} for box {box_id}",
            magic_box.user_id
        );
        Ok(AcceptConsolationResponse {
            offer: offer.into(),
            coupon: coupon.into(),
        })
    }
}

/// 已开启、未中奖且调用者有权访问的盒子
async fn lost_box<C: ConnectionTrait>(
    db: &C,
    box_id: i64,
    caller: &AuthUser,
) -> AppResult<boxes::Model> {
    let magic_box = boxes::Entity::find_by_id(box_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Magic box {box_id} not found")))?;

    if !caller.is_admin() && magic_box.user_id != caller.id {
        return Err(AppError::PermissionDenied);
    }
    if !magic_box.is_opened || magic_box.won_prize_id.is_some() {
        return Err(AppError::ValidationError(
            "Consolation offers are only available for opened boxes without a prize".into(),
        ));
    }
    Ok(magic_box)
}
