use crate::entities::{box_entity as boxes, opening_entity as openings, prize_entity as prizes};
use crate::error::{AppError, AppResult};
use crate::models::{CreatePrizeRequest, PrizePayload, PrizeResponse, UpdatePrizeRequest};
use crate::services::campaign_service::find_campaign;
use crate::services::EntitlementService;
use crate::utils::probability_percentages;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct PrizeService {
    pool: DatabaseConnection,
    entitlements: EntitlementService,
}

impl PrizeService {
    pub fn new(pool: DatabaseConnection) -> Self {
        let entitlements = EntitlementService::new(pool.clone());
        Self { pool, entitlements }
    }

    /// 获取活动下全部奖品（按创建顺序），附带当前概率
    pub async fn list_prizes(&self, campaign_id: i64) -> AppResult<Vec<PrizeResponse>> {
        find_campaign(&self.pool, campaign_id).await?;
        let list = prizes::Entity::find()
            .filter(prizes::Column::CampaignId.eq(campaign_id))
            .order_by_asc(prizes::Column::Id)
            .all(&self.pool)
            .await?;

        let pct = probability_percentages(&list);
        Ok(list
            .into_iter()
            .zip(pct)
            .map(|(m, p)| PrizeResponse::from_model(m, p))
            .collect())
    }

    pub async fn create_prize(
        &self,
        campaign_id: i64,
        req: CreatePrizeRequest,
    ) -> AppResult<PrizeResponse> {
        req.validate()?;
        find_campaign(&self.pool, campaign_id).await?;
        if let Some(type_id) = req.payload.subscription_type_id {
            self.entitlements
                .find_subscription_type_in(&self.pool, type_id)
                .await?;
        }

        let now = Utc::now();
        let created = prizes::ActiveModel {
            campaign_id: Set(campaign_id),
            name: Set(req.name.trim().to_string()),
            description: Set(req.description),
            prize_type: Set(req.prize_type),
            weight: Set(req.weight),
            quantity: Set(req.quantity),
            remaining_quantity: Set(req.quantity),
            subscription_type_id: Set(req.payload.subscription_type_id),
            discount_percentage: Set(req.payload.discount_percentage),
            visit_count: Set(req.payload.visit_count),
            videocall_count: Set(req.payload.videocall_count),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Prize {} ({}) added to campaign {campaign_id}",
            created.id,
            created.prize_type
        );
        self.prize_response(campaign_id, created.id).await
    }

    /// 更新奖品。库存调整使用原子表达式，避免覆盖并发开盒的扣减
    pub async fn update_prize(
        &self,
        campaign_id: i64,
        prize_id: i64,
        req: UpdatePrizeRequest,
    ) -> AppResult<PrizeResponse> {
        req.validate()?;
        let txn = self.pool.begin().await?;
        let current = find_prize(&txn, campaign_id, prize_id).await?;

        let payload = PrizePayload {
            subscription_type_id: req.subscription_type_id.or(current.subscription_type_id),
            discount_percentage: req.discount_percentage.or(current.discount_percentage),
            visit_count: req.visit_count.or(current.visit_count),
            videocall_count: req.videocall_count.or(current.videocall_count),
        };
        payload.validate_for(current.prize_type)?;
        if let Some(type_id) = req.subscription_type_id {
            self.entitlements
                .find_subscription_type_in(&txn, type_id)
                .await?;
        }

        let delta = req.quantity.map(|q| q - current.quantity).unwrap_or(0);

        let mut am = current.into_active_model();
        if let Some(name) = req.name {
            am.name = Set(name.trim().to_string());
        }
        if let Some(description) = req.description {
            am.description = Set(Some(description));
        }
        if let Some(weight) = req.weight {
            am.weight = Set(weight);
        }
        if let Some(quantity) = req.quantity {
            am.quantity = Set(quantity);
        }
        am.subscription_type_id = Set(payload.subscription_type_id);
        am.discount_percentage = Set(payload.discount_percentage);
        am.visit_count = Set(payload.visit_count);
        am.videocall_count = Set(payload.videocall_count);
        am.updated_at = Set(Some(Utc::now()));
        am.update(&txn).await?;

        if delta != 0 {
            prizes::Entity::update_many()
                .col_expr(
                    prizes::Column::RemainingQuantity,
                    Expr::col(prizes::Column::RemainingQuantity).add(delta),
                )
                .filter(prizes::Column::Id.eq(prize_id))
                .exec(&txn)
                .await?;
            // 减少库存时剩余量不能为负
            prizes::Entity::update_many()
                .col_expr(prizes::Column::RemainingQuantity, Expr::value(0))
                .filter(prizes::Column::Id.eq(prize_id))
                .filter(prizes::Column::RemainingQuantity.lt(0))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        self.prize_response(campaign_id, prize_id).await
    }

    pub async fn delete_prize(&self, campaign_id: i64, prize_id: i64) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        find_prize(&txn, campaign_id, prize_id).await?;

        // 已开出的奖品被盒子和开盒记录引用，删除会让历史结果失效
        let won_boxes = boxes::Entity::find()
            .filter(boxes::Column::WonPrizeId.eq(prize_id))
            .count(&txn)
            .await?;
        let opening_count = openings::Entity::find()
            .filter(openings::Column::PrizeId.eq(prize_id))
            .count(&txn)
            .await?;
        if won_boxes > 0 || opening_count > 0 {
            return Err(AppError::ValidationError(format!(
                "Prize {prize_id} has already been awarded and cannot be deleted"
            )));
        }

        prizes::Entity::delete_by_id(prize_id).exec(&txn).await?;
        txn.commit().await?;
        log::info!("Prize {prize_id} removed from campaign {campaign_id}");
        Ok(())
    }

    async fn prize_response(&self, campaign_id: i64, prize_id: i64) -> AppResult<PrizeResponse> {
        self.list_prizes(campaign_id)
            .await?
            .into_iter()
            .find(|p| p.id == prize_id)
            .ok_or_else(|| AppError::NotFound(format!("Prize {prize_id} not found")))
    }
}

async fn find_prize<C: sea_orm::ConnectionTrait>(
    db: &C,
    campaign_id: i64,
    prize_id: i64,
) -> AppResult<prizes::Model> {
    prizes::Entity::find_by_id(prize_id)
        .filter(prizes::Column::CampaignId.eq(campaign_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prize {prize_id} not found")))
}
