use crate::entities::{
    box_entity as boxes, campaign_entity as campaigns, consolation_offer_entity as offers,
    opening_entity as openings, prize_entity as prizes,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CampaignPageResponse, CampaignQuery, CampaignResponse, CreateCampaignRequest,
    PaginatedResponse, PaginationParams, UpdateCampaignRequest, validate_window,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

#[derive(Clone)]
pub struct CampaignService {
    pool: DatabaseConnection,
}

impl CampaignService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_campaign(&self, req: CreateCampaignRequest) -> AppResult<CampaignResponse> {
        req.validate()?;
        let now = Utc::now();
        let model = campaigns::ActiveModel {
            name: Set(req.name.trim().to_string()),
            description: Set(req.description),
            is_active: Set(req.is_active.unwrap_or(true)),
            starts_at: Set(req.starts_at.unwrap_or(now)),
            ends_at: Set(req.ends_at),
            max_participations_per_user: Set(req.max_participations_per_user.unwrap_or(1)),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Campaign {} created: {}", model.id, model.name);
        Ok(model.into())
    }

    pub async fn get_campaign(&self, id: i64) -> AppResult<CampaignResponse> {
        Ok(find_campaign(&self.pool, id).await?.into())
    }

    pub async fn update_campaign(
        &self,
        id: i64,
        req: UpdateCampaignRequest,
    ) -> AppResult<CampaignResponse> {
        req.validate()?;
        let current = find_campaign(&self.pool, id).await?;

        let starts_at = req.starts_at.unwrap_or(current.starts_at);
        let ends_at = if req.clear_ends_at {
            None
        } else {
            req.ends_at.or(current.ends_at)
        };
        validate_window(starts_at, ends_at)?;

        let mut am = current.into_active_model();
        if let Some(name) = req.name {
            am.name = Set(name.trim().to_string());
        }
        if let Some(description) = req.description {
            am.description = Set(Some(description));
        }
        if let Some(max) = req.max_participations_per_user {
            am.max_participations_per_user = Set(max);
        }
        am.starts_at = Set(starts_at);
        am.ends_at = Set(ends_at);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&self.pool).await?;

        Ok(updated.into())
    }

    pub async fn set_active(&self, id: i64, is_active: bool) -> AppResult<CampaignResponse> {
        let current = find_campaign(&self.pool, id).await?;
        let mut am = current.into_active_model();
        am.is_active = Set(is_active);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&self.pool).await?;
        log::info!("Campaign {id} active = {is_active}");
        Ok(updated.into())
    }

    pub async fn list_campaigns(&self, query: &CampaignQuery) -> AppResult<CampaignPageResponse> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query = campaigns::Entity::find();
        if let Some(active) = query.is_active {
            base_query = base_query.filter(campaigns::Column::IsActive.eq(active));
        }

        let total = base_query.clone().count(&self.pool).await? as i64;
        let items = base_query
            .order_by_desc(campaigns::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::from_params(
            items.into_iter().map(Into::into).collect(),
            &params,
            total,
        ))
    }

    /// 删除活动，级联删除开盒记录、盒子、安慰优惠与奖品
    pub async fn delete_campaign(&self, id: i64) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        find_campaign(&txn, id).await?;

        openings::Entity::delete_many()
            .filter(openings::Column::CampaignId.eq(id))
            .exec(&txn)
            .await?;
        boxes::Entity::delete_many()
            .filter(boxes::Column::CampaignId.eq(id))
            .exec(&txn)
            .await?;
        offers::Entity::delete_many()
            .filter(offers::Column::CampaignId.eq(id))
            .exec(&txn)
            .await?;
        prizes::Entity::delete_many()
            .filter(prizes::Column::CampaignId.eq(id))
            .exec(&txn)
            .await?;
        campaigns::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        log::info!("Campaign {id} deleted");
        Ok(())
    }

    /// 停用已过结束时间的活动，返回处理数量
    pub async fn expire_campaigns(&self) -> AppResult<u64> {
        let now = Utc::now();
        let result = campaigns::Entity::update_many()
            .col_expr(campaigns::Column::IsActive, Expr::value(false))
            .col_expr(campaigns::Column::UpdatedAt, Expr::value(now))
            .filter(campaigns::Column::IsActive.eq(true))
            .filter(campaigns::Column::EndsAt.is_not_null())
            .filter(campaigns::Column::EndsAt.lte(now))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected)
    }
}

pub(crate) async fn find_campaign<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> AppResult<campaigns::Model> {
    campaigns::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {id} not found")))
}
