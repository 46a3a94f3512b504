use crate::entities::{box_entity as boxes, campaign_entity as campaigns};
use crate::error::{AppError, AppResult};
use crate::models::{
    AssignBoxesRequest, BoxQuery, MagicBoxPageResponse, MagicBoxResponse, PaginatedResponse,
    PaginationParams,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};

/// 单次最多分配的盒子数
const MAX_ASSIGN_PER_REQUEST: u32 = 100;

#[derive(Clone)]
pub struct DistributionService {
    pool: DatabaseConnection,
}

impl DistributionService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 给用户分配盒子
    ///
    /// 活动未启用 / 已结束，或分配后超过每人上限时拒绝。
    pub async fn assign_boxes(
        &self,
        campaign_id: i64,
        req: AssignBoxesRequest,
    ) -> AppResult<Vec<MagicBoxResponse>> {
        let count = req.count.unwrap_or(1);
        if count == 0 || count > MAX_ASSIGN_PER_REQUEST {
            return Err(AppError::ValidationError(format!(
                "count must be between 1 and {MAX_ASSIGN_PER_REQUEST}"
            )));
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;
        // 锁住活动行，同一活动的分配排队执行，计数和插入之间不会被插队
        let campaign = campaign_for_update(campaign_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Campaign {campaign_id} not found")))?;
        if !campaign.is_active || campaign.has_ended(now) {
            return Err(AppError::ValidationError(format!(
                "Campaign {campaign_id} is not active"
            )));
        }

        let held = boxes::Entity::find()
            .filter(boxes::Column::CampaignId.eq(campaign_id))
            .filter(boxes::Column::UserId.eq(req.user_id))
            .count(&txn)
            .await?;
        let max = campaign.max_participations_per_user.max(0) as u64;
        if held + count as u64 > max {
            return Err(AppError::ValidationError(format!(
                "User {} already holds {held} of {max} boxes for this campaign",
                req.user_id
            )));
        }

        let mut created = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let model = boxes::ActiveModel {
                campaign_id: Set(campaign_id),
                user_id: Set(req.user_id),
                is_opened: Set(false),
                opened_at: Set(None),
                won_prize_id: Set(None),
                consolation_offer_id: Set(None),
                created_at: Set(Some(now)),
                updated_at: Set(Some(now)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            created.push(MagicBoxResponse::from(model));
        }

        txn.commit().await?;
        log::info!(
            "Assigned {count} boxes of campaign {campaign_id} to user {}",
            req.user_id
        );
        Ok(created)
    }

    pub async fn list_boxes(&self, query: &BoxQuery) -> AppResult<MagicBoxPageResponse> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query = boxes::Entity::find();
        if let Some(campaign_id) = query.campaign_id {
            base_query = base_query.filter(boxes::Column::CampaignId.eq(campaign_id));
        }
        if let Some(user_id) = query.user_id {
            base_query = base_query.filter(boxes::Column::UserId.eq(user_id));
        }
        if let Some(opened) = query.is_opened {
            base_query = base_query.filter(boxes::Column::IsOpened.eq(opened));
        }

        let total = base_query.clone().count(&self.pool).await? as i64;
        let items = base_query
            .order_by_desc(boxes::Column::Id)
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

    /// 当前用户的盒子
    pub async fn list_my_boxes(
        &self,
        user_id: i64,
        query: &BoxQuery,
    ) -> AppResult<MagicBoxPageResponse> {
        let query = BoxQuery {
            user_id: Some(user_id),
            ..query.clone()
        };
        self.list_boxes(&query).await
    }

    /// 删除盒子，已开启的盒子属于历史记录，不可删除
    pub async fn delete_box(&self, box_id: i64) -> AppResult<()> {
        let result = boxes::Entity::delete_many()
            .filter(boxes::Column::Id.eq(box_id))
            .filter(boxes::Column::IsOpened.eq(false))
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 1 {
            log::info!("Magic box {box_id} deleted");
            return Ok(());
        }

        match boxes::Entity::find_by_id(box_id).one(&self.pool).await? {
            Some(_) => Err(AppError::ValidationError(
                "Opened boxes cannot be deleted".into(),
            )),
            None => Err(AppError::NotFound(format!("Magic box {box_id} not found"))),
        }
    }
}

pub(crate) fn campaign_for_update(id: i64) -> Select<campaigns::Entity> {
    campaigns::Entity::find_by_id(id).lock_exclusive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::services::test_support::*;
    use sea_orm::{IntoActiveModel, QueryTrait};

    fn assign(user_id: i64, count: u32) -> AssignBoxesRequest {
        AssignBoxesRequest {
            user_id,
            count: Some(count),
        }
    }

    #[tokio::test]
    async fn test_assign_respects_participation_limit() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 3).await;
        let svc = DistributionService::new(pool);

        let created = svc.assign_boxes(campaign.id, assign(7, 2)).await.unwrap();
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|b| !b.is_opened && b.user_id == 7));

        let err = svc.assign_boxes(campaign.id, assign(7, 2)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        svc.assign_boxes(campaign.id, assign(7, 1)).await.unwrap();
        // 其他用户不受影响
        svc.assign_boxes(campaign.id, assign(8, 3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_assign_refused_for_inactive_campaign() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        let mut am = campaign.clone().into_active_model();
        am.is_active = Set(false);
        let campaign: campaigns::Model = am.update(&pool).await.unwrap();
        let svc = DistributionService::new(pool);

        assert!(matches!(
            svc.assign_boxes(campaign.id, assign(1, 1)).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            svc.assign_boxes(campaign.id + 100, assign(1, 1)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_my_boxes() {
        let pool = test_pool().await;
        let a = insert_campaign(&pool, 5).await;
        let b = insert_campaign(&pool, 5).await;
        insert_box(&pool, a.id, 1).await;
        insert_box(&pool, a.id, 2).await;
        let opened = insert_box(&pool, b.id, 1).await;
        let mut am = opened.into_active_model();
        am.is_opened = Set(true);
        am.update(&pool).await.unwrap();
        let svc = DistributionService::new(pool);

        let by_campaign = svc
            .list_boxes(&BoxQuery {
                campaign_id: Some(a.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_campaign.total, 2);

        let mine = svc.list_my_boxes(1, &BoxQuery::default()).await.unwrap();
        assert_eq!(mine.total, 2);

        let unopened = svc
            .list_my_boxes(
                1,
                &BoxQuery {
                    is_opened: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unopened.total, 1);
        assert_eq!(unopened.data[0].campaign_id, a.id);
    }

    #[tokio::test]
    async fn test_delete_only_unopened_boxes() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        let fresh = insert_box(&pool, campaign.id, 1).await;
        let opened = insert_box(&pool, campaign.id, 1).await;
        let mut am = opened.clone().into_active_model();
        am.is_opened = Set(true);
        am.update(&pool).await.unwrap();
        let svc = DistributionService::new(pool.clone());

        svc.delete_box(fresh.id).await.unwrap();
        assert!(matches!(
            svc.delete_box(fresh.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete_box(opened.id).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(reload_box(&pool, opened.id).await.is_opened);
    }

    #[test]
    fn test_assign_locks_campaign_row() {
        let sql = campaign_for_update(1)
            .build(sea_orm::DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("FOR UPDATE"), "{sql}");
    }
}
