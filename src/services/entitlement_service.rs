use crate::entities::{entitlement_entity as entitlements, subscription_type_entity as sub_types};
use crate::error::{AppError, AppResult};
use crate::models::{EntitlementGrant, SubscriptionTypeResponse, UserEntitlementResponse};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, QueryFilter, QueryOrder, Set, Statement,
};

/// 一次发放的内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantSpec {
    pub subscription_type_id: Option<i64>,
    pub visits: i32,
    pub videocalls: i32,
    /// 有效天数；None 表示不过期
    pub duration_days: Option<i32>,
}

#[derive(Clone)]
pub struct EntitlementService {
    pool: DatabaseConnection,
}

impl EntitlementService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn list_subscription_types(&self) -> AppResult<Vec<SubscriptionTypeResponse>> {
        let list = sub_types::Entity::find()
            .order_by_asc(sub_types::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn find_subscription_type_in<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
    ) -> AppResult<sub_types::Model> {
        sub_types::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Subscription type {id} not found")))
    }

    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<UserEntitlementResponse>> {
        let now = Utc::now();
        let rows = entitlements::Entity::find()
            .filter(entitlements::Column::UserId.eq(user_id))
            .order_by_desc(entitlements::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|m| UserEntitlementResponse::from_model(m, now))
            .collect())
    }

    /// 发放权益（在调用方事务内执行）
    ///
    /// 同一用户、同一订阅类型的未过期权益存在时累加次数并顺延有效期，否则新建一条。
    pub async fn grant_in<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
        spec: GrantSpec,
        source: &str,
        now: DateTime<Utc>,
    ) -> AppResult<EntitlementGrant> {
        if spec.visits < 0 || spec.videocalls < 0 {
            return Err(AppError::ValidationError(
                "Granted counts cannot be negative".into(),
            ));
        }

        // 同一用户的发放串行执行，防止并发时重复新建或覆盖累加结果
        if let Some(stmt) = grant_lock_statement(db.get_database_backend(), user_id) {
            db.execute(stmt).await?;
        }

        let type_condition = match spec.subscription_type_id {
            Some(id) => entitlements::Column::SubscriptionTypeId.eq(id),
            None => entitlements::Column::SubscriptionTypeId.is_null(),
        };

        let existing = entitlements::Entity::find()
            .filter(entitlements::Column::UserId.eq(user_id))
            .filter(type_condition)
            .filter(
                Condition::any()
                    .add(entitlements::Column::ExpiresAt.is_null())
                    .add(entitlements::Column::ExpiresAt.gt(now)),
            )
            .order_by_asc(entitlements::Column::Id)
            .one(db)
            .await?;

        let extension = spec.duration_days.map(|d| Duration::days(d as i64));

        if let Some(current) = existing {
            let mut update = entitlements::Entity::update_many()
                .col_expr(
                    entitlements::Column::VisitsRemaining,
                    Expr::col(entitlements::Column::VisitsRemaining).add(spec.visits),
                )
                .col_expr(
                    entitlements::Column::VideocallsRemaining,
                    Expr::col(entitlements::Column::VideocallsRemaining).add(spec.videocalls),
                )
                .col_expr(entitlements::Column::UpdatedAt, Expr::value(now));
            if let (Some(at), Some(ext)) = (current.expires_at, extension) {
                update = update.col_expr(entitlements::Column::ExpiresAt, Expr::value(at + ext));
            }
            update
                .filter(entitlements::Column::Id.eq(current.id))
                .exec(db)
                .await?;

            let merged = entitlements::Entity::find_by_id(current.id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Entitlement {} not found", current.id))
                })?;

            return Ok(EntitlementGrant {
                entitlement_id: merged.id,
                merged_with_existing: true,
                total_visits_now: merged.visits_remaining,
                total_videocalls_now: merged.videocalls_remaining,
            });
        }

        let created = entitlements::ActiveModel {
            user_id: Set(user_id),
            subscription_type_id: Set(spec.subscription_type_id),
            visits_remaining: Set(spec.visits),
            videocalls_remaining: Set(spec.videocalls),
            expires_at: Set(extension.map(|ext| now + ext)),
            source: Set(source.to_string()),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(EntitlementGrant {
            entitlement_id: created.id,
            merged_with_existing: false,
            total_visits_now: created.visits_remaining,
            total_videocalls_now: created.videocalls_remaining,
        })
    }
}

/// 按用户加事务级咨询锁；SQLite 本身串行写入，无需加锁
pub(crate) fn grant_lock_statement(backend: DbBackend, user_id: i64) -> Option<Statement> {
    match backend {
        DbBackend::Postgres => Some(Statement::from_sql_and_values(
            backend,
            "SELECT pg_advisory_xact_lock($1)",
            [user_id.into()],
        )),
        _ => None,
    }
}
