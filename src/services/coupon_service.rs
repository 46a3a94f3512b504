use crate::entities::{CouponSource, discount_coupon_entity as coupons};
use crate::error::{AppError, AppResult};
use crate::models::DiscountCouponResponse;
use crate::utils::generate_coupon_code;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct CouponService {
    pool: DatabaseConnection,
    valid_days: i64,
}

impl CouponService {
    pub fn new(pool: DatabaseConnection, valid_days: i64) -> Self {
        Self { pool, valid_days }
    }

    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<DiscountCouponResponse>> {
        let list = coupons::Entity::find()
            .filter(coupons::Column::UserId.eq(user_id))
            .order_by_desc(coupons::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 发放折扣券（在调用方事务内执行）
    pub async fn issue_in<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
        discount_percentage: i32,
        source: CouponSource,
        box_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<coupons::Model> {
        let prefix = match source {
            CouponSource::MagicBox => "MB",
            CouponSource::Consolation => "CS",
        };
        let code = self.unique_code(db, prefix).await?;

        let coupon = coupons::ActiveModel {
            user_id: Set(user_id),
            code: Set(code),
            discount_percentage: Set(discount_percentage),
            source: Set(source),
            box_id: Set(box_id),
            is_used: Set(false),
            expires_at: Set(now + Duration::days(self.valid_days)),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(coupon)
    }

    async fn unique_code<C: ConnectionTrait>(&self, db: &C, prefix: &str) -> AppResult<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_coupon_code(prefix);
            let exists = coupons::Entity::find()
                .filter(coupons::Column::Code.eq(code.as_str()))
                .count(db)
                .await?;
            if exists == 0 {
                return Ok(code);
            }
        }
        Err(AppError::InternalError(
            "Failed to generate a unique coupon code".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    #[tokio::test]
    async fn test_issue_coupon_with_expiry() {
        let pool = test_pool().await;
        let svc = CouponService::new(pool.clone(), 30);
        let now = Utc::now();
        let coupon = svc
            .issue_in(&pool, 3, 15, CouponSource::Consolation, Some(11), now)
            .await
            .unwrap();
        assert!(coupon.code.starts_with("CS-"));
        assert_eq!(coupon.discount_percentage, 15);
        assert_eq!((coupon.expires_at - now).num_days(), 30);

        let listed = svc.list_for_user(3).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].box_id, Some(11));
    }
}
