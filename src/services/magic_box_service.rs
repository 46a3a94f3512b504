use crate::config::MagicBoxConfig;
use crate::entities::{
    CouponSource, PrizeType, box_entity as boxes, opening_entity as openings,
    prize_entity as prizes,
};
use crate::error::{AppError, AppResult};
use crate::game::{OpenRequest, PrizeResolver, ResolveError};
use crate::models::{AuthUser, EntitlementGrant, OpenBoxCommand, OpenBoxOutcome};
use crate::services::{CouponService, EntitlementService, GrantSpec};
use crate::utils::pick_weighted;
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::{Arc, Mutex};

const GRANT_SOURCE: &str = "magic_box";
const MAX_IDEMPOTENCY_KEY_LEN: usize = 64;

/// 开盒服务：一个事务内完成 认领盒子 -> 加权抽奖 -> 扣减库存 -> 发放奖励 -> 写开盒记录
#[derive(Clone)]
pub struct MagicBoxService {
    pool: DatabaseConnection,
    entitlements: EntitlementService,
    coupons: CouponService,
    rng: Arc<Mutex<StdRng>>,
    max_draw_attempts: u32,
}

impl MagicBoxService {
    pub fn new(
        pool: DatabaseConnection,
        entitlements: EntitlementService,
        coupons: CouponService,
        cfg: &MagicBoxConfig,
    ) -> Self {
        Self {
            pool,
            entitlements,
            coupons,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            max_draw_attempts: cfg.max_draw_attempts.max(1),
        }
    }

    /// 固定随机种子（测试用，抽奖结果可复现）
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    /// 以指定调用者身份作为 [`PrizeResolver`] 使用
    pub fn resolver_for(&self, caller: AuthUser) -> ServiceResolver {
        ServiceResolver {
            service: self.clone(),
            caller,
        }
    }

    /// 开盒
    ///
    /// 逻辑:
    /// 1. 读取盒子并校验归属（管理员可代他人开盒）
    /// 2. 同一幂等键的重复请求直接返回已保存的结果
    /// 3. 条件更新 `is_opened = false -> true` 认领盒子，0 行即已被开启
    /// 4. 在有库存的奖品中按权重抽取，实际奖品原子扣减库存（失败则剔除后重抽）
    /// 5. 发放奖励，写开盒记录，提交
    pub async fn open_box(&self, cmd: OpenBoxCommand) -> AppResult<OpenBoxOutcome> {
        validate_idempotency_key(cmd.idempotency_key.as_deref())?;
        if cmd.target_user_id.is_some() && !cmd.caller.is_admin() {
            return Err(AppError::PermissionDenied);
        }

        let box_id = cmd.box_id;
        let txn = self.pool.begin().await?;

        let magic_box = boxes::Entity::find_by_id(box_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Magic box {box_id} not found")))?;
        if !cmd.caller.is_admin() && magic_box.user_id != cmd.caller.id {
            log::warn!(
                "User {} tried to open box {box_id} owned by user {}",
                cmd.caller.id,
                magic_box.user_id
            );
            return Err(AppError::PermissionDenied);
        }

        if let Some(key) = cmd.idempotency_key.as_deref()
            && let Some(outcome) = find_replay(&txn, box_id, key).await?
        {
            return Ok(outcome);
        }
        if magic_box.is_opened {
            return Err(AppError::AlreadyOpened(box_id));
        }

        let now = Utc::now();
        let claimed = boxes::Entity::update_many()
            .col_expr(boxes::Column::IsOpened, Expr::value(true))
            .col_expr(boxes::Column::OpenedAt, Expr::value(now))
            .col_expr(boxes::Column::UpdatedAt, Expr::value(now))
            .filter(boxes::Column::Id.eq(box_id))
            .filter(boxes::Column::IsOpened.eq(false))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            // 并发请求抢先开启：同一尝试的重试仍返回保存的结果
            if let Some(key) = cmd.idempotency_key.as_deref()
                && let Some(outcome) = find_replay(&txn, box_id, key).await?
            {
                return Ok(outcome);
            }
            log::warn!("Magic box {box_id} was opened by a concurrent request");
            return Err(AppError::AlreadyOpened(box_id));
        }

        let subject = cmd.target_user_id.unwrap_or(magic_box.user_id);

        let available = prizes::Entity::find()
            .filter(prizes::Column::CampaignId.eq(magic_box.campaign_id))
            .filter(prizes::Column::RemainingQuantity.gt(0))
            .order_by_asc(prizes::Column::Id)
            .all(&txn)
            .await?;

        let outcome = match self.select_and_secure_prize(&txn, available).await? {
            None => OpenBoxOutcome::lost(box_id, now, PrizeType::Nothing),
            Some(prize) if !prize.prize_type.is_win() => {
                OpenBoxOutcome::lost(box_id, now, prize.prize_type).with_prize(&prize)
            }
            Some(prize) => {
                boxes::Entity::update_many()
                    .col_expr(boxes::Column::WonPrizeId, Expr::value(prize.id))
                    .filter(boxes::Column::Id.eq(box_id))
                    .filter(boxes::Column::WonPrizeId.is_null())
                    .exec(&txn)
                    .await?;
                self.award_prize(&txn, subject, &prize, box_id, now).await?
            }
        };

        openings::ActiveModel {
            box_id: Set(box_id),
            campaign_id: Set(magic_box.campaign_id),
            user_id: Set(subject),
            prize_id: Set(outcome.prize_id),
            prize_type: Set(outcome.prize_type),
            won: Set(outcome.is_win()),
            idempotency_key: Set(cmd.idempotency_key.clone()),
            outcome_json: Set(serde_json::to_string(&outcome)?),
            created_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        if outcome.is_win() {
            log::info!(
                "Magic box {box_id} opened for user {subject}: won prize {:?} ({})",
                outcome.prize_id,
                outcome.prize_type
            );
        } else {
            log::info!(
                "Magic box {box_id} opened for user {subject}: {}",
                outcome.prize_type
            );
        }
        Ok(outcome)
    }

    /// 查询已开启盒子的结果
    pub async fn get_outcome(&self, box_id: i64, caller: &AuthUser) -> AppResult<OpenBoxOutcome> {
        let magic_box = boxes::Entity::find_by_id(box_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Magic box {box_id} not found")))?;
        if !caller.is_admin() && magic_box.user_id != caller.id {
            return Err(AppError::PermissionDenied);
        }

        let opening = openings::Entity::find()
            .filter(openings::Column::BoxId.eq(box_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Magic box {box_id} has not been opened")))?;

        let mut outcome: OpenBoxOutcome = serde_json::from_str(&opening.outcome_json)?;
        outcome.replayed = true;
        Ok(outcome)
    }

    /// 抽取并锁定奖品
    ///
    /// 实际奖品用 `remaining_quantity > 0` 条件扣减，扣减失败说明库存被并发抢光，
    /// 剔除后重抽。候选为空时返回 None（按 nothing 处理）。
    async fn select_and_secure_prize(
        &self,
        txn: &DatabaseTransaction,
        mut candidates: Vec<prizes::Model>,
    ) -> AppResult<Option<prizes::Model>> {
        for attempt in 1..=self.max_draw_attempts {
            let chosen = {
                let mut rng = self
                    .rng
                    .lock()
                    .map_err(|_| AppError::InternalError("Draw RNG poisoned".into()))?;
                pick_weighted(&candidates, &mut *rng).cloned()
            };
            let Some(chosen) = chosen else {
                return Ok(None);
            };

            // nothing / try_again 不消耗库存
            if !chosen.prize_type.is_win() {
                return Ok(Some(chosen));
            }

            let result = prizes::Entity::update_many()
                .col_expr(
                    prizes::Column::RemainingQuantity,
                    Expr::col(prizes::Column::RemainingQuantity).sub(1),
                )
                .col_expr(prizes::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(prizes::Column::Id.eq(chosen.id))
                .filter(prizes::Column::RemainingQuantity.gt(0))
                .exec(txn)
                .await?;

            if result.rows_affected == 1 {
                let secured = prizes::Entity::find_by_id(chosen.id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        DbErr::Custom(format!("Prize {} disappeared after decrement", chosen.id))
                    })?;
                return Ok(Some(secured));
            }

            log::warn!(
                "Prize {} ran out of stock during draw (attempt {attempt})",
                chosen.id
            );
            candidates.retain(|p| p.id != chosen.id);
            if candidates.is_empty() {
                return Ok(None);
            }
        }

        // 暂时性错误：事务回滚，盒子保持未开启
        Err(DbErr::Custom("Failed to secure a prize after several attempts".into()).into())
    }

    /// 按奖品类型发放奖励（在开盒事务内）:
    /// - subscription -> 订阅权益（次数默认取订阅类型，奖品上的次数优先）
    /// - visit_package / videocall_package -> 次数权益，累加到已有余额
    /// - discount_coupon -> 生成折扣券
    /// - custom -> 线下兑现，不自动发放
    async fn award_prize(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
        prize: &prizes::Model,
        box_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<OpenBoxOutcome> {
        let mut outcome = OpenBoxOutcome::won(box_id, now, prize);

        match prize.prize_type {
            PrizeType::Subscription => {
                let type_id = prize.subscription_type_id.ok_or_else(|| {
                    AppError::InternalError(format!("Prize {} has no subscription type", prize.id))
                })?;
                let sub_type = self
                    .entitlements
                    .find_subscription_type_in(txn, type_id)
                    .await
                    .map_err(|e| match e {
                        AppError::NotFound(msg) => AppError::InternalError(msg),
                        other => other,
                    })?;

                let spec = GrantSpec {
                    subscription_type_id: Some(type_id),
                    visits: prize.visit_count.unwrap_or(sub_type.visit_count),
                    videocalls: prize.videocall_count.unwrap_or(sub_type.videocall_count),
                    duration_days: Some(sub_type.duration_days),
                };
                let grant = self
                    .entitlements
                    .grant_in(txn, user_id, spec, GRANT_SOURCE, now)
                    .await?;

                outcome.subscription_type_id = Some(type_id);
                outcome.includes_program = Some(sub_type.includes_program);
                apply_grant(&mut outcome, &spec, grant);
            }
            PrizeType::VisitPackage | PrizeType::VideocallPackage => {
                let spec = GrantSpec {
                    subscription_type_id: None,
                    visits: prize.visit_count.unwrap_or(0),
                    videocalls: prize.videocall_count.unwrap_or(0),
                    duration_days: None,
                };
                let grant = self
                    .entitlements
                    .grant_in(txn, user_id, spec, GRANT_SOURCE, now)
                    .await?;
                apply_grant(&mut outcome, &spec, grant);
            }
            PrizeType::DiscountCoupon => {
                let pct = prize.discount_percentage.unwrap_or(0);
                let coupon = self
                    .coupons
                    .issue_in(txn, user_id, pct, CouponSource::MagicBox, Some(box_id), now)
                    .await?;
                outcome.discount_percentage = Some(coupon.discount_percentage);
                outcome.discount_code = Some(coupon.code);
            }
            PrizeType::Custom | PrizeType::TryAgain | PrizeType::Nothing => {}
        }

        Ok(outcome)
    }
}

fn apply_grant(outcome: &mut OpenBoxOutcome, spec: &GrantSpec, grant: EntitlementGrant) {
    outcome.visit_count = Some(spec.visits);
    outcome.videocall_count = Some(spec.videocalls);
    outcome.merged_with_existing = Some(grant.merged_with_existing);
    outcome.total_visits_now = Some(grant.total_visits_now);
    outcome.total_videocalls_now = Some(grant.total_videocalls_now);
}

fn validate_idempotency_key(key: Option<&str>) -> AppResult<()> {
    if let Some(key) = key
        && (key.trim().is_empty() || key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN)
    {
        return Err(AppError::ValidationError(format!(
            "idempotency_key must be between 1 and {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    Ok(())
}

/// 同一幂等键已有开盒记录时返回保存的结果；键被其他盒子用过则拒绝
async fn find_replay<C: ConnectionTrait>(
    db: &C,
    box_id: i64,
    key: &str,
) -> AppResult<Option<OpenBoxOutcome>> {
    let Some(opening) = openings::Entity::find()
        .filter(openings::Column::IdempotencyKey.eq(key))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    if opening.box_id != box_id {
        return Err(AppError::ValidationError(
            "idempotency_key was already used for another box".into(),
        ));
    }

    let mut outcome: OpenBoxOutcome = serde_json::from_str(&opening.outcome_json)?;
    outcome.replayed = true;
    log::info!("Replaying stored outcome of magic box {box_id}");
    Ok(Some(outcome))
}

/// 进程内的 [`PrizeResolver`]，错误按错误码转换
pub struct ServiceResolver {
    service: MagicBoxService,
    caller: AuthUser,
}

impl PrizeResolver for ServiceResolver {
    async fn resolve(&self, request: &OpenRequest) -> Result<OpenBoxOutcome, ResolveError> {
        let cmd = OpenBoxCommand::new(request.box_id, self.caller)
            .with_idempotency_key(request.idempotency_key.clone());
        self.service
            .open_box(cmd)
            .await
            .map_err(|e| ResolveError::from_code(e.code(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::entities::{discount_coupon_entity as coupons, entitlement_entity as entitlements};
    use crate::game::{GameResult, GridGame};
    use crate::services::test_support::*;
    use sea_orm::PaginatorTrait;

    fn service(pool: &DatabaseConnection, seed: u64) -> MagicBoxService {
        let cfg = MagicBoxConfig::default();
        MagicBoxService::new(
            pool.clone(),
            EntitlementService::new(pool.clone()),
            CouponService::new(pool.clone(), cfg.coupon_valid_days),
            &cfg,
        )
        .with_seed(seed)
    }

    async fn open(svc: &MagicBoxService, box_id: i64, user_id: i64) -> AppResult<OpenBoxOutcome> {
        svc.open_box(OpenBoxCommand::new(box_id, member(user_id)))
            .await
    }

    async fn opening_count(pool: &DatabaseConnection) -> u64 {
        openings::Entity::find().count(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_win_claims_box_and_decrements_once() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        let prize = insert_prize(&pool, campaign.id, PrizeType::Custom, 1, 3).await;
        let b = insert_box(&pool, campaign.id, 1).await;
        let svc = service(&pool, 1);

        let outcome = open(&svc, b.id, 1).await.unwrap();
        assert!(outcome.is_win());
        assert_eq!(outcome.prize_id, Some(prize.id));
        assert!(!outcome.replayed);

        let stored = reload_box(&pool, b.id).await;
        assert!(stored.is_opened);
        assert!(stored.opened_at.is_some());
        assert_eq!(stored.won_prize_id, Some(prize.id));
        assert_eq!(reload_prize(&pool, prize.id).await.remaining_quantity, 2);
        assert_eq!(opening_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_second_open_is_already_opened() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        let prize = insert_prize(&pool, campaign.id, PrizeType::Custom, 1, 3).await;
        let b = insert_box(&pool, campaign.id, 1).await;
        let svc = service(&pool, 1);

        open(&svc, b.id, 1).await.unwrap();
        let before = reload_box(&pool, b.id).await;

        let err = open(&svc, b.id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyOpened(id) if id == b.id));
        assert_eq!(reload_box(&pool, b.id).await, before);
        assert_eq!(reload_prize(&pool, prize.id).await.remaining_quantity, 2);
        assert_eq!(opening_count(&pool).await, 1);
    }

    // 测试库只有一个连接，各任务的事务实际依次执行；这里验证的是重复请求只生效一次，
    // 真正的行级竞争依赖 Postgres 上的条件更新
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_resolve_exactly_once() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        let prize = insert_prize(&pool, campaign.id, PrizeType::Custom, 1, 10).await;
        let b = insert_box(&pool, campaign.id, 1).await;
        let svc = service(&pool, 3);
        let box_id = b.id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.open_box(OpenBoxCommand::new(box_id, member(1))).await })
            })
            .collect();

        let mut opened = 0;
        let mut already = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => opened += 1,
                Err(AppError::AlreadyOpened(_)) => already += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(opened, 1);
        assert_eq!(already, 7);
        assert_eq!(reload_prize(&pool, prize.id).await.remaining_quantity, 9);
        assert_eq!(opening_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_exhausted_prize_is_never_drawn() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 50).await;
        let exhausted = insert_prize_with(&pool, campaign.id, PrizeType::Custom, 1000, 5, |am| {
            am.remaining_quantity = Set(0);
        })
        .await;
        insert_prize(&pool, campaign.id, PrizeType::Nothing, 1, 1).await;
        let svc = service(&pool, 9);

        for _ in 0..30 {
            let b = insert_box(&pool, campaign.id, 1).await;
            let outcome = open(&svc, b.id, 1).await.unwrap();
            assert_ne!(outcome.prize_id, Some(exhausted.id));
            assert_eq!(outcome.prize_type, PrizeType::Nothing);
        }
        assert_eq!(reload_prize(&pool, exhausted.id).await.remaining_quantity, 0);
    }

    #[tokio::test]
    async fn test_non_win_never_decrements_or_marks_prize() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 10).await;
        let try_again = insert_prize(&pool, campaign.id, PrizeType::TryAgain, 1, 1).await;
        let svc = service(&pool, 4);

        for _ in 0..5 {
            let b = insert_box(&pool, campaign.id, 2).await;
            let outcome = open(&svc, b.id, 2).await.unwrap();
            assert!(!outcome.is_win());
            assert_eq!(outcome.prize_type, PrizeType::TryAgain);
            assert_eq!(outcome.prize_id, Some(try_again.id));

            let stored = reload_box(&pool, b.id).await;
            assert!(stored.is_opened);
            assert!(stored.won_prize_id.is_none());
        }
        assert_eq!(reload_prize(&pool, try_again.id).await.remaining_quantity, 1);
    }

    #[tokio::test]
    async fn test_stock_never_goes_negative() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 10).await;
        let prize = insert_prize(&pool, campaign.id, PrizeType::Custom, 1, 2).await;
        let svc = service(&pool, 5);

        let mut last = prize.remaining_quantity;
        let mut wins = 0;
        for _ in 0..4 {
            let b = insert_box(&pool, campaign.id, 1).await;
            if open(&svc, b.id, 1).await.unwrap().is_win() {
                wins += 1;
            }
            let now = reload_prize(&pool, prize.id).await.remaining_quantity;
            assert!(now <= last && now >= 0);
            last = now;
        }
        assert_eq!(wins, 2);
        assert_eq!(last, 0);
    }

    #[tokio::test]
    async fn test_campaign_without_prizes_resolves_to_nothing() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 1).await;
        let b = insert_box(&pool, campaign.id, 1).await;
        let svc = service(&pool, 6);

        let outcome = open(&svc, b.id, 1).await.unwrap();
        assert_eq!(outcome.prize_type, PrizeType::Nothing);
        assert!(outcome.prize_id.is_none());
        assert!(reload_box(&pool, b.id).await.is_opened);
    }

    #[tokio::test]
    async fn test_subscription_and_nothing_scenario() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 500).await;
        let a = insert_prize_with(&pool, campaign.id, PrizeType::Subscription, 1, 1, |am| {
            am.subscription_type_id = Set(Some(1));
        })
        .await;
        let b_prize = insert_prize(&pool, campaign.id, PrizeType::Nothing, 9, 100).await;
        let svc = service(&pool, 2024);

        // A 被抽中之前：A 库存保持 1，盒子没有中奖奖品
        let mut won_box = None;
        for _ in 0..200 {
            let b = insert_box(&pool, campaign.id, 1).await;
            let outcome = open(&svc, b.id, 1).await.unwrap();
            let stored = reload_box(&pool, b.id).await;
            if outcome.prize_id == Some(a.id) {
                assert_eq!(stored.won_prize_id, Some(a.id));
                won_box = Some(b.id);
                break;
            }
            assert_eq!(outcome.prize_type, PrizeType::Nothing);
            assert!(stored.won_prize_id.is_none());
            assert_eq!(reload_prize(&pool, a.id).await.remaining_quantity, 1);
        }
        assert!(won_box.is_some(), "prize A should be drawn eventually");
        assert_eq!(reload_prize(&pool, a.id).await.remaining_quantity, 0);

        // A 抽完后不会再出现
        for _ in 0..30 {
            let b = insert_box(&pool, campaign.id, 1).await;
            let outcome = open(&svc, b.id, 1).await.unwrap();
            assert_ne!(outcome.prize_id, Some(a.id));
        }
        assert_eq!(reload_prize(&pool, b_prize.id).await.remaining_quantity, 100);
    }

    #[tokio::test]
    async fn test_subscription_prize_grants_and_merges() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        // 种子数据: id 2 = Coaching Program (8 visits, 2 videocalls, includes program)
        insert_prize_with(&pool, campaign.id, PrizeType::Subscription, 1, 2, |am| {
            am.subscription_type_id = Set(Some(2));
        })
        .await;
        let svc = service(&pool, 7);

        let first = insert_box(&pool, campaign.id, 3).await;
        let outcome = open(&svc, first.id, 3).await.unwrap();
        assert_eq!(outcome.includes_program, Some(true));
        assert_eq!(outcome.subscription_type_id, Some(2));
        assert_eq!(outcome.visit_count, Some(8));
        assert_eq!(outcome.merged_with_existing, Some(false));

        let second = insert_box(&pool, campaign.id, 3).await;
        let outcome = open(&svc, second.id, 3).await.unwrap();
        assert_eq!(outcome.merged_with_existing, Some(true));
        assert_eq!(outcome.total_visits_now, Some(16));
        assert_eq!(outcome.total_videocalls_now, Some(4));

        let rows = entitlements::Entity::find()
            .filter(entitlements::Column::UserId.eq(3))
            .count(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_discount_prize_issues_coupon() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        insert_prize_with(&pool, campaign.id, PrizeType::DiscountCoupon, 1, 5, |am| {
            am.discount_percentage = Set(Some(25));
        })
        .await;
        let b = insert_box(&pool, campaign.id, 4).await;
        let svc = service(&pool, 8);

        let outcome = open(&svc, b.id, 4).await.unwrap();
        assert_eq!(outcome.discount_percentage, Some(25));
        let code = outcome.discount_code.unwrap();
        assert!(code.starts_with("MB-"));

        let coupon = coupons::Entity::find()
            .filter(coupons::Column::Code.eq(code.as_str()))
            .one(&pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(coupon.user_id, 4);
        assert_eq!(coupon.box_id, Some(b.id));
    }

    #[tokio::test]
    async fn test_idempotent_retry_replays_stored_outcome() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        let prize = insert_prize(&pool, campaign.id, PrizeType::Custom, 1, 5).await;
        let b = insert_box(&pool, campaign.id, 1).await;
        let other = insert_box(&pool, campaign.id, 1).await;
        let svc = service(&pool, 10);

        let cmd = OpenBoxCommand::new(b.id, member(1)).with_idempotency_key("attempt-1");
        let first = svc.open_box(cmd.clone()).await.unwrap();
        let again = svc.open_box(cmd).await.unwrap();
        assert!(again.replayed);
        assert_eq!(again.prize_id, first.prize_id);
        assert_eq!(again.opened_at, first.opened_at);
        assert_eq!(reload_prize(&pool, prize.id).await.remaining_quantity, 4);

        let fresh_key = OpenBoxCommand::new(b.id, member(1)).with_idempotency_key("attempt-2");
        assert!(matches!(
            svc.open_box(fresh_key).await,
            Err(AppError::AlreadyOpened(_))
        ));

        let reused = OpenBoxCommand::new(other.id, member(1)).with_idempotency_key("attempt-1");
        assert!(matches!(
            svc.open_box(reused).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(!reload_box(&pool, other.id).await.is_opened);
    }

    #[tokio::test]
    async fn test_permissions() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        insert_prize_with(&pool, campaign.id, PrizeType::VisitPackage, 1, 5, |am| {
            am.visit_count = Set(Some(4));
        })
        .await;
        let b = insert_box(&pool, campaign.id, 1).await;
        let svc = service(&pool, 11);

        assert!(matches!(open(&svc, b.id, 2).await, Err(AppError::PermissionDenied)));
        let preview = OpenBoxCommand::new(b.id, member(1)).with_target_user(5);
        assert!(matches!(
            svc.open_box(preview).await,
            Err(AppError::PermissionDenied)
        ));
        assert!(matches!(open(&svc, 9999, 1).await, Err(AppError::NotFound(_))));
        assert!(!reload_box(&pool, b.id).await.is_opened);

        // 管理员代用户 5 开盒，奖励归属用户 5
        let preview = OpenBoxCommand::new(b.id, admin(100)).with_target_user(5);
        let outcome = svc.open_box(preview).await.unwrap();
        assert_eq!(outcome.total_visits_now, Some(4));
        let granted = entitlements::Entity::find()
            .filter(entitlements::Column::UserId.eq(5))
            .one(&pool)
            .await
            .unwrap();
        assert!(granted.is_some());
    }

    #[tokio::test]
    async fn test_invalid_idempotency_key_rejected_before_db() {
        let pool = test_pool().await;
        let svc = service(&pool, 12);
        let cmd = OpenBoxCommand::new(1, member(1)).with_idempotency_key("x".repeat(65));
        assert!(matches!(
            svc.open_box(cmd).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_idempotency_key_length_counts_characters() {
        // 40 个字符，80 字节
        let key = "é".repeat(40);
        assert!(validate_idempotency_key(Some(&key)).is_ok());
        assert!(validate_idempotency_key(Some(&"é".repeat(64))).is_ok());
        assert!(matches!(
            validate_idempotency_key(Some(&"é".repeat(65))),
            Err(AppError::ValidationError(_))
        ));
        assert!(validate_idempotency_key(Some("   ")).is_err());
    }

    #[tokio::test]
    async fn test_get_outcome() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        insert_prize(&pool, campaign.id, PrizeType::Nothing, 1, 1).await;
        let b = insert_box(&pool, campaign.id, 1).await;
        let svc = service(&pool, 13);

        assert!(matches!(
            svc.get_outcome(b.id, &member(1)).await,
            Err(AppError::NotFound(_))
        ));
        let opened = open(&svc, b.id, 1).await.unwrap();
        let stored = svc.get_outcome(b.id, &member(1)).await.unwrap();
        assert!(stored.replayed);
        assert_eq!(stored.prize_type, opened.prize_type);
        assert!(matches!(
            svc.get_outcome(b.id, &member(2)).await,
            Err(AppError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_grid_game_against_service() {
        let pool = test_pool().await;
        let campaign = insert_campaign(&pool, 5).await;
        insert_prize(&pool, campaign.id, PrizeType::Nothing, 1, 1).await;
        let b = insert_box(&pool, campaign.id, 1).await;
        let svc = service(&pool, 14);
        let resolver = svc.resolver_for(member(1));

        let mut game = GridGame::new(StdRng::seed_from_u64(1));
        game.start(b.id).unwrap();
        let result = game.play(17, &resolver).await.unwrap();
        assert!(matches!(result, GameResult::Lost { .. }));
        assert!(game.play_again(b.id).is_err());

        // 新的游戏实例（如刷新页面）也无法重开同一个盒子
        let mut reloaded = GridGame::new(StdRng::seed_from_u64(2));
        reloaded.start(b.id).unwrap();
        let result = reloaded.play(3, &resolver).await.unwrap();
        assert_eq!(
            result,
            &GameResult::Failed {
                error: ResolveError::AlreadyOpened,
                retry: None
            }
        );
    }
}
