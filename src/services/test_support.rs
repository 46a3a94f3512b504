//! Row fixtures shared by the service tests.

use crate::entities::{
    PrizeType, box_entity as boxes, campaign_entity as campaigns, prize_entity as prizes,
};
use crate::models::{AuthUser, Role};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

pub fn member(id: i64) -> AuthUser {
    AuthUser {
        id,
        role: Role::Member,
    }
}

pub fn admin(id: i64) -> AuthUser {
    AuthUser {
        id,
        role: Role::Admin,
    }
}

pub async fn insert_campaign(pool: &DatabaseConnection, max_per_user: i32) -> campaigns::Model {
    let now = Utc::now();
    campaigns::ActiveModel {
        name: Set("Spring magic boxes".into()),
        description: Set(None),
        is_active: Set(true),
        starts_at: Set(now),
        ends_at: Set(None),
        max_participations_per_user: Set(max_per_user),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert campaign")
}

pub async fn insert_prize(
    pool: &DatabaseConnection,
    campaign_id: i64,
    prize_type: PrizeType,
    weight: i32,
    quantity: i32,
) -> prizes::Model {
    insert_prize_with(pool, campaign_id, prize_type, weight, quantity, |_| {}).await
}

pub async fn insert_prize_with(
    pool: &DatabaseConnection,
    campaign_id: i64,
    prize_type: PrizeType,
    weight: i32,
    quantity: i32,
    customize: impl FnOnce(&mut prizes::ActiveModel),
) -> prizes::Model {
    let now = Utc::now();
    let mut am = prizes::ActiveModel {
        campaign_id: Set(campaign_id),
        name: Set(format!("{prize_type} prize")),
        description: Set(Some(format!("A {prize_type} prize"))),
        prize_type: Set(prize_type),
        weight: Set(weight),
        quantity: Set(quantity),
        remaining_quantity: Set(quantity),
        subscription_type_id: Set(None),
        discount_percentage: Set(None),
        visit_count: Set(None),
        videocall_count: Set(None),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    };
    customize(&mut am);
    am.insert(pool).await.expect("insert prize")
}

pub async fn insert_box(pool: &DatabaseConnection, campaign_id: i64, user_id: i64) -> boxes::Model {
    let now = Utc::now();
    boxes::ActiveModel {
        campaign_id: Set(campaign_id),
        user_id: Set(user_id),
        is_opened: Set(false),
        opened_at: Set(None),
        won_prize_id: Set(None),
        consolation_offer_id: Set(None),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert box")
}

pub async fn reload_prize(pool: &DatabaseConnection, id: i64) -> prizes::Model {
    prizes::Entity::find_by_id(id)
        .one(pool)
        .await
        .expect("query prize")
        .expect("prize exists")
}

pub async fn reload_box(pool: &DatabaseConnection, id: i64) -> boxes::Model {
    boxes::Entity::find_by_id(id)
        .one(pool)
        .await
        .expect("query box")
        .expect("box exists")
}
