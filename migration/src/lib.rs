pub use sea_orm_migration::prelude::*;

mod m20251001_000001_add_subscription_types;
mod m20251001_000002_add_magic_boxes;
mod m20251003_000001_add_rewards;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_add_subscription_types::Migration),
            Box::new(m20251001_000002_add_magic_boxes::Migration),
            Box::new(m20251003_000001_add_rewards::Migration),
        ]
    }
}
