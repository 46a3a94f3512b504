use sea_orm_migration::prelude::*;

/// Subscription types (订阅类型，由订阅管理模块维护，这里只建表与初始数据)
#[derive(DeriveIden)]
enum SubscriptionTypes {
    Table,
    Id,
    Name,
    VisitCount,
    VideocallCount,
    DurationDays,
    IncludesProgram,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 初始订阅类型:
/// - Monthly Open Gym: 12 visits / 30 days
/// - Coaching Program: 8 visits + 2 videocalls / 30 days, includes a training program
/// - Online Check-in: 4 videocalls / 30 days
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SubscriptionTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubscriptionTypes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTypes::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTypes::VisitCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTypes::VideocallCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTypes::DurationDays)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTypes::IncludesProgram)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTypes::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTypes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        let seed = Query::insert()
            .into_table(SubscriptionTypes::Table)
            .columns([
                SubscriptionTypes::Name,
                SubscriptionTypes::VisitCount,
                SubscriptionTypes::VideocallCount,
                SubscriptionTypes::DurationDays,
                SubscriptionTypes::IncludesProgram,
            ])
            .values_panic(["Monthly Open Gym".into(), 12.into(), 0.into(), 30.into(), false.into()])
            .values_panic(["Coaching Program".into(), 8.into(), 2.into(), 30.into(), true.into()])
            .values_panic(["Online Check-in".into(), 0.into(), 4.into(), 30.into(), false.into()])
            .to_owned();
        let conn = manager.get_connection();
        conn.execute(manager.get_database_backend().build(&seed))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(SubscriptionTypes::Table)
                    .to_owned(),
            )
            .await
    }
}
