use sea_orm_migration::prelude::*;

/// User entitlements (用户权益: 订阅 / 到店次数 / 视频通话次数)
#[derive(DeriveIden)]
enum UserEntitlements {
    Table,
    Id,
    UserId,
    SubscriptionTypeId,
    VisitsRemaining,
    VideocallsRemaining,
    ExpiresAt,
    Source,
    CreatedAt,
    UpdatedAt,
}

/// Discount coupons (折扣券)
#[derive(DeriveIden)]
enum DiscountCoupons {
    Table,
    Id,
    UserId,
    Code,
    DiscountPercentage,
    Source,
    BoxId,
    IsUsed,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserEntitlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserEntitlements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserEntitlements::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserEntitlements::SubscriptionTypeId)
                            .big_integer()
                            .null(), // NULL = 单独的次数包
                    )
                    .col(
                        ColumnDef::new(UserEntitlements::VisitsRemaining)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserEntitlements::VideocallsRemaining)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserEntitlements::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserEntitlements::Source)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserEntitlements::CreatedAt)
                            .timestamp_with_time_zone()
                            .null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserEntitlements::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_entitlements_user")
                    .table(UserEntitlements::Table)
                    .col(UserEntitlements::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DiscountCoupons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiscountCoupons::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DiscountCoupons::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountCoupons::Code)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DiscountCoupons::DiscountPercentage)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountCoupons::Source)
                            .string_len(32)
                            .not_null(),
                    )
                    // 不加外键：盒子删除后优惠券仍然有效
                    .col(ColumnDef::new(DiscountCoupons::BoxId).big_integer().null())
                    .col(
                        ColumnDef::new(DiscountCoupons::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(DiscountCoupons::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountCoupons::CreatedAt)
                            .timestamp_with_time_zone()
                            .null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DiscountCoupons::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_discount_coupons_user")
                    .table(DiscountCoupons::Table)
                    .col(DiscountCoupons::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(DiscountCoupons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(UserEntitlements::Table).to_owned())
            .await?;
        Ok(())
    }
}
