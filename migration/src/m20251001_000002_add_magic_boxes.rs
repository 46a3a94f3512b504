use sea_orm_migration::prelude::*;

/// Magic box campaigns (活动)
#[derive(DeriveIden)]
enum MagicBoxCampaigns {
    Table,
    Id,
    Name,
    Description,
    IsActive,
    StartsAt,
    EndsAt,
    MaxParticipationsPerUser,
    CreatedAt,
    UpdatedAt,
}

/// Magic box prizes (奖品配置)
#[derive(DeriveIden)]
enum MagicBoxPrizes {
    Table,
    Id,
    CampaignId,
    Name,
    Description,
    PrizeType,
    Weight,
    Quantity,
    RemainingQuantity,
    SubscriptionTypeId,
    DiscountPercentage,
    VisitCount,
    VideocallCount,
    CreatedAt,
    UpdatedAt,
}

/// Consolation offers (未中奖安慰优惠)
#[derive(DeriveIden)]
enum ConsolationOffers {
    Table,
    Id,
    CampaignId,
    Title,
    Description,
    DiscountPercentage,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

/// Magic boxes (发放给用户的盒子)
#[derive(DeriveIden)]
enum MagicBoxes {
    Table,
    Id,
    CampaignId,
    UserId,
    IsOpened,
    OpenedAt,
    WonPrizeId,
    ConsolationOfferId,
    CreatedAt,
    UpdatedAt,
}

/// Magic box openings (开盒结果记录，一盒一条)
#[derive(DeriveIden)]
enum MagicBoxOpenings {
    Table,
    Id,
    BoxId,
    CampaignId,
    UserId,
    PrizeId,
    PrizeType,
    Won,
    IdempotencyKey,
    OutcomeJson,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

fn timestamp_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 活动表
        manager
            .create_table(
                Table::create()
                    .table(MagicBoxCampaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MagicBoxCampaigns::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MagicBoxCampaigns::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MagicBoxCampaigns::Description).text().null())
                    .col(
                        ColumnDef::new(MagicBoxCampaigns::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(MagicBoxCampaigns::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MagicBoxCampaigns::EndsAt)
                            .timestamp_with_time_zone()
                            .null(), // NULL = 无结束时间
                    )
                    .col(
                        ColumnDef::new(MagicBoxCampaigns::MaxParticipationsPerUser)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(&mut timestamp_col(MagicBoxCampaigns::CreatedAt))
                    .col(&mut timestamp_col(MagicBoxCampaigns::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // 奖品表
        manager
            .create_table(
                Table::create()
                    .table(MagicBoxPrizes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MagicBoxPrizes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MagicBoxPrizes::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MagicBoxPrizes::Name).string_len(255).not_null())
                    .col(ColumnDef::new(MagicBoxPrizes::Description).text().null())
                    .col(
                        ColumnDef::new(MagicBoxPrizes::PrizeType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MagicBoxPrizes::Weight).integer().not_null())
                    .col(ColumnDef::new(MagicBoxPrizes::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(MagicBoxPrizes::RemainingQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MagicBoxPrizes::SubscriptionTypeId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MagicBoxPrizes::DiscountPercentage)
                            .integer()
                            .null(),
                    )
                    .col(ColumnDef::new(MagicBoxPrizes::VisitCount).integer().null())
                    .col(ColumnDef::new(MagicBoxPrizes::VideocallCount).integer().null())
                    .col(&mut timestamp_col(MagicBoxPrizes::CreatedAt))
                    .col(&mut timestamp_col(MagicBoxPrizes::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_magic_box_prize_campaign")
                            .from(MagicBoxPrizes::Table, MagicBoxPrizes::CampaignId)
                            .to(MagicBoxCampaigns::Table, MagicBoxCampaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_magic_box_prizes_campaign")
                    .table(MagicBoxPrizes::Table)
                    .col(MagicBoxPrizes::CampaignId)
                    .to_owned(),
            )
            .await?;

        // 安慰优惠表
        manager
            .create_table(
                Table::create()
                    .table(ConsolationOffers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConsolationOffers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ConsolationOffers::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConsolationOffers::Title)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ConsolationOffers::Description).text().null())
                    .col(
                        ColumnDef::new(ConsolationOffers::DiscountPercentage)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConsolationOffers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(&mut timestamp_col(ConsolationOffers::CreatedAt))
                    .col(&mut timestamp_col(ConsolationOffers::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consolation_offer_campaign")
                            .from(ConsolationOffers::Table, ConsolationOffers::CampaignId)
                            .to(MagicBoxCampaigns::Table, MagicBoxCampaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 盒子表
        manager
            .create_table(
                Table::create()
                    .table(MagicBoxes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MagicBoxes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MagicBoxes::CampaignId).big_integer().not_null())
                    .col(ColumnDef::new(MagicBoxes::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(MagicBoxes::IsOpened)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(MagicBoxes::OpenedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(MagicBoxes::WonPrizeId).big_integer().null())
                    .col(
                        ColumnDef::new(MagicBoxes::ConsolationOfferId)
                            .big_integer()
                            .null(),
                    )
                    .col(&mut timestamp_col(MagicBoxes::CreatedAt))
                    .col(&mut timestamp_col(MagicBoxes::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_magic_box_campaign")
                            .from(MagicBoxes::Table, MagicBoxes::CampaignId)
                            .to(MagicBoxCampaigns::Table, MagicBoxCampaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_magic_boxes_user")
                    .table(MagicBoxes::Table)
                    .col(MagicBoxes::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_magic_boxes_campaign")
                    .table(MagicBoxes::Table)
                    .col(MagicBoxes::CampaignId)
                    .to_owned(),
            )
            .await?;

        // 开盒记录表（box_id 唯一，保证一盒一结果）
        manager
            .create_table(
                Table::create()
                    .table(MagicBoxOpenings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MagicBoxOpenings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MagicBoxOpenings::BoxId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(MagicBoxOpenings::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MagicBoxOpenings::UserId).big_integer().not_null())
                    .col(ColumnDef::new(MagicBoxOpenings::PrizeId).big_integer().null())
                    .col(
                        ColumnDef::new(MagicBoxOpenings::PrizeType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MagicBoxOpenings::Won).boolean().not_null())
                    .col(
                        ColumnDef::new(MagicBoxOpenings::IdempotencyKey)
                            .string_len(64)
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MagicBoxOpenings::OutcomeJson).text().not_null())
                    .col(&mut timestamp_col(MagicBoxOpenings::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_magic_box_opening_box")
                            .from(MagicBoxOpenings::Table, MagicBoxOpenings::BoxId)
                            .to(MagicBoxes::Table, MagicBoxes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：记录 -> 盒子 -> 安慰优惠 -> 奖品 -> 活动
        manager
            .drop_table(Table::drop().if_exists().table(MagicBoxOpenings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(MagicBoxes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(ConsolationOffers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(MagicBoxPrizes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(MagicBoxCampaigns::Table).to_owned())
            .await?;
        Ok(())
    }
}
