//! 佣金配置与转化记录表
//!
//! - event_commission_configs：每个活动唯一一份佣金策略（event_id 为主键）
//! - referral_conversions：每张归因成功的门票一条不可变的财务快照

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventCommissionConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventCommissionConfigs::EventId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::OrganizerId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::PlatformFeeType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::PlatformFeeBps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::PlatformFeeFixedCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::PlatformFeeCapCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AgencyCommissionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AgencyCommissionBps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AgencyCommissionFixedCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AffiliateCommissionEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AffiliateCommissionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AffiliateCommissionBps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AffiliateCommissionFixedCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AffiliateCommissionBase)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::MultiTierEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::Tier2Bps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::Tier3Bps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AttributionModel)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::AttributionWindowDays)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::PayoutFrequency)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::PayoutDelayDays)
                            .integer()
                            .not_null()
                            .default(7),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::MinimumPayoutCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventCommissionConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_commission_configs_organizer")
                    .table(EventCommissionConfigs::Table)
                    .col(EventCommissionConfigs::OrganizerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReferralConversions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferralConversions::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    // 幂等键：同一张票只能产生一条转化
                    .col(
                        ColumnDef::new(ReferralConversions::TicketId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::EventId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::LinkId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReferralConversions::ClickId).big_integer().null())
                    .col(
                        ColumnDef::new(ReferralConversions::AffiliateId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::AgencyId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::Tier2AffiliateId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::TicketPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::PlatformFeeCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::OrganizerRevenueCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::AgencyCommissionCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::AffiliateCommissionCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::Tier2CommissionCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::OrganizerNetCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::AttributionModel)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::AttributedClicks)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::ConfigSnapshot)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::CalculationBreakdown)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::AgencyPayoutStatus)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::AgencyPayoutId)
                            .string_len(36)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::AffiliatePayoutStatus)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::AffiliatePayoutId)
                            .string_len(36)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::ConvertedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralConversions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 结算调度：按活动 + 状态 + 时间筛选
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_conversions_event_payout")
                    .table(ReferralConversions::Table)
                    .col(ReferralConversions::EventId)
                    .col(ReferralConversions::AffiliatePayoutStatus)
                    .col(ReferralConversions::ConvertedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_conversions_affiliate_time")
                    .table(ReferralConversions::Table)
                    .col(ReferralConversions::AffiliateId)
                    .col(ReferralConversions::ConvertedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReferralConversions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(EventCommissionConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EventCommissionConfigs {
    #[sea_orm(iden = "event_commission_configs")]
    Table,
    EventId,
    OrganizerId,
    PlatformFeeType,
    PlatformFeeBps,
    PlatformFeeFixedCents,
    PlatformFeeCapCents,
    AgencyCommissionType,
    AgencyCommissionBps,
    AgencyCommissionFixedCents,
    AffiliateCommissionEnabled,
    AffiliateCommissionType,
    AffiliateCommissionBps,
    AffiliateCommissionFixedCents,
    AffiliateCommissionBase,
    MultiTierEnabled,
    #[sea_orm(iden = "tier_2_bps")]
    Tier2Bps,
    #[sea_orm(iden = "tier_3_bps")]
    Tier3Bps,
    AttributionModel,
    AttributionWindowDays,
    PayoutFrequency,
    PayoutDelayDays,
    MinimumPayoutCents,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReferralConversions {
    #[sea_orm(iden = "referral_conversions")]
    Table,
    Id,
    TicketId,
    EventId,
    LinkId,
    ClickId,
    AffiliateId,
    AgencyId,
    #[sea_orm(iden = "tier_2_affiliate_id")]
    Tier2AffiliateId,
    TicketPriceCents,
    PlatformFeeCents,
    OrganizerRevenueCents,
    AgencyCommissionCents,
    AffiliateCommissionCents,
    #[sea_orm(iden = "tier_2_commission_cents")]
    Tier2CommissionCents,
    OrganizerNetCents,
    AttributionModel,
    AttributedClicks,
    ConfigSnapshot,
    CalculationBreakdown,
    Status,
    AgencyPayoutStatus,
    AgencyPayoutId,
    AffiliatePayoutStatus,
    AffiliatePayoutId,
    ConvertedAt,
    CreatedAt,
}
