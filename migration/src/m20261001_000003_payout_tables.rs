//! 结算批次与业绩缓存表
//!
//! - affiliate_payouts：按 (payee, event) 汇总的结算批次
//! - affiliate_performance_cache：按 (affiliate, period) 的派生汇总，可随时重建

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AffiliatePayouts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliatePayouts::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::PayeeKind)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::PayeeId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::EventId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::OrganizerId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::ConversionIds)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::ConversionCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::TotalRevenueCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::GrossAmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::NetAmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(AffiliatePayouts::FailureReason).text().null())
                    .col(
                        ColumnDef::new(AffiliatePayouts::TransactionReference)
                            .string_len(255)
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payouts_payee")
                    .table(AffiliatePayouts::Table)
                    .col(AffiliatePayouts::PayeeId)
                    .col(AffiliatePayouts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payouts_organizer_status")
                    .table(AffiliatePayouts::Table)
                    .col(AffiliatePayouts::OrganizerId)
                    .col(AffiliatePayouts::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AffiliatePerformanceCache::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::AffiliateId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::Period)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::WindowStart)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::WindowEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::TotalClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::UniqueVisitors)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::Conversions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::RevenueCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::CommissionCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::ConversionRate)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(AffiliatePerformanceCache::RefreshedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // upsert 冲突键
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_performance_cache_unique")
                    .table(AffiliatePerformanceCache::Table)
                    .col(AffiliatePerformanceCache::AffiliateId)
                    .col(AffiliatePerformanceCache::Period)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(AffiliatePerformanceCache::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(AffiliatePayouts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AffiliatePayouts {
    #[sea_orm(iden = "affiliate_payouts")]
    Table,
    Id,
    PayeeKind,
    PayeeId,
    EventId,
    OrganizerId,
    Status,
    ConversionIds,
    ConversionCount,
    TotalRevenueCents,
    GrossAmountCents,
    NetAmountCents,
    PeriodStart,
    PeriodEnd,
    CreatedAt,
    UpdatedAt,
    ApprovedAt,
    CompletedAt,
    FailureReason,
    TransactionReference,
}

#[derive(DeriveIden)]
enum AffiliatePerformanceCache {
    #[sea_orm(iden = "affiliate_performance_cache")]
    Table,
    Id,
    AffiliateId,
    Period,
    WindowStart,
    WindowEnd,
    TotalClicks,
    UniqueVisitors,
    Conversions,
    RevenueCents,
    CommissionCents,
    ConversionRate,
    RefreshedAt,
}
