//! 推广链接与点击表
//!
//! - referral_links：一个活动的一条可追踪链接，归属 affiliate 或 agency 之一
//! - referral_clicks：访客点击记录（指纹而非原始 IP）

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReferralLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferralLinks::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReferralLinks::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ReferralLinks::ShortCode)
                            .string_len(16)
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ReferralLinks::EventId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReferralLinks::AffiliateId).string_len(64).null())
                    .col(ColumnDef::new(ReferralLinks::AgencyId).string_len(64).null())
                    .col(
                        ColumnDef::new(ReferralLinks::ParentAffiliateId)
                            .string_len(64)
                            .null(),
                    )
                    .col(ColumnDef::new(ReferralLinks::TargetUrl).text().null())
                    .col(ColumnDef::new(ReferralLinks::UtmSource).string_len(255).null())
                    .col(ColumnDef::new(ReferralLinks::UtmMedium).string_len(255).null())
                    .col(ColumnDef::new(ReferralLinks::UtmCampaign).string_len(255).null())
                    .col(
                        ColumnDef::new(ReferralLinks::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(ReferralLinks::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ReferralLinks::MaxUses).big_integer().null())
                    .col(
                        ColumnDef::new(ReferralLinks::UseCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReferralLinks::ClickCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReferralLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralLinks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralLinks::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_referral_links_event")
                    .table(ReferralLinks::Table)
                    .col(ReferralLinks::EventId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_referral_links_affiliate")
                    .table(ReferralLinks::Table)
                    .col(ReferralLinks::AffiliateId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReferralClicks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferralClicks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReferralClicks::LinkId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralClicks::EventId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReferralClicks::AffiliateId).string_len(64).null())
                    .col(ColumnDef::new(ReferralClicks::AgencyId).string_len(64).null())
                    .col(
                        ColumnDef::new(ReferralClicks::VisitorFingerprint)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralClicks::DeviceType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReferralClicks::Browser).string_len(64).null())
                    .col(ColumnDef::new(ReferralClicks::Os).string_len(64).null())
                    .col(ColumnDef::new(ReferralClicks::Referrer).text().null())
                    .col(ColumnDef::new(ReferralClicks::UtmSource).string_len(255).null())
                    .col(
                        ColumnDef::new(ReferralClicks::IsBot)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ReferralClicks::ClickedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralClicks::Converted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ReferralClicks::ConversionId)
                            .string_len(36)
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 去重查询：link + visitor + 时间
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_referral_clicks_dedupe")
                    .table(ReferralClicks::Table)
                    .col(ReferralClicks::LinkId)
                    .col(ReferralClicks::VisitorFingerprint)
                    .col(ReferralClicks::ClickedAt)
                    .to_owned(),
            )
            .await?;

        // 归因历史：按链接的时间序列
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_referral_clicks_link_time")
                    .table(ReferralClicks::Table)
                    .col(ReferralClicks::LinkId)
                    .col(ReferralClicks::ClickedAt)
                    .to_owned(),
            )
            .await?;

        // 业绩汇总：按 affiliate + 时间
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_referral_clicks_affiliate_time")
                    .table(ReferralClicks::Table)
                    .col(ReferralClicks::AffiliateId)
                    .col(ReferralClicks::ClickedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReferralClicks::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ReferralLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReferralLinks {
    #[sea_orm(iden = "referral_links")]
    Table,
    Id,
    Code,
    ShortCode,
    EventId,
    AffiliateId,
    AgencyId,
    ParentAffiliateId,
    TargetUrl,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    Status,
    ExpiresAt,
    MaxUses,
    UseCount,
    ClickCount,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum ReferralClicks {
    #[sea_orm(iden = "referral_clicks")]
    Table,
    Id,
    LinkId,
    EventId,
    AffiliateId,
    AgencyId,
    VisitorFingerprint,
    DeviceType,
    Browser,
    Os,
    Referrer,
    UtmSource,
    IsBot,
    ClickedAt,
    Converted,
    ConversionId,
}
