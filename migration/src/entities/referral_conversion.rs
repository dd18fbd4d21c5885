//! Referral conversion entity (immutable financial snapshot)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "referral_conversions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub ticket_id: String,
    pub event_id: String,
    pub link_id: String,
    pub click_id: Option<i64>,
    pub affiliate_id: Option<String>,
    pub agency_id: Option<String>,
    pub tier_2_affiliate_id: Option<String>,
    pub ticket_price_cents: i64,
    pub platform_fee_cents: i64,
    pub organizer_revenue_cents: i64,
    pub agency_commission_cents: i64,
    pub affiliate_commission_cents: i64,
    pub tier_2_commission_cents: i64,
    pub organizer_net_cents: i64,
    pub attribution_model: String,
    /// JSON: [{click_id, clicked_at, weight}]
    #[sea_orm(column_type = "Text")]
    pub attributed_clicks: String,
    /// JSON: 计算时的佣金配置快照
    #[sea_orm(column_type = "Text")]
    pub config_snapshot: String,
    #[sea_orm(column_type = "Text")]
    pub calculation_breakdown: String,
    pub status: String,
    pub agency_payout_status: String,
    pub agency_payout_id: Option<String>,
    pub affiliate_payout_status: String,
    pub affiliate_payout_id: Option<String>,
    pub converted_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
