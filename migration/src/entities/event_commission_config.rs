//! Event commission config entity
//!
//! 金额字段以分（`_cents`）存储，百分比以基点（`_bps`，1% = 100）存储。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "event_commission_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: String,
    pub organizer_id: String,
    pub platform_fee_type: String,
    pub platform_fee_bps: i64,
    pub platform_fee_fixed_cents: i64,
    pub platform_fee_cap_cents: Option<i64>,
    pub agency_commission_type: String,
    pub agency_commission_bps: i64,
    pub agency_commission_fixed_cents: i64,
    pub affiliate_commission_enabled: bool,
    pub affiliate_commission_type: String,
    pub affiliate_commission_bps: i64,
    pub affiliate_commission_fixed_cents: i64,
    pub affiliate_commission_base: String,
    pub multi_tier_enabled: bool,
    pub tier_2_bps: i64,
    pub tier_3_bps: i64,
    pub attribution_model: String,
    pub attribution_window_days: i32,
    pub payout_frequency: String,
    pub payout_delay_days: i32,
    pub minimum_payout_cents: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
