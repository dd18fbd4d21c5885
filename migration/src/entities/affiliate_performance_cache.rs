//! Affiliate performance rollup（派生数据，可随时重建）

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "affiliate_performance_cache")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub affiliate_id: String,
    /// today / week / month / quarter / year / all_time
    pub period: String,
    pub window_start: Option<DateTimeUtc>,
    pub window_end: DateTimeUtc,
    pub total_clicks: i64,
    pub unique_visitors: i64,
    pub conversions: i64,
    pub revenue_cents: i64,
    pub commission_cents: i64,
    pub conversion_rate: f64,
    pub refreshed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
