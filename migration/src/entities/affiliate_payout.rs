//! Affiliate / agency payout entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "affiliate_payouts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// affiliate / agency
    pub payee_kind: String,
    pub payee_id: String,
    pub event_id: String,
    pub organizer_id: String,
    pub status: String,
    /// JSON 数组：本次结算覆盖的 conversion id
    #[sea_orm(column_type = "Text")]
    pub conversion_ids: String,
    pub conversion_count: i64,
    pub total_revenue_cents: i64,
    pub gross_amount_cents: i64,
    pub net_amount_cents: i64,
    pub period_start: DateTimeUtc,
    pub period_end: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub approved_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub failure_reason: Option<String>,
    pub transaction_reference: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
