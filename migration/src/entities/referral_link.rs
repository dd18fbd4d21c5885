//! Referral link entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "referral_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub code: String,
    #[sea_orm(unique, nullable)]
    pub short_code: Option<String>,
    pub event_id: String,
    pub affiliate_id: Option<String>,
    pub agency_id: Option<String>,
    /// Upline affiliate earning the tier-2 override
    pub parent_affiliate_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub target_url: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    /// active / paused / expired
    pub status: String,
    pub expires_at: Option<DateTimeUtc>,
    pub max_uses: Option<i64>,
    pub use_count: i64,
    pub click_count: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
