//! Referral click entity
//!
//! 自增 id 同时作为插入顺序，时间戳相同时按 id 排序。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "referral_clicks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub link_id: String,
    pub event_id: String,
    pub affiliate_id: Option<String>,
    pub agency_id: Option<String>,
    /// SHA-256(ip | user-agent)，不保存原始 IP
    pub visitor_fingerprint: String,
    pub device_type: String,
    pub browser: Option<String>,
    pub os: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub is_bot: bool,
    pub clicked_at: DateTimeUtc,
    pub converted: bool,
    pub conversion_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
