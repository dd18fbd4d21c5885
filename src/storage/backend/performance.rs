//! 业绩汇总查询与缓存表 upsert

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, OnConflict},
};

use super::SeaOrmStorage;
use super::converters::{model_to_snapshot, snapshot_to_active_model};
use crate::errors::Result;
use crate::storage::models::{PerformancePeriod, PerformanceSnapshot};

use migration::entities::{affiliate_performance_cache, referral_click};

/// 按 affiliate 聚合的点击
#[derive(Debug, FromQueryResult)]
pub struct ClickAggregateRow {
    pub affiliate_id: String,
    pub total_clicks: i64,
    pub unique_visitors: i64,
}

/// 按 affiliate 聚合的转化（分）
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionAggregateRow {
    pub conversions: i64,
    pub revenue_cents: i64,
    pub commission_cents: i64,
}

impl SeaOrmStorage {
    pub async fn aggregate_clicks_by_affiliate(
        &self,
        since: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ClickAggregateRow>> {
        let mut query = referral_click::Entity::find()
            .select_only()
            .column(referral_click::Column::AffiliateId)
            .column_as(referral_click::Column::Id.count(), "total_clicks")
            .column_as(
                Expr::cust("COUNT(DISTINCT visitor_fingerprint)"),
                "unique_visitors",
            )
            .filter(referral_click::Column::AffiliateId.is_not_null())
            .filter(referral_click::Column::ClickedAt.lte(until));
        if let Some(since) = since {
            query = query.filter(referral_click::Column::ClickedAt.gte(since));
        }

        Ok(query
            .group_by(referral_click::Column::AffiliateId)
            .into_model::<ClickAggregateRow>()
            .all(&self.db)
            .await?)
    }

    pub async fn upsert_performance_snapshot(&self, snapshot: &PerformanceSnapshot) -> Result<()> {
        affiliate_performance_cache::Entity::insert(snapshot_to_active_model(snapshot))
            .on_conflict(
                OnConflict::columns([
                    affiliate_performance_cache::Column::AffiliateId,
                    affiliate_performance_cache::Column::Period,
                ])
                .update_columns([
                    affiliate_performance_cache::Column::WindowStart,
                    affiliate_performance_cache::Column::WindowEnd,
                    affiliate_performance_cache::Column::TotalClicks,
                    affiliate_performance_cache::Column::UniqueVisitors,
                    affiliate_performance_cache::Column::Conversions,
                    affiliate_performance_cache::Column::RevenueCents,
                    affiliate_performance_cache::Column::CommissionCents,
                    affiliate_performance_cache::Column::ConversionRate,
                    affiliate_performance_cache::Column::RefreshedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// 某周期下已缓存的 affiliate id
    pub async fn cached_affiliates_for_period(
        &self,
        period: PerformancePeriod,
    ) -> Result<Vec<String>> {
        Ok(affiliate_performance_cache::Entity::find()
            .select_only()
            .column(affiliate_performance_cache::Column::AffiliateId)
            .filter(affiliate_performance_cache::Column::Period.eq(period.as_ref()))
            .into_tuple::<String>()
            .all(&self.db)
            .await?)
    }

    pub async fn get_performance_snapshots(
        &self,
        affiliate_id: &str,
        period: Option<PerformancePeriod>,
    ) -> Result<Vec<PerformanceSnapshot>> {
        let mut query = affiliate_performance_cache::Entity::find()
            .filter(affiliate_performance_cache::Column::AffiliateId.eq(affiliate_id));
        if let Some(period) = period {
            query = query.filter(affiliate_performance_cache::Column::Period.eq(period.as_ref()));
        }

        query
            .order_by_asc(affiliate_performance_cache::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_snapshot)
            .collect()
    }
}
