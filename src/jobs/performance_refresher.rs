//! 业绩缓存刷新
//!
//! 按周期窗口聚合每个 affiliate 的点击、独立访客、转化、收入与佣金，
//! upsert 到 `affiliate_performance_cache`。缓存是派生数据，随时可重建。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::storage::backend::ConversionAggregateRow;
use crate::storage::{PerformancePeriod, PerformanceSnapshot, SeaOrmStorage};
use crate::utils::money::from_cents;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub periods: usize,
    pub snapshots_written: usize,
    pub failed: usize,
}

/// conversions ÷ unique_visitors × 100，无访客时为 0
pub fn conversion_rate(conversions: i64, unique_visitors: i64) -> f64 {
    if unique_visitors <= 0 {
        0.0
    } else {
        conversions as f64 / unique_visitors as f64 * 100.0
    }
}

pub struct PerformanceRefresher {
    storage: Arc<SeaOrmStorage>,
}

impl PerformanceRefresher {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn run_once(&self, periods: &[PerformancePeriod]) -> Result<RefreshReport> {
        self.run_at(periods, Utc::now()).await
    }

    pub async fn run_at(
        &self,
        periods: &[PerformancePeriod],
        now: DateTime<Utc>,
    ) -> Result<RefreshReport> {
        let mut report = RefreshReport::default();
        for &period in periods {
            report.periods += 1;
            match self.refresh_period(period, now).await {
                Ok((written, failed)) => {
                    report.snapshots_written += written;
                    report.failed += failed;
                }
                Err(e) => {
                    warn!("Performance refresh for {} failed: {}", period, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Performance cache refreshed: {} periods, {} snapshots, {} failed",
            report.periods, report.snapshots_written, report.failed
        );
        Ok(report)
    }

    async fn refresh_period(
        &self,
        period: PerformancePeriod,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize)> {
        let since = period.window().map(|w| now - w);

        let clicks = self.storage.aggregate_clicks_by_affiliate(since, now).await?;

        // 金额在内存中以分累加，避免不同数据库 SUM 返回类型不一致
        let mut conversions: BTreeMap<String, ConversionAggregateRow> = BTreeMap::new();
        for model in self.storage.confirmed_conversions_since(since).await? {
            if model.converted_at > now {
                continue;
            }
            let Some(affiliate_id) = model.affiliate_id else {
                continue;
            };
            let row = conversions.entry(affiliate_id).or_default();
            row.conversions += 1;
            row.revenue_cents += model.ticket_price_cents;
            row.commission_cents += model.affiliate_commission_cents + model.tier_2_commission_cents;
        }

        let mut snapshots: BTreeMap<String, PerformanceSnapshot> = BTreeMap::new();
        for row in clicks {
            let snapshot = snapshots
                .entry(row.affiliate_id.clone())
                .or_insert_with(|| empty_snapshot(&row.affiliate_id, period, since, now));
            snapshot.total_clicks = row.total_clicks;
            snapshot.unique_visitors = row.unique_visitors;
        }
        for (affiliate_id, row) in conversions {
            let snapshot = snapshots
                .entry(affiliate_id.clone())
                .or_insert_with(|| empty_snapshot(&affiliate_id, period, since, now));
            snapshot.conversions = row.conversions;
            snapshot.revenue = from_cents(row.revenue_cents);
            snapshot.commission = from_cents(row.commission_cents);
        }

        // 已缓存但窗口内没有活动的 affiliate 写回零值
        for affiliate_id in self.storage.cached_affiliates_for_period(period).await? {
            snapshots
                .entry(affiliate_id.clone())
                .or_insert_with(|| empty_snapshot(&affiliate_id, period, since, now));
        }

        let (mut written, mut failed) = (0, 0);
        for snapshot in snapshots.values_mut() {
            snapshot.conversion_rate =
                conversion_rate(snapshot.conversions, snapshot.unique_visitors);
            match self.storage.upsert_performance_snapshot(snapshot).await {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(
                        "Failed to write {} snapshot for {}: {}",
                        period, snapshot.affiliate_id, e
                    );
                    failed += 1;
                }
            }
        }
        debug!("Period {}: {} snapshots written", period, written);
        Ok((written, failed))
    }
}

fn empty_snapshot(
    affiliate_id: &str,
    period: PerformancePeriod,
    since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> PerformanceSnapshot {
    PerformanceSnapshot {
        affiliate_id: affiliate_id.to_string(),
        period,
        window_start: since,
        window_end: now,
        total_clicks: 0,
        unique_visitors: 0,
        conversions: 0,
        revenue: rust_decimal::Decimal::ZERO,
        commission: rust_decimal::Decimal::ZERO,
        conversion_rate: 0.0,
        refreshed_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_rate() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(3, 0), 0.0);
        assert_eq!(conversion_rate(1, 4), 25.0);
        assert!((conversion_rate(1, 3) - 33.333333).abs() < 1e-5);
    }
}
