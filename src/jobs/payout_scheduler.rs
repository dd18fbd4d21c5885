//! 结算批次定时任务
//!
//! 对每个非 manual 的活动：cutoff = now - payout_delay_days，选出已确认、
//! 该方结算状态为 pending 且早于 cutoff 的转化，按 (收款方, 活动) 分组。
//! 低于最低结算金额的分组跳过，留待下次；其余分组在一个事务里创建批次并
//! 条件认领转化，认领数不符说明被并发批次抢先，整体回滚。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::Result;
use crate::storage::{
    AffiliatePayout, ClaimOutcome, CommissionConfig, PayeeKind, PayoutStatus, ReferralConversion,
    SeaOrmStorage,
};

/// 一次运行的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerReport {
    pub events_scanned: usize,
    pub groups_seen: usize,
    pub payouts_created: usize,
    pub skipped_below_minimum: usize,
    pub already_claimed: usize,
    pub failed: usize,
}

pub struct PayoutScheduler {
    storage: Arc<SeaOrmStorage>,
}

/// 该转化在某一方上的应付金额
fn leg_amount(kind: PayeeKind, conversion: &ReferralConversion) -> Decimal {
    match kind {
        PayeeKind::Affiliate => {
            conversion.amounts.affiliate_commission + conversion.amounts.tier_2_commission
        }
        PayeeKind::Agency => conversion.amounts.agency_commission,
    }
}

fn leg_payee(kind: PayeeKind, conversion: &ReferralConversion) -> Option<&str> {
    match kind {
        PayeeKind::Affiliate => conversion.affiliate_id.as_deref(),
        PayeeKind::Agency => conversion.agency_id.as_deref(),
    }
}

impl PayoutScheduler {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn run_once(&self) -> Result<SchedulerReport> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<SchedulerReport> {
        let configs = self.storage.list_auto_payout_configs().await?;
        let mut report = SchedulerReport::default();

        for config in &configs {
            report.events_scanned += 1;
            let cutoff = now - Duration::days(i64::from(config.policy.payout_delay_days));
            for kind in [PayeeKind::Affiliate, PayeeKind::Agency] {
                if let Err(e) = self.schedule_leg(config, kind, cutoff, now, &mut report).await {
                    warn!(
                        "Payout scheduling for event {} ({} leg) failed: {}",
                        config.event_id, kind, e
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            "Payout scheduler: {} events, {} groups, {} created, {} below minimum, {} already claimed, {} failed",
            report.events_scanned,
            report.groups_seen,
            report.payouts_created,
            report.skipped_below_minimum,
            report.already_claimed,
            report.failed
        );
        Ok(report)
    }

    async fn schedule_leg(
        &self,
        config: &CommissionConfig,
        kind: PayeeKind,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        report: &mut SchedulerReport,
    ) -> Result<()> {
        let eligible = self
            .storage
            .eligible_conversions(kind, &config.event_id, cutoff)
            .await?;

        let mut groups: BTreeMap<String, Vec<ReferralConversion>> = BTreeMap::new();
        for conversion in eligible {
            if let Some(payee) = leg_payee(kind, &conversion) {
                groups.entry(payee.to_string()).or_default().push(conversion);
            }
        }

        for (payee_id, conversions) in groups {
            report.groups_seen += 1;
            let Some(payout) = build_payout(config, kind, &payee_id, &conversions, now) else {
                debug!(
                    "{} {} on event {} below minimum payout, rolling forward",
                    kind, payee_id, config.event_id
                );
                report.skipped_below_minimum += 1;
                continue;
            };

            // 单个分组失败不影响其他分组
            match self.storage.create_payout_with_claim(&payout).await {
                Ok(ClaimOutcome::Created) => report.payouts_created += 1,
                Ok(ClaimOutcome::AlreadyClaimed { expected, claimed }) => {
                    info!(
                        "Group {} {} on event {} already claimed ({}/{}), skipped",
                        kind, payee_id, config.event_id, claimed, expected
                    );
                    report.already_claimed += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to create payout for {} {} on event {}: {}",
                        kind, payee_id, config.event_id, e
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(())
    }
}

/// 汇总一个分组；应付金额为 0 或低于最低结算金额时返回 None
fn build_payout(
    config: &CommissionConfig,
    kind: PayeeKind,
    payee_id: &str,
    conversions: &[ReferralConversion],
    now: DateTime<Utc>,
) -> Option<AffiliatePayout> {
    let gross: Decimal = conversions.iter().map(|c| leg_amount(kind, c)).sum();
    if gross <= Decimal::ZERO || gross < config.policy.minimum_payout_amount {
        return None;
    }
    let total_revenue: Decimal = conversions.iter().map(|c| c.amounts.ticket_price).sum();
    let period_start = conversions.iter().map(|c| c.converted_at).min()?;
    let period_end = conversions.iter().map(|c| c.converted_at).max()?;

    Some(AffiliatePayout {
        id: Uuid::new_v4().to_string(),
        payee_kind: kind,
        payee_id: payee_id.to_string(),
        event_id: config.event_id.clone(),
        organizer_id: config.organizer_id.clone(),
        status: PayoutStatus::Scheduled,
        conversion_ids: conversions.iter().map(|c| c.id.clone()).collect(),
        conversion_count: conversions.len() as i64,
        total_revenue,
        gross_amount: gross,
        net_amount: gross,
        period_start,
        period_end,
        created_at: now,
        updated_at: now,
        approved_at: None,
        completed_at: None,
        failure_reason: None,
        transaction_reference: None,
    })
}
