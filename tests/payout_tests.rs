//! 结算批次：调度、审批、完成、回滚

use std::sync::Arc;

use affiliate_engine::config::{DatabaseConfig, TrackingConfig};
use affiliate_engine::jobs::PayoutScheduler;
use affiliate_engine::services::{
    CommissionConfigRequest, CommissionConfigService, CompleteBatchRequest, ConversionOutcome,
    ConversionRecorder, CreateLinkRequest, LinkService, PayoutService,
};
use affiliate_engine::storage::{
    CommissionPolicy, CommissionType, FeeType, LEG_UPDATE_CHUNK, LegPayoutStatus, PayeeKind,
    PayoutFrequency, PayoutStatus, ReferralConversion, SeaOrmStorage, Ticket,
};
use affiliate_engine::tracking::{ClickContext, ClickTracker, CookieCodec, TrackingOutcome};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

struct Harness {
    storage: Arc<SeaOrmStorage>,
    tracker: ClickTracker,
    recorder: ConversionRecorder,
    links: LinkService,
    configs: CommissionConfigService,
    payouts: PayoutService,
    scheduler: PayoutScheduler,
    _dir: TempDir,
}

async fn setup() -> Harness {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..Default::default()
    };
    let storage = Arc::new(
        SeaOrmStorage::new(&config, std::time::Duration::from_secs(60))
            .await
            .expect("Failed to create storage"),
    );
    let codec = CookieCodec::new([3u8; 32]);

    Harness {
        tracker: ClickTracker::new(
            storage.clone(),
            codec.clone(),
            &TrackingConfig::default(),
            false,
        ),
        recorder: ConversionRecorder::new(storage.clone(), codec),
        links: LinkService::new(storage.clone()),
        configs: CommissionConfigService::new(storage.clone()),
        payouts: PayoutService::new(storage.clone()),
        scheduler: PayoutScheduler::new(storage.clone()),
        storage,
        _dir: temp_dir,
    }
}

/// 每张票固定 `commission` 的 affiliate 佣金，延迟 1 天，最低结算 10
fn fixed_policy(commission: i64, frequency: PayoutFrequency) -> CommissionPolicy {
    CommissionPolicy {
        platform_fee_type: FeeType::Percentage,
        affiliate_commission_type: CommissionType::Fixed,
        affiliate_commission_fixed: Decimal::from(commission),
        payout_frequency: frequency,
        payout_delay_days: 1,
        minimum_payout_amount: Decimal::from(10),
        ..Default::default()
    }
}

impl Harness {
    /// 3 天前点击、2 天前购票，返回记录下的转化
    async fn converted_sale(&self, event_id: &str, policy: CommissionPolicy) -> ReferralConversion {
        self.configs
            .create(
                event_id,
                CommissionConfigRequest {
                    organizer_id: Some("org-1".into()),
                    policy,
                },
            )
            .await
            .unwrap();
        let link = self
            .links
            .create_link(CreateLinkRequest {
                event_id: event_id.into(),
                affiliate_id: Some("aff-1".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let now = Utc::now();
        let ctx = ClickContext {
            ref_code: link.code.clone(),
            client_ip: Some("192.0.2.44".into()),
            user_agent: BROWSER_UA.into(),
            ..Default::default()
        };
        let cookie = match self
            .tracker
            .track_at(&ctx, now - Duration::days(3))
            .await
            .unwrap()
        {
            TrackingOutcome::Applied { cookie, .. } => cookie.value().to_string(),
            other => panic!("expected cookie, got {:?}", other),
        };

        let ticket = Ticket {
            id: format!("tkt-{}", event_id),
            event_id: event_id.into(),
            price: Decimal::from(100),
            owner_id: None,
            purchased_at: Some(now - Duration::days(2)),
        };
        match self.recorder.record(Some(&cookie), &ticket).await.unwrap() {
            ConversionOutcome::Recorded(conversion) => *conversion,
            other => panic!("expected recorded, got {:?}", other),
        }
    }

    async fn reload(&self, conversion: &ReferralConversion) -> ReferralConversion {
        self.storage
            .get_conversion(&conversion.id)
            .await
            .unwrap()
            .unwrap()
    }
}

#[tokio::test]
async fn test_scheduler_creates_payout_above_minimum() {
    let h = setup().await;
    let conversion = h
        .converted_sale("evt-1", fixed_policy(15, PayoutFrequency::Weekly))
        .await;

    let report = h.scheduler.run_once().await.unwrap();
    assert_eq!(report.events_scanned, 1);
    assert_eq!(report.payouts_created, 1);
    assert_eq!(report.failed, 0);

    let history = h.payouts.payee_history("aff-1").await.unwrap();
    assert_eq!(history.len(), 1);
    let payout = &history[0];
    assert_eq!(payout.payee_kind, PayeeKind::Affiliate);
    assert_eq!(payout.status, PayoutStatus::Scheduled);
    assert_eq!(payout.gross_amount, Decimal::from(15));
    assert_eq!(payout.net_amount, Decimal::from(15));
    assert_eq!(payout.conversion_ids, vec![conversion.id.clone()]);

    let reloaded = h.reload(&conversion).await;
    assert_eq!(reloaded.affiliate_payout_status, LegPayoutStatus::Scheduled);
    assert_eq!(reloaded.affiliate_payout_id.as_deref(), Some(payout.id.as_str()));

    // 已认领的转化不会被再次调度
    let again = h.scheduler.run_once().await.unwrap();
    assert_eq!(again.payouts_created, 0);
    assert_eq!(h.payouts.payee_history("aff-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_overlapping_scheduler_runs_claim_once() {
    let h = setup().await;
    let conversion = h
        .converted_sale("evt-1", fixed_policy(15, PayoutFrequency::Weekly))
        .await;

    let (a, b) = tokio::join!(h.scheduler.run_once(), h.scheduler.run_once());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.payouts_created + b.payouts_created, 1);

    let history = h.payouts.payee_history("aff-1").await.unwrap();
    assert_eq!(history.len(), 1);
    let reloaded = h.reload(&conversion).await;
    assert_eq!(reloaded.affiliate_payout_status, LegPayoutStatus::Scheduled);
    assert_eq!(
        reloaded.affiliate_payout_id.as_deref(),
        Some(history[0].id.as_str())
    );
}

#[tokio::test]
async fn test_large_group_is_claimed_and_settled() {
    let h = setup().await;
    let seed = h
        .converted_sale("evt-1", fixed_policy(15, PayoutFrequency::Weekly))
        .await;

    // 同一 affiliate 的转化数超过单条 UPDATE 的 id 上限
    let extra = LEG_UPDATE_CHUNK + 20;
    let mut last = seed.clone();
    for i in 0..extra {
        let mut conversion = seed.clone();
        conversion.id = format!("{}-{}", seed.id, i);
        conversion.ticket_id = format!("tkt-bulk-{}", i);
        conversion.click_id = None;
        h.storage.persist_conversion(&conversion).await.unwrap();
        last = conversion;
    }

    let report = h.scheduler.run_once().await.unwrap();
    assert_eq!(report.payouts_created, 1);
    assert_eq!(report.already_claimed, 0);

    let history = h.payouts.payee_history("aff-1").await.unwrap();
    assert_eq!(history.len(), 1);
    let payout_id = history[0].id.clone();
    assert_eq!(history[0].conversion_ids.len(), extra + 1);
    assert_eq!(history[0].gross_amount, Decimal::from(15 * (extra as i64 + 1)));
    for conversion in [&seed, &last] {
        let reloaded = h.reload(conversion).await;
        assert_eq!(reloaded.affiliate_payout_status, LegPayoutStatus::Scheduled);
        assert_eq!(reloaded.affiliate_payout_id.as_deref(), Some(payout_id.as_str()));
    }

    h.payouts.approve(&payout_id).await.unwrap();
    let result = h
        .payouts
        .complete_batch(&CompleteBatchRequest {
            payout_ids: vec![payout_id.clone()],
            transaction_reference: None,
        })
        .await
        .unwrap();
    assert_eq!(result.completed, vec![payout_id.clone()]);
    for conversion in [&seed, &last] {
        assert_eq!(
            h.reload(conversion).await.affiliate_payout_status,
            LegPayoutStatus::Paid
        );
    }
}

#[tokio::test]
async fn test_scheduler_rolls_small_balance_forward() {
    let h = setup().await;
    let conversion = h
        .converted_sale("evt-1", fixed_policy(5, PayoutFrequency::Weekly))
        .await;

    let report = h.scheduler.run_once().await.unwrap();
    assert_eq!(report.payouts_created, 0);
    assert_eq!(report.skipped_below_minimum, 1);
    assert!(h.payouts.payee_history("aff-1").await.unwrap().is_empty());

    let reloaded = h.reload(&conversion).await;
    assert_eq!(reloaded.affiliate_payout_status, LegPayoutStatus::Pending);
    assert!(reloaded.affiliate_payout_id.is_none());
}

#[tokio::test]
async fn test_manual_cadence_is_not_scheduled() {
    let h = setup().await;
    h.converted_sale("evt-1", fixed_policy(15, PayoutFrequency::Manual))
        .await;

    let report = h.scheduler.run_once().await.unwrap();
    assert_eq!(report.events_scanned, 0);
    assert_eq!(report.payouts_created, 0);
}

#[tokio::test]
async fn test_reject_returns_conversions_to_pending() {
    let h = setup().await;
    let conversion = h
        .converted_sale("evt-1", fixed_policy(15, PayoutFrequency::Weekly))
        .await;
    h.scheduler.run_once().await.unwrap();

    let pending = h.payouts.list_pending("org-1").await.unwrap();
    assert_eq!(pending.len(), 1);

    let rejected = h
        .payouts
        .reject(&pending[0].id, Some("wrong bank details".into()))
        .await
        .unwrap();
    assert_eq!(rejected.status, PayoutStatus::Cancelled);
    assert_eq!(rejected.failure_reason.as_deref(), Some("wrong bank details"));

    let reloaded = h.reload(&conversion).await;
    assert_eq!(reloaded.affiliate_payout_status, LegPayoutStatus::Pending);
    assert!(reloaded.affiliate_payout_id.is_none());

    // 回滚后下一次调度重新纳入
    let report = h.scheduler.run_once().await.unwrap();
    assert_eq!(report.payouts_created, 1);
}

#[tokio::test]
async fn test_approve_then_complete_marks_leg_paid() {
    let h = setup().await;
    let conversion = h
        .converted_sale("evt-1", fixed_policy(15, PayoutFrequency::Weekly))
        .await;
    h.scheduler.run_once().await.unwrap();
    let payout_id = h.payouts.list_pending("org-1").await.unwrap()[0].id.clone();

    let approved = h.payouts.approve(&payout_id).await.unwrap();
    assert_eq!(approved.status, PayoutStatus::Processing);
    assert!(approved.approved_at.is_some());
    assert!(h.payouts.list_pending("org-1").await.unwrap().is_empty());

    // processing 不能再次审批
    assert!(h.payouts.approve(&payout_id).await.is_err());

    let result = h
        .payouts
        .complete_batch(&CompleteBatchRequest {
            payout_ids: vec![payout_id.clone(), "missing".into()],
            transaction_reference: Some("TX-42".into()),
        })
        .await
        .unwrap();
    assert_eq!(result.completed, vec![payout_id.clone()]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].id, "missing");

    let completed = h.payouts.get(&payout_id).await.unwrap();
    assert_eq!(completed.status, PayoutStatus::Completed);
    assert_eq!(completed.transaction_reference.as_deref(), Some("TX-42"));

    let reloaded = h.reload(&conversion).await;
    assert_eq!(reloaded.affiliate_payout_status, LegPayoutStatus::Paid);
    assert_eq!(reloaded.affiliate_payout_id.as_deref(), Some(payout_id.as_str()));
}

#[tokio::test]
async fn test_fail_rolls_back_processing_payout() {
    let h = setup().await;
    let conversion = h
        .converted_sale("evt-1", fixed_policy(15, PayoutFrequency::Weekly))
        .await;
    h.scheduler.run_once().await.unwrap();
    let payout_id = h.payouts.list_pending("org-1").await.unwrap()[0].id.clone();

    // 只有 processing 可以标记失败
    assert!(h.payouts.fail(&payout_id, "bounced").await.is_err());
    h.payouts.approve(&payout_id).await.unwrap();
    assert!(h.payouts.fail(&payout_id, "  ").await.is_err());

    let failed = h.payouts.fail(&payout_id, "bounced").await.unwrap();
    assert_eq!(failed.status, PayoutStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("bounced"));

    let reloaded = h.reload(&conversion).await;
    assert_eq!(reloaded.affiliate_payout_status, LegPayoutStatus::Pending);
    assert!(reloaded.affiliate_payout_id.is_none());
}

#[tokio::test]
async fn test_unknown_payout_is_not_found() {
    let h = setup().await;
    let err = h.payouts.approve("does-not-exist").await.unwrap_err();
    assert_eq!(err.http_status(), actix_web::http::StatusCode::NOT_FOUND);
}
