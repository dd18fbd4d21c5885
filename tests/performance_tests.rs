//! 业绩缓存刷新与读取

use std::sync::Arc;

use affiliate_engine::config::{DatabaseConfig, TrackingConfig};
use affiliate_engine::jobs::PerformanceRefresher;
use affiliate_engine::services::{
    CommissionConfigRequest, CommissionConfigService, ConversionOutcome, ConversionRecorder,
    CreateLinkRequest, LinkService, PerformanceService,
};
use affiliate_engine::storage::{CommissionPolicy, PerformancePeriod, SeaOrmStorage, Ticket};
use affiliate_engine::tracking::{ClickContext, ClickTracker, CookieCodec, TrackingOutcome};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

const BROWSER_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..Default::default()
    };
    let storage = SeaOrmStorage::new(&config, std::time::Duration::from_secs(60))
        .await
        .expect("Failed to create storage");
    (Arc::new(storage), temp_dir)
}

/// aff-1：2 个访客点击，其中 1 个在 3 天前购票
async fn seed_activity(storage: &Arc<SeaOrmStorage>) {
    let codec = CookieCodec::new([5u8; 32]);
    let tracker = ClickTracker::new(
        storage.clone(),
        codec.clone(),
        &TrackingConfig::default(),
        false,
    );
    let recorder = ConversionRecorder::new(storage.clone(), codec);

    CommissionConfigService::new(storage.clone())
        .create(
            "evt-1",
            CommissionConfigRequest {
                organizer_id: Some("org-1".into()),
                policy: CommissionPolicy {
                    platform_fee_percentage: Decimal::from(5),
                    affiliate_commission_percentage: Decimal::from(20),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();
    let link = LinkService::new(storage.clone())
        .create_link(CreateLinkRequest {
            event_id: "evt-1".into(),
            affiliate_id: Some("aff-1".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let now = Utc::now();
    let mut cookies = Vec::new();
    for ip in ["192.0.2.1", "192.0.2.2"] {
        let ctx = ClickContext {
            ref_code: link.code.clone(),
            client_ip: Some(ip.into()),
            user_agent: BROWSER_UA.into(),
            ..Default::default()
        };
        match tracker.track_at(&ctx, now - Duration::days(4)).await.unwrap() {
            TrackingOutcome::Applied { cookie, .. } => cookies.push(cookie.value().to_string()),
            other => panic!("expected cookie, got {:?}", other),
        }
    }

    let ticket = Ticket {
        id: "tkt-1".into(),
        event_id: "evt-1".into(),
        price: Decimal::from(100),
        owner_id: None,
        purchased_at: Some(now - Duration::days(3)),
    };
    let outcome = recorder.record(Some(&cookies[0]), &ticket).await.unwrap();
    assert!(matches!(outcome, ConversionOutcome::Recorded(_)));
}

#[tokio::test]
async fn test_refresh_aggregates_by_affiliate() {
    let (storage, _dir) = create_temp_storage().await;
    seed_activity(&storage).await;

    let refresher = PerformanceRefresher::new(storage.clone());
    let report = refresher
        .run_once(&[PerformancePeriod::Week, PerformancePeriod::Today])
        .await
        .unwrap();
    assert_eq!(report.periods, 2);
    assert_eq!(report.failed, 0);

    let service = PerformanceService::new(storage.clone());
    let week = service
        .get("aff-1", Some(PerformancePeriod::Week))
        .await
        .unwrap();
    assert_eq!(week.len(), 1);
    let week = &week[0];
    assert_eq!(week.total_clicks, 2);
    assert_eq!(week.unique_visitors, 2);
    assert_eq!(week.conversions, 1);
    assert_eq!(week.revenue, Decimal::from(100));
    assert_eq!(week.commission, Decimal::from(19));
    assert!((week.conversion_rate - 50.0).abs() < f64::EPSILON);
    assert!(week.window_start.is_some());

    // 今天窗口内没有活动，不写快照
    let today = service
        .get("aff-1", Some(PerformancePeriod::Today))
        .await
        .unwrap();
    assert!(today.is_empty());
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let (storage, _dir) = create_temp_storage().await;
    seed_activity(&storage).await;
    let refresher = PerformanceRefresher::new(storage.clone());

    let periods = [PerformancePeriod::Month, PerformancePeriod::AllTime];
    refresher.run_once(&periods).await.unwrap();
    refresher.run_once(&periods).await.unwrap();

    let snapshots = PerformanceService::new(storage.clone())
        .get("aff-1", None)
        .await
        .unwrap();
    assert_eq!(snapshots.len(), 2);
    let all_time = snapshots
        .iter()
        .find(|s| s.period == PerformancePeriod::AllTime)
        .unwrap();
    assert!(all_time.window_start.is_none());
    assert_eq!(all_time.conversions, 1);
}

#[tokio::test]
async fn test_refresh_clears_activity_outside_window() {
    let (storage, _dir) = create_temp_storage().await;
    seed_activity(&storage).await;
    let refresher = PerformanceRefresher::new(storage.clone());
    let service = PerformanceService::new(storage.clone());

    let now = Utc::now();
    refresher.run_at(&[PerformancePeriod::Week], now).await.unwrap();
    let week = service
        .get("aff-1", Some(PerformancePeriod::Week))
        .await
        .unwrap();
    assert_eq!(week[0].total_clicks, 2);

    // 20 天后所有活动都已移出 7 天窗口
    let later = now + Duration::days(20);
    let report = refresher.run_at(&[PerformancePeriod::Week], later).await.unwrap();
    assert_eq!(report.failed, 0);

    let week = service
        .get("aff-1", Some(PerformancePeriod::Week))
        .await
        .unwrap();
    assert_eq!(week.len(), 1);
    let week = &week[0];
    assert_eq!(week.total_clicks, 0);
    assert_eq!(week.unique_visitors, 0);
    assert_eq!(week.conversions, 0);
    assert_eq!(week.revenue, Decimal::ZERO);
    assert_eq!(week.commission, Decimal::ZERO);
    assert_eq!(week.conversion_rate, 0.0);
    assert_eq!(week.window_end.timestamp(), later.timestamp());
}

#[tokio::test]
async fn test_unknown_affiliate_has_no_snapshots() {
    let (storage, _dir) = create_temp_storage().await;
    let snapshots = PerformanceService::new(storage)
        .get("nobody", None)
        .await
        .unwrap();
    assert!(snapshots.is_empty());
}
