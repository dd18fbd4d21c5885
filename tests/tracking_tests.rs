//! ClickTracker tests
//!
//! Run the tracker against a temporary SQLite database.

use std::sync::Arc;

use affiliate_engine::config::{DatabaseConfig, TrackingConfig};
use affiliate_engine::storage::{
    CommissionConfig, CommissionPolicy, LinkStatus, ReferralLink, SeaOrmStorage,
};
use affiliate_engine::tracking::{
    ClickContext, ClickRecord, ClickTracker, CookieCodec, SkipReason, TrackingOutcome,
};
use chrono::{Duration, Utc};
use tempfile::TempDir;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

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

fn tracker(storage: Arc<SeaOrmStorage>) -> ClickTracker {
    ClickTracker::new(
        storage,
        CookieCodec::new([9u8; 32]),
        &TrackingConfig::default(),
        false,
    )
}

async fn seed_link(storage: &SeaOrmStorage, code: &str) -> ReferralLink {
    let now = Utc::now();
    if storage.get_commission_config("evt-1").await.unwrap().is_none() {
        storage
            .insert_commission_config(&CommissionConfig {
                event_id: "evt-1".into(),
                organizer_id: "org-1".into(),
                policy: CommissionPolicy::default(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }
    let link = ReferralLink {
        id: format!("link-{}", code),
        code: code.to_string(),
        short_code: None,
        event_id: "evt-1".into(),
        affiliate_id: Some("aff-1".into()),
        agency_id: None,
        parent_affiliate_id: None,
        target_url: None,
        utm_source: None,
        utm_medium: None,
        utm_campaign: None,
        status: LinkStatus::Active,
        expires_at: None,
        max_uses: None,
        use_count: 0,
        click_count: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    storage.insert_link(&link).await.unwrap();
    link
}

fn context(code: &str) -> ClickContext {
    ClickContext {
        ref_code: code.to_string(),
        client_ip: Some("203.0.113.7".into()),
        user_agent: BROWSER_UA.into(),
        referrer: Some("https://social.example.com/post/1".into()),
        host: Some("tickets.example.com".into()),
        utm_source: None,
    }
}

#[tokio::test]
async fn test_dedupe_window_records_one_click_and_issues_two_cookies() {
    let (storage, _dir) = create_temp_storage().await;
    let link = seed_link(&storage, "SUMMER24").await;
    let tracker = tracker(storage.clone());

    let t0 = Utc::now();
    let first = tracker.track_at(&context("SUMMER24"), t0).await.unwrap();
    let second = tracker
        .track_at(&context("SUMMER24"), t0 + Duration::minutes(5))
        .await
        .unwrap();

    let (first_cookie, first_click) = match first {
        TrackingOutcome::Applied { cookie, click } => (cookie, click),
        other => panic!("expected cookie, got {:?}", other),
    };
    let (second_cookie, second_click) = match second {
        TrackingOutcome::Applied { cookie, click } => (cookie, click),
        other => panic!("expected cookie, got {:?}", other),
    };

    let ClickRecord::Recorded(click_id) = first_click else {
        panic!("first click should be recorded, got {:?}", first_click);
    };
    assert_eq!(second_click, ClickRecord::Deduplicated(click_id));
    assert_eq!(first_cookie.name(), "_event_i_ref");
    assert_ne!(first_cookie.value(), second_cookie.value());

    let clicks = storage.clicks_for_link(&link.id, None).await.unwrap();
    assert_eq!(clicks.len(), 1);
    let stored = storage.get_link(&link.id).await.unwrap().unwrap();
    assert_eq!(stored.click_count, 1);

    let payload = tracker.read_cookie(second_cookie.value(), Utc::now()).unwrap();
    assert_eq!(payload.ref_code, "SUMMER24");
    assert_eq!(payload.link_id, link.id);
    assert_eq!(payload.affiliate_id.as_deref(), Some("aff-1"));
    assert_eq!(payload.click_id, Some(click_id));
}

#[tokio::test]
async fn test_click_outside_dedupe_window_is_recorded_again() {
    let (storage, _dir) = create_temp_storage().await;
    let link = seed_link(&storage, "AUTUMN24").await;
    let tracker = tracker(storage.clone());

    let t0 = Utc::now() - Duration::hours(3);
    tracker.track_at(&context("AUTUMN24"), t0).await.unwrap();
    tracker
        .track_at(&context("AUTUMN24"), t0 + Duration::minutes(61))
        .await
        .unwrap();

    assert_eq!(storage.clicks_for_link(&link.id, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_inactive_or_expired_link_gets_no_cookie_and_no_click() {
    let (storage, _dir) = create_temp_storage().await;
    let mut paused = seed_link(&storage, "PAUSED01").await;
    paused.status = LinkStatus::Paused;
    storage.update_link(&paused).await.unwrap();

    let mut expired = seed_link(&storage, "EXPIRED1").await;
    expired.expires_at = Some(Utc::now() - Duration::hours(1));
    storage.update_link(&expired).await.unwrap();

    let tracker = tracker(storage.clone());
    for code in ["PAUSED01", "EXPIRED1"] {
        let outcome = tracker.track(&context(code)).await.unwrap();
        assert!(
            matches!(outcome, TrackingOutcome::Skipped(SkipReason::InactiveLink)),
            "{} should be skipped, got {:?}",
            code,
            outcome
        );
    }
    assert!(storage.clicks_for_link(&paused.id, None).await.unwrap().is_empty());
    assert!(storage.clicks_for_link(&expired.id, None).await.unwrap().is_empty());

    let unknown = tracker.track(&context("NOPE1234")).await.unwrap();
    assert!(matches!(
        unknown,
        TrackingOutcome::Skipped(SkipReason::UnknownLink)
    ));
}

#[tokio::test]
async fn test_bot_and_self_referral_get_cookie_without_click() {
    let (storage, _dir) = create_temp_storage().await;
    let link = seed_link(&storage, "BOTTEST1").await;
    let tracker = tracker(storage.clone());

    let mut bot = context("BOTTEST1");
    bot.user_agent = "Googlebot/2.1 (+http://www.google.com/bot.html)".into();
    match tracker.track(&bot).await.unwrap() {
        TrackingOutcome::Applied { click, .. } => assert_eq!(click, ClickRecord::Bot),
        other => panic!("expected cookie, got {:?}", other),
    }

    let mut self_ref = context("BOTTEST1");
    self_ref.referrer = Some("https://tickets.example.com/landing".into());
    match tracker.track(&self_ref).await.unwrap() {
        TrackingOutcome::Applied { click, .. } => {
            assert_eq!(click, ClickRecord::SuspiciousReferrer)
        }
        other => panic!("expected cookie, got {:?}", other),
    }

    assert!(storage.clicks_for_link(&link.id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limit_per_ip() {
    let (storage, _dir) = create_temp_storage().await;
    let link = seed_link(&storage, "BURST001").await;
    let config = TrackingConfig {
        rate_limit_per_minute: 2,
        ..Default::default()
    };
    let tracker = ClickTracker::new(storage.clone(), CookieCodec::new([1u8; 32]), &config, true);

    // 同一 IP，不同 UA，避开去重
    let mut records = Vec::new();
    for i in 0..3 {
        let mut ctx = context("BURST001");
        ctx.user_agent = format!("{} build/{}", BROWSER_UA, i);
        match tracker.track(&ctx).await.unwrap() {
            TrackingOutcome::Applied { click, .. } => records.push(click),
            other => panic!("expected cookie, got {:?}", other),
        }
    }
    assert!(matches!(records[0], ClickRecord::Recorded(_)));
    assert!(matches!(records[1], ClickRecord::Recorded(_)));
    assert_eq!(records[2], ClickRecord::RateLimited);
    assert_eq!(storage.clicks_for_link(&link.id, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_pruning_rate_limits_keeps_active_keys() {
    let (storage, _dir) = create_temp_storage().await;
    seed_link(&storage, "BURST002").await;
    let config = TrackingConfig {
        rate_limit_per_minute: 2,
        ..Default::default()
    };
    let tracker = ClickTracker::new(storage.clone(), CookieCodec::new([2u8; 32]), &config, true);

    for i in 0..2 {
        let mut ctx = context("BURST002");
        ctx.user_agent = format!("{} build/{}", BROWSER_UA, i);
        tracker.track(&ctx).await.unwrap();
    }
    // 额度刚用完的 IP 不会被清掉
    assert_eq!(tracker.prune_rate_limits(), 1);

    let mut ctx = context("BURST002");
    ctx.user_agent = format!("{} build/2", BROWSER_UA);
    match tracker.track(&ctx).await.unwrap() {
        TrackingOutcome::Applied { click, .. } => assert_eq!(click, ClickRecord::RateLimited),
        other => panic!("expected cookie, got {:?}", other),
    }

    let mut other_ip = context("BURST002");
    other_ip.client_ip = Some("198.51.100.20".into());
    match tracker.track(&other_ip).await.unwrap() {
        TrackingOutcome::Applied { click, .. } => assert!(matches!(click, ClickRecord::Recorded(_))),
        other => panic!("expected cookie, got {:?}", other),
    }
    assert_eq!(tracker.prune_rate_limits(), 2);
}
