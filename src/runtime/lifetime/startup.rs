use actix_web::web;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::services::{AppStartTime, RedirectParam};
use crate::config::StaticConfig;
use crate::jobs::{PayoutScheduler, PerformanceRefresher};
use crate::services::{
    CommissionConfigService, ConversionRecorder, LinkService, PayoutService, PerformanceService,
};
use crate::storage::{SeaOrmStorage, StorageFactory};
use crate::tracking::{ClickTracker, CookieCodec};

/// 进程内共享的服务实例，启动时构造一次，以 `Arc` 注入 handler 和后台任务
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StaticConfig>,
    pub storage: Arc<SeaOrmStorage>,
    pub tracker: Arc<ClickTracker>,
    pub recorder: Arc<ConversionRecorder>,
    pub links: Arc<LinkService>,
    pub commission_configs: Arc<CommissionConfigService>,
    pub payouts: Arc<PayoutService>,
    pub performance: Arc<PerformanceService>,
    pub payout_scheduler: Arc<PayoutScheduler>,
    pub performance_refresher: Arc<PerformanceRefresher>,
    pub started_at: AppStartTime,
}

impl AppState {
    /// 在已有存储上装配全部服务
    pub fn new(config: Arc<StaticConfig>, storage: Arc<SeaOrmStorage>) -> Result<Self> {
        let production = config.is_production();
        let codec = CookieCodec::from_config(&config.tracking, production)
            .context("Failed to initialize tracking cookie codec")?;

        let tracker = ClickTracker::new(storage.clone(), codec.clone(), &config.tracking, production);
        let recorder = ConversionRecorder::new(storage.clone(), codec);

        Ok(Self {
            tracker: Arc::new(tracker),
            recorder: Arc::new(recorder),
            links: Arc::new(LinkService::new(storage.clone())),
            commission_configs: Arc::new(CommissionConfigService::new(storage.clone())),
            payouts: Arc::new(PayoutService::new(storage.clone())),
            performance: Arc::new(PerformanceService::new(storage.clone())),
            payout_scheduler: Arc::new(PayoutScheduler::new(storage.clone())),
            performance_refresher: Arc::new(PerformanceRefresher::new(storage.clone())),
            started_at: AppStartTime {
                start_datetime: Utc::now(),
            },
            storage,
            config,
        })
    }

    /// 注册 handler 需要的 app_data
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.config.clone()))
            .app_data(web::Data::new(self.storage.clone()))
            .app_data(web::Data::new(self.tracker.clone()))
            .app_data(web::Data::new(self.recorder.clone()))
            .app_data(web::Data::new(self.links.clone()))
            .app_data(web::Data::new(self.commission_configs.clone()))
            .app_data(web::Data::new(self.payouts.clone()))
            .app_data(web::Data::new(self.performance.clone()))
            .app_data(web::Data::new(self.payout_scheduler.clone()))
            .app_data(web::Data::new(self.performance_refresher.clone()))
            .app_data(web::Data::new(self.started_at.clone()))
            .app_data(web::Data::new(RedirectParam(
                self.config.tracking.query_param.clone(),
            )));
    }
}

/// 准备启动上下文：连接数据库、执行迁移、装配服务
pub async fn prepare_app_state(config: Arc<StaticConfig>) -> Result<AppState> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    if config.is_production() && config.api.admin_token.trim().is_empty() {
        warn!("api.admin_token is empty, the management API will answer 404");
    }

    let storage = StorageFactory::create(&config)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let state = AppState::new(config, storage)?;
    info!(
        "Pre-startup processing completed in {:?}",
        start_time.elapsed()
    );
    Ok(state)
}
