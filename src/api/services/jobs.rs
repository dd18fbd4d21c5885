//! 手动触发后台任务（运维用）

use actix_web::{HttpResponse, web};
use std::sync::Arc;
use tracing::info;

use crate::config::StaticConfig;
use crate::jobs::{PayoutScheduler, PerformanceRefresher};

use super::error_code::Domain;
use super::helpers::api_result;

pub async fn run_payouts(scheduler: web::Data<Arc<PayoutScheduler>>) -> HttpResponse {
    info!("API: manual payout scheduler run");
    api_result(scheduler.run_once().await, Domain::General)
}

pub async fn run_performance(
    config: web::Data<Arc<StaticConfig>>,
    refresher: web::Data<Arc<PerformanceRefresher>>,
) -> HttpResponse {
    info!("API: manual performance refresh");
    api_result(
        refresher.run_once(&config.jobs.performance_periods).await,
        Domain::General,
    )
}
