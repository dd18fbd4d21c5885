//! 后台定时任务：结算批次、业绩缓存、限流 key 清理
//!
//! 与线上请求并行运行，单次失败只记录日志，不会终止循环。

pub mod payout_scheduler;
pub mod performance_refresher;

pub use payout_scheduler::{PayoutScheduler, SchedulerReport};
pub use performance_refresher::{PerformanceRefresher, RefreshReport};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{info, trace, warn};

use crate::config::JobsConfig;
use crate::tracking::ClickTracker;

/// 限流 key 清理间隔
const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// 延迟 `initial_delay` 后每隔 `every` 执行一次 `task`
pub fn spawn_periodic<F, Fut, T, E>(
    name: &'static str,
    initial_delay: Duration,
    every: Duration,
    task: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send,
    E: std::fmt::Display,
{
    tokio::spawn(async move {
        sleep(initial_delay).await;
        let mut ticker = interval(every.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = task().await {
                warn!("Background job {} failed: {}", name, e);
            }
        }
    })
}

/// 按配置启动所有后台任务
pub fn spawn_jobs(
    config: &JobsConfig,
    scheduler: Arc<PayoutScheduler>,
    refresher: Arc<PerformanceRefresher>,
    tracker: Arc<ClickTracker>,
) -> Vec<JoinHandle<()>> {
    let initial_delay = Duration::from_secs(config.initial_delay_secs);
    let mut handles = Vec::new();

    if config.payouts_enabled {
        info!(
            "Payout scheduler every {}s (first run in {}s)",
            config.payout_interval_secs, config.initial_delay_secs
        );
        handles.push(spawn_periodic(
            "payout_scheduler",
            initial_delay,
            Duration::from_secs(config.payout_interval_secs),
            move || {
                let scheduler = scheduler.clone();
                async move { scheduler.run_once().await }
            },
        ));
    }

    if config.performance_enabled && !config.performance_periods.is_empty() {
        info!(
            "Performance refresher every {}s for {:?}",
            config.performance_interval_secs, config.performance_periods
        );
        let periods = config.performance_periods.clone();
        handles.push(spawn_periodic(
            "performance_refresher",
            initial_delay,
            Duration::from_secs(config.performance_interval_secs),
            move || {
                let refresher = refresher.clone();
                let periods = periods.clone();
                async move { refresher.run_once(&periods).await }
            },
        ));
    }

    handles.push(spawn_periodic(
        "rate_limit_prune",
        RATE_LIMIT_PRUNE_INTERVAL,
        RATE_LIMIT_PRUNE_INTERVAL,
        move || {
            let tracker = tracker.clone();
            async move {
                let remaining = tracker.prune_rate_limits();
                trace!("Rate limiter pruned, {} keys remain", remaining);
                Ok::<_, std::convert::Infallible>(())
            }
        },
    ));

    handles
}
