use sea_orm::DatabaseConnection;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub async fn listen_for_shutdown(db: DatabaseConnection, jobs: Vec<JoinHandle<()>>) {
    // 等待 Ctrl+C 信号
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, stopping background jobs...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    let shutdown_result = timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        perform_shutdown_tasks(db, jobs),
    )
    .await;

    match shutdown_result {
        Ok(()) => {
            info!("All shutdown tasks completed successfully");
        }
        Err(_) => {
            error!(
                "Shutdown tasks timed out after {} seconds! Forcing exit.",
                SHUTDOWN_TIMEOUT_SECS
            );
            std::process::exit(1);
        }
    }
}

/// 执行所有关闭任务（在超时内调用）
async fn perform_shutdown_tasks(db: DatabaseConnection, jobs: Vec<JoinHandle<()>>) {
    // 任务在每轮之间都可以安全中断，转化认领本身在事务里
    for job in &jobs {
        job.abort();
    }
    for job in jobs {
        let _ = job.await;
    }
    info!("Background jobs stopped");

    match db.close().await {
        Ok(()) => info!("Database pool closed"),
        Err(e) => error!("Failed to close database pool: {}", e),
    }
}
