//! Server mode
//!
//! 启动 HTTP 服务与后台任务，Ctrl+C 时优雅关闭。

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::middleware::{AdminAuth, ClickTracking, RequestIdMiddleware};
use crate::api::services::{api_v1_routes, extractor_config, health_routes, redirect_routes};
use crate::jobs::spawn_jobs;
use crate::runtime::lifetime::{self, AppState};

pub async fn run_server(state: AppState) -> Result<()> {
    let config = state.config.clone();
    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let cpu_count = config.server.cpu_count.max(1);
    let admin_token = config.api.admin_token.clone();

    if admin_token.trim().is_empty() {
        warn!("Management API is disabled (api.admin_token not set)");
    } else {
        info!("Management API available at /api/v1");
    }

    let jobs = spawn_jobs(
        &config.jobs,
        state.payout_scheduler.clone(),
        state.performance_refresher.clone(),
        state.tracker.clone(),
    );

    // Clone db reference before state moves into HttpServer closure
    let db_for_shutdown = state.storage.get_db().clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(ClickTracking::new(state.tracker.clone()))
            .wrap(Compress::default())
            .wrap(RequestIdMiddleware)
            .configure(|cfg| state.configure(cfg))
            .app_data(web::PayloadConfig::new(256 * 1024))
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .service(
                web::scope("/api")
                    .wrap(AdminAuth::new(&admin_token))
                    .configure(extractor_config)
                    .service(api_v1_routes()),
            )
            .service(health_routes())
            .service(redirect_routes())
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count)
    .disable_signals();

    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();
    let handle = server.handle();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(db_for_shutdown, jobs) => {
            handle.stop(true).await;
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}
