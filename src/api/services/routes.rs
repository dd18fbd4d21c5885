//! API 路由配置
//!
//! 将 /v1 下的路由按功能模块拆分。

use actix_web::web;

use super::commission_config::{create_config, get_config, preview_config, update_config};
use super::conversions::record_conversion;
use super::health::HealthService;
use super::jobs::{run_payouts, run_performance};
use super::links::{create_link, delete_link, get_link, list_links, shorten_link, update_link};
use super::payouts::{
    approve_payout, complete_payouts, fail_payout, get_payout, list_pending, payee_history,
    reject_payout,
};
use super::performance::get_performance;
use super::redirect::RedirectService;

/// 活动佣金配置 `/events/{event_id}/commission-config`
pub fn commission_config_routes() -> actix_web::Scope {
    web::scope("/events/{event_id}/commission-config")
        .route("", web::post().to(create_config))
        .route("", web::get().to(get_config))
        .route("", web::put().to(update_config))
        .route("/preview", web::post().to(preview_config))
}

/// 推广链接 `/links`
pub fn links_routes() -> actix_web::Scope {
    web::scope("/links")
        .route("", web::get().to(list_links))
        .route("", web::post().to(create_link))
        .route("/{id}/shorten", web::post().to(shorten_link))
        .route("/{id}", web::get().to(get_link))
        .route("/{id}", web::put().to(update_link))
        .route("/{id}", web::delete().to(delete_link))
}

/// 结算批次：主办方审批 + 收款方历史 + 运营操作
///
/// - GET /organizers/{organizer_id}/payouts/pending
/// - GET /payees/{payee_id}/payouts
/// - GET /payouts/{id}
/// - POST /payouts/{id}/approve
/// - POST /payouts/{id}/reject
/// - POST /admin/payouts/complete
/// - POST /admin/payouts/{id}/fail
pub fn payouts_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/organizers/{organizer_id}/payouts/pending",
        web::get().to(list_pending),
    )
    .route("/payees/{payee_id}/payouts", web::get().to(payee_history))
    .service(
        web::scope("/payouts")
            .route("/{id}", web::get().to(get_payout))
            .route("/{id}/approve", web::post().to(approve_payout))
            .route("/{id}/reject", web::post().to(reject_payout)),
    );
}

/// 运营端点 `/admin`
pub fn admin_routes() -> actix_web::Scope {
    web::scope("/admin")
        .route("/payouts/complete", web::post().to(complete_payouts))
        .route("/payouts/{id}/fail", web::post().to(fail_payout))
        .route("/jobs/payouts/run", web::post().to(run_payouts))
        .route("/jobs/performance/run", web::post().to(run_performance))
}

/// API v1 路由
pub fn api_v1_routes() -> actix_web::Scope {
    web::scope("/v1")
        .service(commission_config_routes())
        .service(links_routes())
        .service(admin_routes())
        .route(
            "/affiliates/{affiliate_id}/performance",
            web::get().to(get_performance),
        )
        .route("/conversions", web::post().to(record_conversion))
        .configure(payouts_routes)
}

/// Health 路由 `/health`
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
}

/// 短链跳转 `/r/{short_code}`
pub fn redirect_routes() -> actix_web::Scope {
    web::scope("/r").route("/{short_code}", web::get().to(RedirectService::handle_redirect))
}
