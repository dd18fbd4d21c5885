//! HTTP 端点
//!
//! - `/api/v1/*`：管理 API（佣金配置、推广链接、结算、业绩、转化回调）
//! - `/health`：存活与数据库探测
//! - `/r/{short_code}`：短链跳转

mod commission_config;
mod conversions;
pub mod error_code;
mod health;
mod helpers;
mod jobs;
mod links;
mod payouts;
mod performance;
pub mod redirect;
pub mod routes;
mod types;

pub use conversions::TRACKING_COOKIE_HEADER;
pub use error_code::{Domain, ErrorCode};
pub use health::{AppStartTime, HealthService};
pub use helpers::{
    api_result, error_from_affiliate, error_response, extractor_config, json_response,
    success_response,
};
pub use redirect::{RedirectParam, RedirectService};
pub use routes::{api_v1_routes, health_routes, redirect_routes};
pub use types::*;
