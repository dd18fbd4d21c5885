//! HTTP 层：中间件与端点

pub mod middleware;
pub mod services;
