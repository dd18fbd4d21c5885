//! 售票流程调用的转化回调
//!
//! 购票路径对调用方不可见：无论结果如何都返回 200，未记录时带上原因。

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::StaticConfig;
use crate::services::{ConversionOutcome, ConversionRecorder, NotRecordedReason};
use crate::storage::Ticket;
use crate::tracking::ClickTracker;

use super::error_code::ErrorCode;
use super::helpers::{error_response, success_response};
use super::types::ConversionHookResponse;

/// 服务端转发 cookie 时使用的请求头
pub const TRACKING_COOKIE_HEADER: &str = "x-tracking-cookie";

fn tracking_cookie(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    req.headers()
        .get(TRACKING_COOKIE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| req.cookie(cookie_name).map(|c| c.value().to_string()))
}

fn not_recorded(reason: &str) -> HttpResponse {
    success_response(ConversionHookResponse {
        recorded: false,
        reason: Some(reason.to_string()),
        ..Default::default()
    })
}

pub async fn record_conversion(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<Arc<StaticConfig>>,
    tracker: web::Data<Arc<ClickTracker>>,
    recorder: web::Data<Arc<ConversionRecorder>>,
) -> HttpResponse {
    if !config.api.enable_conversion_hook {
        return error_response(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            "Conversion hook is disabled",
        );
    }

    let ticket: Ticket = match serde_json::from_slice(&body) {
        Ok(ticket) => ticket,
        Err(e) => {
            debug!("Conversion hook received an invalid ticket: {}", e);
            return not_recorded(NotRecordedReason::InvalidTicket.as_ref());
        }
    };

    let cookie = tracking_cookie(&req, tracker.cookie_name());
    match recorder.record(cookie.as_deref(), &ticket).await {
        Ok(ConversionOutcome::Recorded(conversion)) => success_response(ConversionHookResponse {
            recorded: true,
            conversion_id: Some(conversion.id),
            ..Default::default()
        }),
        Ok(ConversionOutcome::Duplicate(conversion)) => success_response(ConversionHookResponse {
            recorded: true,
            conversion_id: Some(conversion.id),
            duplicate: true,
            reason: None,
        }),
        Ok(ConversionOutcome::NotRecorded(reason)) => {
            debug!("Ticket {} not attributed: {}", ticket.id, reason);
            not_recorded(reason.as_ref())
        }
        Err(e) => {
            error!("Conversion recording for ticket {} failed: {}", ticket.id, e);
            not_recorded("internal_error")
        }
    }
}
