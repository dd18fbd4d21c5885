//! API 帮助函数

use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use tracing::{debug, error};

use super::error_code::{Domain, ErrorCode};
use super::types::ApiResponse;
use crate::errors::AffiliateError;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 AffiliateError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
///
/// 内部错误只记录日志，不把数据库细节返回给调用方。
pub fn error_from_affiliate(err: &AffiliateError, domain: Domain) -> HttpResponse {
    let status = err.http_status();
    let code = ErrorCode::for_error(err, domain);
    if status.is_server_error() {
        error!("API request failed: {}", err);
        let message = if status == StatusCode::SERVICE_UNAVAILABLE {
            "Service temporarily unavailable"
        } else {
            "Internal server error"
        };
        return error_response(status, code, message);
    }
    debug!("API request rejected: {}", err);
    error_response(status, code, err.message())
}

/// 统一 Result → HttpResponse 转换
///
/// 成功时返回 200 OK + JSON 数据，失败时自动映射 AffiliateError。
pub fn api_result<T: Serialize>(result: Result<T, AffiliateError>, domain: Domain) -> HttpResponse {
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_affiliate(&e, domain),
    }
}

/// JSON body 解析失败时返回统一信封
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid JSON body: {}", err);
    let response = error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message);
    InternalError::from_response(err, response).into()
}

/// 查询参数解析失败时返回统一信封
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid query string: {}", err);
    let response = error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message);
    InternalError::from_response(err, response).into()
}

/// API scope 使用的 JSON / Query 解析配置
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(256 * 1024)
            .error_handler(json_error_handler),
    )
    .app_data(web::QueryConfig::default().error_handler(query_error_handler));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let err = AffiliateError::database_operation("UNIQUE constraint failed: secret_table");
        let resp = error_from_affiliate(&err, Domain::Links);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["code"], ErrorCode::InternalServerError as i32);
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_api_result_maps_domain() {
        let resp = api_result::<()>(Err(AffiliateError::conflict("payout is completed")), Domain::Payouts);
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["code"], ErrorCode::PayoutStateConflict as i32);
        assert_eq!(body["message"], "payout is completed");
        assert!(body.get("data").is_none());
    }
}
