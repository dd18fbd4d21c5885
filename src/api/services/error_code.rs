//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::AffiliateError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 推广链接错误
/// - 4000-4099: 佣金配置错误
/// - 5000-5099: 结算批次错误
/// - 6000-6099: 追踪 / 转化 / 后台任务错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    Conflict = 1009,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    AuthFailed = 2000,

    // 推广链接错误 3000-3099
    LinkNotFound = 3000,
    LinkAlreadyExists = 3001,
    LinkInvalid = 3002,

    // 佣金配置错误 4000-4099
    ConfigNotFound = 4000,
    ConfigExists = 4001,
    ConfigInvalid = 4002,

    // 结算批次错误 5000-5099
    PayoutNotFound = 5000,
    PayoutStateConflict = 5001,
    PayoutInvalidRequest = 5002,

    // 追踪 / 转化 6000-6099
    ConversionNotRecorded = 6000,
    JobFailed = 6002,
}

/// 错误所属的 API 分组，决定 NotFound / Conflict / Validation 映射到哪个错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    General,
    Links,
    CommissionConfig,
    Payouts,
}

impl ErrorCode {
    pub fn for_error(err: &AffiliateError, domain: Domain) -> Self {
        match (domain, err) {
            (Domain::Links, AffiliateError::NotFound(_)) => ErrorCode::LinkNotFound,
            (Domain::Links, AffiliateError::Conflict(_)) => ErrorCode::LinkAlreadyExists,
            (Domain::Links, AffiliateError::Validation(_)) => ErrorCode::LinkInvalid,

            (Domain::CommissionConfig, AffiliateError::NotFound(_)) => ErrorCode::ConfigNotFound,
            (Domain::CommissionConfig, AffiliateError::Conflict(_)) => ErrorCode::ConfigExists,
            (Domain::CommissionConfig, AffiliateError::Validation(_)) => ErrorCode::ConfigInvalid,

            (Domain::Payouts, AffiliateError::NotFound(_)) => ErrorCode::PayoutNotFound,
            (Domain::Payouts, AffiliateError::Conflict(_)) => ErrorCode::PayoutStateConflict,
            (Domain::Payouts, AffiliateError::Validation(_)) => ErrorCode::PayoutInvalidRequest,

            (_, AffiliateError::Validation(_) | AffiliateError::Serialization(_)) => {
                ErrorCode::BadRequest
            }
            (_, AffiliateError::NotFound(_)) => ErrorCode::NotFound,
            (_, AffiliateError::Conflict(_)) => ErrorCode::Conflict,
            (_, AffiliateError::DatabaseConnection(_)) => ErrorCode::ServiceUnavailable,
            (
                _,
                AffiliateError::DatabaseConfig(_)
                | AffiliateError::DatabaseOperation(_)
                | AffiliateError::Crypto(_)
                | AffiliateError::Configuration(_),
            ) => ErrorCode::InternalServerError,
        }
    }
}

impl From<&AffiliateError> for ErrorCode {
    fn from(err: &AffiliateError) -> Self {
        ErrorCode::for_error(err, Domain::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_mapping() {
        let not_found = AffiliateError::not_found("x");
        assert_eq!(
            ErrorCode::for_error(&not_found, Domain::Links),
            ErrorCode::LinkNotFound
        );
        assert_eq!(
            ErrorCode::for_error(&not_found, Domain::Payouts),
            ErrorCode::PayoutNotFound
        );
        assert_eq!(ErrorCode::from(&not_found), ErrorCode::NotFound);

        let conflict = AffiliateError::conflict("x");
        assert_eq!(
            ErrorCode::for_error(&conflict, Domain::CommissionConfig),
            ErrorCode::ConfigExists
        );
        assert_eq!(
            ErrorCode::for_error(&conflict, Domain::Payouts),
            ErrorCode::PayoutStateConflict
        );
    }

    #[test]
    fn test_internal_errors_are_not_domain_specific() {
        let err = AffiliateError::database_operation("boom");
        assert_eq!(
            ErrorCode::for_error(&err, Domain::Links),
            ErrorCode::InternalServerError
        );
        assert_eq!(serde_json::to_string(&ErrorCode::PayoutStateConflict).unwrap(), "5001");
    }
}
