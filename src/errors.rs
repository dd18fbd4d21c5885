use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum AffiliateError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Serialization(String),
    Crypto(String),
    Configuration(String),
}

impl AffiliateError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            AffiliateError::DatabaseConfig(_) => "E001",
            AffiliateError::DatabaseConnection(_) => "E002",
            AffiliateError::DatabaseOperation(_) => "E003",
            AffiliateError::Validation(_) => "E004",
            AffiliateError::NotFound(_) => "E005",
            AffiliateError::Conflict(_) => "E006",
            AffiliateError::Serialization(_) => "E007",
            AffiliateError::Crypto(_) => "E008",
            AffiliateError::Configuration(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            AffiliateError::DatabaseConfig(_) => "Database Configuration Error",
            AffiliateError::DatabaseConnection(_) => "Database Connection Error",
            AffiliateError::DatabaseOperation(_) => "Database Operation Error",
            AffiliateError::Validation(_) => "Validation Error",
            AffiliateError::NotFound(_) => "Resource Not Found",
            AffiliateError::Conflict(_) => "State Conflict",
            AffiliateError::Serialization(_) => "Serialization Error",
            AffiliateError::Crypto(_) => "Crypto Error",
            AffiliateError::Configuration(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            AffiliateError::DatabaseConfig(msg)
            | AffiliateError::DatabaseConnection(msg)
            | AffiliateError::DatabaseOperation(msg)
            | AffiliateError::Validation(msg)
            | AffiliateError::NotFound(msg)
            | AffiliateError::Conflict(msg)
            | AffiliateError::Serialization(msg)
            | AffiliateError::Crypto(msg)
            | AffiliateError::Configuration(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            AffiliateError::Validation(_) | AffiliateError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            AffiliateError::NotFound(_) => StatusCode::NOT_FOUND,
            AffiliateError::Conflict(_) => StatusCode::CONFLICT,
            AffiliateError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AffiliateError::DatabaseConfig(_)
            | AffiliateError::DatabaseOperation(_)
            | AffiliateError::Crypto(_)
            | AffiliateError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（启动失败时打印到终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for AffiliateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for AffiliateError {}

// 便捷的构造函数
impl AffiliateError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        AffiliateError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        AffiliateError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        AffiliateError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AffiliateError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        AffiliateError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        AffiliateError::Conflict(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        AffiliateError::Serialization(msg.into())
    }

    pub fn crypto<T: Into<String>>(msg: T) -> Self {
        AffiliateError::Crypto(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        AffiliateError::Configuration(msg.into())
    }
}

impl From<sea_orm::DbErr> for AffiliateError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::RecordNotFound(msg) => AffiliateError::NotFound(msg),
            sea_orm::DbErr::ConnectionAcquire(e) => {
                AffiliateError::DatabaseConnection(e.to_string())
            }
            other => AffiliateError::DatabaseOperation(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AffiliateError {
    fn from(err: std::io::Error) -> Self {
        AffiliateError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for AffiliateError {
    fn from(err: serde_json::Error) -> Self {
        AffiliateError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AffiliateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(AffiliateError::validation("x").code(), "E004");
        assert_eq!(AffiliateError::conflict("x").code(), "E006");
        assert_eq!(AffiliateError::configuration("x").code(), "E009");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            AffiliateError::validation("bad rate").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AffiliateError::not_found("link").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AffiliateError::conflict("claimed").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AffiliateError::database_operation("boom").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_record_not_found_maps_to_not_found() {
        let err: AffiliateError = sea_orm::DbErr::RecordNotFound("payout".into()).into();
        assert!(matches!(err, AffiliateError::NotFound(_)));
        assert_eq!(err.message(), "payout");
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = AffiliateError::validation("percentage out of range");
        assert_eq!(err.to_string(), "Validation Error: percentage out of range");
    }
}
