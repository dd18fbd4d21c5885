//! SeaORM storage backend
//!
//! 支持 SQLite、MySQL/MariaDB 与 PostgreSQL，按表拆分为若干子模块。

mod clicks;
mod commission;
mod connection;
pub mod converters;
mod conversions;
mod links;
mod payouts;
mod performance;
pub mod retry;

use std::time::Duration;

use moka::future::Cache;
use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::errors::{AffiliateError, Result};
use crate::storage::models::ReferralLink;

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use conversions::PersistOutcome;
pub use links::LinkFilter;
pub use payouts::{ClaimOutcome, LEG_UPDATE_CHUNK, PayoutPatch};
pub use performance::{ClickAggregateRow, ConversionAggregateRow};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(AffiliateError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// code → link 的短 TTL 缓存，链接变更时失效
    link_cache: Cache<String, ReferralLink>,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(config: &DatabaseConfig, link_cache_ttl: Duration) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(AffiliateError::database_config("database_url 未设置"));
        }

        let backend_name = infer_backend_from_url(&config.database_url)?;
        let db = if backend_name == "sqlite" {
            connect_sqlite(&config.database_url, config.timeout).await?
        } else {
            connect_generic(&config.database_url, &backend_name, config).await?
        };

        run_migrations(&db).await?;

        let storage = SeaOrmStorage {
            db,
            backend_name,
            link_cache: Cache::builder()
                .time_to_live(link_cache_ttl)
                .max_capacity(10_000)
                .build(),
            retry_config: retry::RetryConfig::from(config),
        };

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// 获取数据库连接（健康检查、关闭时使用）
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await.map_err(|e| {
            AffiliateError::database_connection(format!("数据库不可用: {}", e))
        })
    }

    pub async fn close(self) -> Result<()> {
        self.db
            .close()
            .await
            .map_err(|e| AffiliateError::database_operation(format!("关闭连接失败: {}", e)))
    }

    /// 清空链接缓存（链接变更时调用）
    pub async fn invalidate_link_cache(&self) {
        self.link_cache.invalidate_all();
        self.link_cache.run_pending_tasks().await;
    }
}

/// 唯一约束冲突
pub(crate) fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://data.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("sqlite::memory:").unwrap(),
            "sqlite"
        );
        assert_eq!(infer_backend_from_url("affiliate.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@localhost/db").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/db").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }
}
