use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::storage::models::PerformancePeriod;

/// 运行环境，production 下收紧 cookie 与限流策略
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RunEnvironment {
    Production,
    #[default]
    Development,
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 优先级：ENV > config.toml > 默认值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

impl StaticConfig {
    pub const DEFAULT_PATH: &'static str = "config.toml";

    /// 从 TOML 文件和环境变量加载配置
    ///
    /// ENV 前缀：AE，分隔符：__
    /// 示例：AE__SERVER__PORT=9999
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("AE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("tracking.trusted_proxies")
                    .with_list_parse_key("jobs.performance_periods")
                    .try_parsing(true),
            )
            .build()?;

        let config = settings.try_deserialize::<StaticConfig>()?;
        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }
        Ok(config)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == RunEnvironment::Production
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    #[serde(default)]
    pub environment: RunEnvironment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cpu_count: default_cpu_count(),
            environment: RunEnvironment::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// 连接/获取超时（秒）
    #[serde(default = "default_db_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_pool_size(),
            timeout: default_db_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// text / json
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_true")]
    pub enable_rotation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: true,
        }
    }
}

/// 点击追踪 / 归因 cookie 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub cookie_domain: Option<String>,
    /// base64 编码的 32 字节密钥
    #[serde(default)]
    pub encryption_key: Option<String>,
    /// 仅非 production 环境下用于派生密钥（SHA-256）
    #[serde(default)]
    pub fallback_secret: Option<String>,
    /// 识别推广码的查询参数名
    #[serde(default = "default_query_param")]
    pub query_param: String,
    #[serde(default = "default_attribution_days")]
    pub attribution_days: i64,
    #[serde(default = "default_dedupe_window_minutes")]
    pub dedupe_window_minutes: i64,
    /// 每个 IP 每分钟可记录的点击数（production）
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    /// 非 production 环境下的宽松限额
    #[serde(default = "default_dev_rate_limit_per_minute")]
    pub dev_rate_limit_per_minute: u32,
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    #[serde(default = "default_link_cache_ttl_secs")]
    pub link_cache_ttl_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_domain: None,
            encryption_key: None,
            fallback_secret: None,
            query_param: default_query_param(),
            attribution_days: default_attribution_days(),
            dedupe_window_minutes: default_dedupe_window_minutes(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            dev_rate_limit_per_minute: default_dev_rate_limit_per_minute(),
            trusted_proxies: Vec::new(),
            link_cache_ttl_secs: default_link_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 管理 API 的 Bearer token，为空时 /api 返回 404
    #[serde(default)]
    pub admin_token: String,
    /// 是否开放 POST /api/v1/conversions（由售票流程调用）
    #[serde(default = "default_true")]
    pub enable_conversion_hook: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            admin_token: String::new(),
            enable_conversion_hook: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_true")]
    pub payouts_enabled: bool,
    #[serde(default = "default_payout_interval_secs")]
    pub payout_interval_secs: u64,
    #[serde(default = "default_true")]
    pub performance_enabled: bool,
    #[serde(default = "default_performance_interval_secs")]
    pub performance_interval_secs: u64,
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    #[serde(default = "default_performance_periods")]
    pub performance_periods: Vec<PerformancePeriod>,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            payouts_enabled: true,
            payout_interval_secs: default_payout_interval_secs(),
            performance_enabled: true,
            performance_interval_secs: default_performance_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            performance_periods: default_performance_periods(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "sqlite://affiliate.db".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_db_timeout() -> u64 {
    8
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_cookie_name() -> String {
    "_event_i_ref".to_string()
}

fn default_query_param() -> String {
    "ref".to_string()
}

fn default_attribution_days() -> i64 {
    30
}

fn default_dedupe_window_minutes() -> i64 {
    60
}

fn default_rate_limit_per_minute() -> u32 {
    30
}

fn default_dev_rate_limit_per_minute() -> u32 {
    1000
}

fn default_link_cache_ttl_secs() -> u64 {
    60
}

fn default_payout_interval_secs() -> u64 {
    3600
}

fn default_performance_interval_secs() -> u64 {
    900
}

fn default_initial_delay_secs() -> u64 {
    30
}

fn default_performance_periods() -> Vec<PerformancePeriod> {
    vec![PerformancePeriod::Today]
}
