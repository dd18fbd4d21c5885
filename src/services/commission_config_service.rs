//! 每个活动的佣金配置：创建 / 读取 / 更新 / 预览
//!
//! 校验只在写入时进行，计算时不再兜底默认值。

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::commission::{self, Parties};
use crate::errors::{AffiliateError, Result};
use crate::storage::{CommissionBreakdown, CommissionConfig, CommissionPolicy, SeaOrmStorage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionConfigRequest {
    /// 创建时必填，更新时为空表示保持原值
    #[serde(default)]
    pub organizer_id: Option<String>,
    #[serde(flatten)]
    pub policy: CommissionPolicy,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub ticket_price: Decimal,
    #[serde(default)]
    pub with_agency: bool,
    #[serde(default = "default_true")]
    pub with_affiliate: bool,
    #[serde(default)]
    pub with_tier_2: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(flatten)]
    pub breakdown: CommissionBreakdown,
    pub calculation_breakdown: String,
}

pub struct CommissionConfigService {
    storage: Arc<SeaOrmStorage>,
}

impl CommissionConfigService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn create(&self, event_id: &str, req: CommissionConfigRequest) -> Result<CommissionConfig> {
        let organizer_id = req
            .organizer_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AffiliateError::validation("organizer_id is required"))?;
        commission::validate_policy(&req.policy)?;

        if self.storage.get_commission_config(event_id).await?.is_some() {
            return Err(AffiliateError::conflict(format!(
                "event '{}' already has a commission config",
                event_id
            )));
        }

        let now = Utc::now();
        let config = CommissionConfig {
            event_id: event_id.to_string(),
            organizer_id,
            policy: req.policy,
            created_at: now,
            updated_at: now,
        };
        self.storage.insert_commission_config(&config).await?;

        info!("Commission config created for event {}", event_id);
        Ok(config)
    }

    pub async fn get(&self, event_id: &str) -> Result<CommissionConfig> {
        self.storage
            .get_commission_config(event_id)
            .await?
            .ok_or_else(|| {
                AffiliateError::not_found(format!("no commission config for event '{}'", event_id))
            })
    }

    /// 整体替换策略
    pub async fn update(&self, event_id: &str, req: CommissionConfigRequest) -> Result<CommissionConfig> {
        commission::validate_policy(&req.policy)?;
        let mut config = self.get(event_id).await?;

        if let Some(organizer_id) = req.organizer_id.filter(|s| !s.trim().is_empty()) {
            config.organizer_id = organizer_id.trim().to_string();
        }
        config.policy = req.policy;
        config.updated_at = Utc::now();
        self.storage.update_commission_config(&config).await?;

        info!("Commission config updated for event {}", event_id);
        Ok(config)
    }

    /// 用已保存的配置试算，不写库
    pub async fn preview(&self, event_id: &str, req: &PreviewRequest) -> Result<PreviewResponse> {
        let config = self.get(event_id).await?;
        let parties = Parties {
            agency: req.with_agency,
            affiliate: req.with_affiliate,
            tier_2: req.with_affiliate && req.with_tier_2,
        };
        let breakdown = commission::calculate(req.ticket_price, &config.policy, parties)?;
        Ok(PreviewResponse {
            breakdown,
            calculation_breakdown: commission::format_breakdown(&breakdown, &config.policy),
        })
    }
}
