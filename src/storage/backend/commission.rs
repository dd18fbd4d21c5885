//! event_commission_configs 读写

use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use tracing::info;

use super::converters::{config_to_active_model, model_to_config};
use super::{SeaOrmStorage, is_unique_violation, retry};
use crate::errors::{AffiliateError, Result};
use crate::storage::models::{CommissionConfig, PayoutFrequency};

use migration::entities::event_commission_config;

impl SeaOrmStorage {
    pub async fn insert_commission_config(&self, config: &CommissionConfig) -> Result<()> {
        event_commission_config::Entity::insert(config_to_active_model(config, true))
            .exec(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AffiliateError::conflict(format!(
                        "活动 {} 已存在佣金配置",
                        config.event_id
                    ))
                } else {
                    AffiliateError::database_operation(format!("创建佣金配置失败: {}", e))
                }
            })?;

        info!("Commission config created for event {}", config.event_id);
        Ok(())
    }

    pub async fn get_commission_config(&self, event_id: &str) -> Result<Option<CommissionConfig>> {
        let db = &self.db;
        retry::with_retry(
            &format!("get_commission_config({})", event_id),
            self.retry_config,
            || async {
                event_commission_config::Entity::find_by_id(event_id.to_string())
                    .one(db)
                    .await
            },
        )
        .await?
        .map(model_to_config)
        .transpose()
    }

    pub async fn update_commission_config(&self, config: &CommissionConfig) -> Result<()> {
        config_to_active_model(config, false)
            .update(&self.db)
            .await
            .map_err(|e| match e {
                sea_orm::DbErr::RecordNotUpdated => AffiliateError::not_found(format!(
                    "活动 {} 没有佣金配置",
                    config.event_id
                )),
                other => other.into(),
            })?;

        info!("Commission config updated for event {}", config.event_id);
        Ok(())
    }

    /// 参与自动结算的配置（排除 manual）
    pub async fn list_auto_payout_configs(&self) -> Result<Vec<CommissionConfig>> {
        event_commission_config::Entity::find()
            .filter(
                event_commission_config::Column::PayoutFrequency
                    .ne(PayoutFrequency::Manual.as_ref()),
            )
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_config)
            .collect()
    }
}
