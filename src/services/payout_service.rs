//! Payout management service
//!
//! 审批、驳回、完成、失败都是带前置状态的条件更新，0 行受影响返回 Conflict。

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{AffiliateError, Result};
use crate::storage::backend::PayoutPatch;
use crate::storage::{AffiliatePayout, PayoutStatus, SeaOrmStorage};

/// 主办方待处理的批次状态
pub const PENDING_STATUSES: [PayoutStatus; 2] = [PayoutStatus::Pending, PayoutStatus::Scheduled];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteBatchRequest {
    pub payout_ids: Vec<String>,
    #[serde(default)]
    pub transaction_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailedItem {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchCompleteResult {
    pub completed: Vec<String>,
    pub failed: Vec<BatchFailedItem>,
}

pub struct PayoutService {
    storage: Arc<SeaOrmStorage>,
}

impl PayoutService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn get(&self, id: &str) -> Result<AffiliatePayout> {
        self.storage
            .get_payout(id)
            .await?
            .ok_or_else(|| AffiliateError::not_found(format!("payout '{}' not found", id)))
    }

    pub async fn list_pending(&self, organizer_id: &str) -> Result<Vec<AffiliatePayout>> {
        self.storage
            .list_payouts_for_organizer(organizer_id, &PENDING_STATUSES)
            .await
    }

    pub async fn payee_history(&self, payee_id: &str) -> Result<Vec<AffiliatePayout>> {
        self.storage.list_payouts_for_payee(payee_id).await
    }

    async fn transition(
        &self,
        id: &str,
        from: &[PayoutStatus],
        to: PayoutStatus,
        patch: PayoutPatch,
    ) -> Result<AffiliatePayout> {
        if self.storage.transition_payout(id, from, to, patch).await? {
            info!("Payout {} → {}", id, to);
            return self.get(id).await;
        }

        // 区分不存在与状态冲突
        let current = self.get(id).await?;
        Err(AffiliateError::conflict(format!(
            "payout '{}' is {}, cannot move to {}",
            id, current.status, to
        )))
    }

    /// pending | scheduled → processing
    pub async fn approve(&self, id: &str) -> Result<AffiliatePayout> {
        self.transition(
            id,
            &PENDING_STATUSES,
            PayoutStatus::Processing,
            PayoutPatch {
                approved_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    /// pending | scheduled → cancelled，覆盖的转化回到 pending
    pub async fn reject(&self, id: &str, reason: Option<String>) -> Result<AffiliatePayout> {
        self.transition(
            id,
            &PENDING_STATUSES,
            PayoutStatus::Cancelled,
            PayoutPatch {
                failure_reason: reason.filter(|r| !r.trim().is_empty()),
                ..Default::default()
            },
        )
        .await
    }

    /// processing → failed，覆盖的转化回到 pending
    pub async fn fail(&self, id: &str, reason: &str) -> Result<AffiliatePayout> {
        if reason.trim().is_empty() {
            return Err(AffiliateError::validation("failure reason is required"));
        }
        self.transition(
            id,
            &[PayoutStatus::Processing],
            PayoutStatus::Failed,
            PayoutPatch {
                failure_reason: Some(reason.trim().to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// processing → completed，逐个处理，单个失败不影响其他
    pub async fn complete_batch(&self, req: &CompleteBatchRequest) -> Result<BatchCompleteResult> {
        if req.payout_ids.is_empty() {
            return Err(AffiliateError::validation("payout_ids must not be empty"));
        }

        let now = Utc::now();
        let mut result = BatchCompleteResult::default();
        for id in &req.payout_ids {
            let patch = PayoutPatch {
                completed_at: Some(now),
                transaction_reference: req.transaction_reference.clone(),
                ..Default::default()
            };
            match self
                .transition(id, &[PayoutStatus::Processing], PayoutStatus::Completed, patch)
                .await
            {
                Ok(_) => result.completed.push(id.clone()),
                Err(e) => {
                    warn!("Payout {} not completed: {}", id, e);
                    result.failed.push(BatchFailedItem {
                        id: id.clone(),
                        reason: e.message().to_string(),
                    });
                }
            }
        }

        info!(
            "Payout batch complete: {} completed, {} failed",
            result.completed.len(),
            result.failed.len()
        );
        Ok(result)
    }
}
