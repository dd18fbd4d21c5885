//! affiliate_payouts 读写与结算状态流转
//!
//! 所有状态变更都是带前置状态的条件更新，0 行受影响视为冲突。

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait, sea_query::Expr,
};
use tracing::{debug, info, warn};

use super::converters::{model_to_payout, payout_to_active_model};
use super::SeaOrmStorage;
use crate::errors::{AffiliateError, Result};
use crate::storage::models::{AffiliatePayout, LegPayoutStatus, PayeeKind, PayoutStatus};

use migration::entities::{affiliate_payout, referral_conversion};

/// 单条 UPDATE 最多绑定的转化 id 数
pub const LEG_UPDATE_CHUNK: usize = 500;

/// 创建结算批次的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Created,
    /// 部分转化已被其他批次认领，本批次整体回滚
    AlreadyClaimed { expected: usize, claimed: u64 },
}

/// 状态流转时一并写入的字段
#[derive(Debug, Clone, Default)]
pub struct PayoutPatch {
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub transaction_reference: Option<String>,
}

/// 转化表上对应某一方的 (状态列, 批次 id 列)
fn leg_columns(kind: PayeeKind) -> (referral_conversion::Column, referral_conversion::Column) {
    match kind {
        PayeeKind::Affiliate => (
            referral_conversion::Column::AffiliatePayoutStatus,
            referral_conversion::Column::AffiliatePayoutId,
        ),
        PayeeKind::Agency => (
            referral_conversion::Column::AgencyPayoutStatus,
            referral_conversion::Column::AgencyPayoutId,
        ),
    }
}

async fn set_leg_status<C: ConnectionTrait>(
    conn: &C,
    kind: PayeeKind,
    conversion_ids: &[String],
    from: LegPayoutStatus,
    to: LegPayoutStatus,
    payout_id: Option<&str>,
    expected_payout_id: Option<&str>,
) -> Result<u64> {
    let (status_col, id_col) = leg_columns(kind);
    let mut affected = 0;
    // 分批绑定 id，避免超出数据库的参数上限
    for chunk in conversion_ids.chunks(LEG_UPDATE_CHUNK) {
        let mut update = referral_conversion::Entity::update_many()
            .col_expr(status_col, Expr::value(to.as_ref()))
            .col_expr(id_col, Expr::value(payout_id.map(str::to_string)))
            .filter(referral_conversion::Column::Id.is_in(chunk.iter().cloned()))
            .filter(status_col.eq(from.as_ref()));
        if let Some(expected) = expected_payout_id {
            update = update.filter(id_col.eq(expected));
        }
        affected += update.exec(conn).await?.rows_affected;
    }
    Ok(affected)
}

impl SeaOrmStorage {
    /// 写入批次并认领其覆盖的转化（pending → scheduled），在同一事务中完成
    pub async fn create_payout_with_claim(&self, payout: &AffiliatePayout) -> Result<ClaimOutcome> {
        let txn = self.db.begin().await.map_err(|e| {
            AffiliateError::database_operation(format!("开始事务失败: {}", e))
        })?;

        affiliate_payout::Entity::insert(payout_to_active_model(payout)?)
            .exec(&txn)
            .await
            .map_err(|e| AffiliateError::database_operation(format!("写入结算批次失败: {}", e)))?;

        let claimed = set_leg_status(
            &txn,
            payout.payee_kind,
            &payout.conversion_ids,
            LegPayoutStatus::Pending,
            LegPayoutStatus::Scheduled,
            Some(&payout.id),
            None,
        )
        .await?;

        let expected = payout.conversion_ids.len();
        if claimed != expected as u64 {
            txn.rollback().await.map_err(|e| {
                AffiliateError::database_operation(format!("回滚事务失败: {}", e))
            })?;
            debug!(
                "Payout {} claimed {}/{} conversions, rolled back",
                payout.id, claimed, expected
            );
            return Ok(ClaimOutcome::AlreadyClaimed { expected, claimed });
        }

        txn.commit()
            .await
            .map_err(|e| AffiliateError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Payout {} scheduled for {} {} ({} conversions, gross {})",
            payout.id, payout.payee_kind, payout.payee_id, expected, payout.gross_amount
        );
        Ok(ClaimOutcome::Created)
    }

    pub async fn get_payout(&self, id: &str) -> Result<Option<AffiliatePayout>> {
        affiliate_payout::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(model_to_payout)
            .transpose()
    }

    pub async fn list_payouts_for_organizer(
        &self,
        organizer_id: &str,
        statuses: &[PayoutStatus],
    ) -> Result<Vec<AffiliatePayout>> {
        affiliate_payout::Entity::find()
            .filter(affiliate_payout::Column::OrganizerId.eq(organizer_id))
            .filter(
                affiliate_payout::Column::Status
                    .is_in(statuses.iter().map(|s| s.as_ref().to_string())),
            )
            .order_by_asc(affiliate_payout::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_payout)
            .collect()
    }

    pub async fn list_payouts_for_payee(&self, payee_id: &str) -> Result<Vec<AffiliatePayout>> {
        affiliate_payout::Entity::find()
            .filter(affiliate_payout::Column::PayeeId.eq(payee_id))
            .order_by_desc(affiliate_payout::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_payout)
            .collect()
    }

    /// 批次状态流转 `from → to`，并在同一事务内处理覆盖的转化：
    /// - cancelled / failed：scheduled → pending，清空批次 id
    /// - completed：scheduled → paid
    ///
    /// 返回 false 表示批次不存在或当前状态不在 `from` 中。
    pub async fn transition_payout(
        &self,
        id: &str,
        from: &[PayoutStatus],
        to: PayoutStatus,
        patch: PayoutPatch,
    ) -> Result<bool> {
        let txn = self.db.begin().await.map_err(|e| {
            AffiliateError::database_operation(format!("开始事务失败: {}", e))
        })?;

        let Some(model) = affiliate_payout::Entity::find_by_id(id.to_string())
            .one(&txn)
            .await?
        else {
            txn.rollback().await.ok();
            return Ok(false);
        };
        let payout = model_to_payout(model)?;

        let now = Utc::now();
        let mut update = affiliate_payout::Entity::update_many()
            .col_expr(affiliate_payout::Column::Status, Expr::value(to.as_ref()))
            .col_expr(affiliate_payout::Column::UpdatedAt, Expr::value(now));
        if let Some(at) = patch.approved_at {
            update = update.col_expr(affiliate_payout::Column::ApprovedAt, Expr::value(at));
        }
        if let Some(at) = patch.completed_at {
            update = update.col_expr(affiliate_payout::Column::CompletedAt, Expr::value(at));
        }
        if let Some(reason) = patch.failure_reason {
            update = update.col_expr(affiliate_payout::Column::FailureReason, Expr::value(reason));
        }
        if let Some(reference) = patch.transaction_reference {
            update = update.col_expr(
                affiliate_payout::Column::TransactionReference,
                Expr::value(reference),
            );
        }

        let res = update
            .filter(affiliate_payout::Column::Id.eq(id))
            .filter(
                affiliate_payout::Column::Status
                    .is_in(from.iter().map(|s| s.as_ref().to_string())),
            )
            .exec(&txn)
            .await?;

        if res.rows_affected == 0 {
            txn.rollback().await.ok();
            return Ok(false);
        }

        self.apply_leg_effects(&txn, &payout, to).await?;

        txn.commit()
            .await
            .map_err(|e| AffiliateError::database_operation(format!("提交事务失败: {}", e)))?;

        info!("Payout {}: {} → {}", id, payout.status, to);
        Ok(true)
    }

    async fn apply_leg_effects(
        &self,
        txn: &DatabaseTransaction,
        payout: &AffiliatePayout,
        to: PayoutStatus,
    ) -> Result<()> {
        let (from, leg_to, new_id) = match to {
            PayoutStatus::Cancelled | PayoutStatus::Failed => {
                (LegPayoutStatus::Scheduled, LegPayoutStatus::Pending, None)
            }
            PayoutStatus::Completed => (
                LegPayoutStatus::Scheduled,
                LegPayoutStatus::Paid,
                Some(payout.id.as_str()),
            ),
            _ => return Ok(()),
        };

        let updated = set_leg_status(
            txn,
            payout.payee_kind,
            &payout.conversion_ids,
            from,
            leg_to,
            new_id,
            Some(&payout.id),
        )
        .await?;

        if updated != payout.conversion_ids.len() as u64 {
            warn!(
                "Payout {} covers {} conversions but only {} moved to {}",
                payout.id,
                payout.conversion_ids.len(),
                updated,
                leg_to
            );
        }
        Ok(())
    }
}
