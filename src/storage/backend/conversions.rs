//! referral_conversions 读写
//!
//! 写入转化、标记点击、累加链接使用次数在同一个事务中完成。

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, ExprTrait, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::Expr,
};
use tracing::{debug, warn};

use super::converters::{conversion_to_active_model, model_to_conversion};
use super::{SeaOrmStorage, is_unique_violation};
use crate::errors::{AffiliateError, Result};
use crate::storage::models::{
    ConversionStatus, LegPayoutStatus, PayeeKind, ReferralConversion,
};

use migration::entities::{referral_conversion, referral_link};

/// 写入转化的结果
#[derive(Debug)]
pub enum PersistOutcome {
    /// 新写入；`click_marked` 为 false 表示该点击已被其他转化消费
    Inserted { click_marked: bool },
    /// 同一 ticket 已有转化
    Duplicate(Box<ReferralConversion>),
}

impl SeaOrmStorage {
    pub async fn find_conversion_by_ticket(
        &self,
        ticket_id: &str,
    ) -> Result<Option<ReferralConversion>> {
        referral_conversion::Entity::find()
            .filter(referral_conversion::Column::TicketId.eq(ticket_id))
            .one(&self.db)
            .await?
            .map(model_to_conversion)
            .transpose()
    }

    pub async fn get_conversion(&self, id: &str) -> Result<Option<ReferralConversion>> {
        referral_conversion::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(model_to_conversion)
            .transpose()
    }

    pub async fn persist_conversion(
        &self,
        conversion: &ReferralConversion,
    ) -> Result<PersistOutcome> {
        let active = conversion_to_active_model(conversion)?;
        let txn = self.db.begin().await.map_err(|e| {
            AffiliateError::database_operation(format!("开始事务失败: {}", e))
        })?;

        if let Err(e) = referral_conversion::Entity::insert(active).exec(&txn).await {
            txn.rollback().await.ok();
            if is_unique_violation(&e) {
                debug!("Conversion for ticket {} already exists", conversion.ticket_id);
                return match self.find_conversion_by_ticket(&conversion.ticket_id).await? {
                    Some(existing) => Ok(PersistOutcome::Duplicate(Box::new(existing))),
                    None => Err(AffiliateError::conflict(format!(
                        "转化写入冲突: {}",
                        conversion.ticket_id
                    ))),
                };
            }
            return Err(AffiliateError::database_operation(format!(
                "写入转化失败: {}",
                e
            )));
        }

        let click_marked = match conversion.click_id {
            Some(click_id) => Self::mark_click_converted(&txn, click_id, &conversion.id).await?,
            None => false,
        };
        if conversion.click_id.is_some() && !click_marked {
            warn!(
                "Click {:?} was already converted; conversion {} recorded without consuming it",
                conversion.click_id, conversion.id
            );
        }

        referral_link::Entity::update_many()
            .col_expr(
                referral_link::Column::UseCount,
                Expr::col(referral_link::Column::UseCount).add(1),
            )
            .filter(referral_link::Column::Id.eq(conversion.link_id.as_str()))
            .exec(&txn)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AffiliateError::database_operation(format!("提交事务失败: {}", e)))?;

        // use_count 影响 is_trackable
        self.invalidate_link_cache().await;
        Ok(PersistOutcome::Inserted { click_marked })
    }

    /// 某一方待结算的已确认转化：converted_at < cutoff，按时间升序
    pub async fn eligible_conversions(
        &self,
        leg: PayeeKind,
        event_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ReferralConversion>> {
        let query = referral_conversion::Entity::find()
            .filter(referral_conversion::Column::EventId.eq(event_id))
            .filter(referral_conversion::Column::Status.eq(ConversionStatus::Confirmed.as_ref()))
            .filter(referral_conversion::Column::ConvertedAt.lt(cutoff));

        let query = match leg {
            PayeeKind::Affiliate => query
                .filter(referral_conversion::Column::AffiliateId.is_not_null())
                .filter(
                    referral_conversion::Column::AffiliatePayoutStatus
                        .eq(LegPayoutStatus::Pending.as_ref()),
                ),
            PayeeKind::Agency => query
                .filter(referral_conversion::Column::AgencyId.is_not_null())
                .filter(
                    referral_conversion::Column::AgencyPayoutStatus
                        .eq(LegPayoutStatus::Pending.as_ref()),
                ),
        };

        query
            .order_by_asc(referral_conversion::Column::ConvertedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_conversion)
            .collect()
    }

    /// 时间窗口内的已确认转化（业绩汇总使用）
    pub async fn confirmed_conversions_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<referral_conversion::Model>> {
        let mut query = referral_conversion::Entity::find()
            .filter(referral_conversion::Column::Status.eq(ConversionStatus::Confirmed.as_ref()))
            .filter(referral_conversion::Column::AffiliateId.is_not_null());
        if let Some(since) = since {
            query = query.filter(referral_conversion::Column::ConvertedAt.gte(since));
        }
        Ok(query.all(&self.db).await?)
    }
}
