//! referral_links 读写

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ExprTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};
use tracing::{debug, info};

use super::converters::{link_to_active_model, model_to_link};
use super::{SeaOrmStorage, is_unique_violation, retry};
use crate::errors::{AffiliateError, Result};
use crate::storage::models::{LinkStatus, ReferralLink};

use migration::entities::referral_link;

/// 链接列表过滤条件
#[derive(Default, Clone, Debug)]
pub struct LinkFilter {
    pub event_id: Option<String>,
    pub affiliate_id: Option<String>,
    pub agency_id: Option<String>,
    pub status: Option<LinkStatus>,
    /// 是否包含已软删除的链接
    pub include_deleted: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SeaOrmStorage {
    pub async fn insert_link(&self, link: &ReferralLink) -> Result<()> {
        let active = link_to_active_model(link, true);
        referral_link::Entity::insert(active)
            .exec(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AffiliateError::conflict(format!("推广码已存在: {}", link.code))
                } else {
                    AffiliateError::database_operation(format!("创建推广链接失败: {}", e))
                }
            })?;

        info!("Referral link created: {} ({})", link.code, link.id);
        Ok(())
    }

    pub async fn get_link(&self, id: &str) -> Result<Option<ReferralLink>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("get_link({})", id), self.retry_config, || async {
            referral_link::Entity::find_by_id(id.to_string()).one(db).await
        })
        .await?;

        model.map(model_to_link).transpose()
    }

    /// 按推广码查询，结果进入短 TTL 缓存
    pub async fn get_link_by_code(&self, code: &str) -> Result<Option<ReferralLink>> {
        if let Some(link) = self.link_cache.get(code).await {
            debug!("Link cache hit: {}", code);
            return Ok(Some(link));
        }

        let db = &self.db;
        let model = retry::with_retry(
            &format!("get_link_by_code({})", code),
            self.retry_config,
            || async {
                referral_link::Entity::find()
                    .filter(referral_link::Column::Code.eq(code))
                    .one(db)
                    .await
            },
        )
        .await?;

        let link = model.map(model_to_link).transpose()?;
        if let Some(ref link) = link {
            self.link_cache
                .insert(code.to_string(), link.clone())
                .await;
        }
        Ok(link)
    }

    pub async fn get_link_by_short_code(&self, short_code: &str) -> Result<Option<ReferralLink>> {
        referral_link::Entity::find()
            .filter(referral_link::Column::ShortCode.eq(short_code))
            .one(&self.db)
            .await?
            .map(model_to_link)
            .transpose()
    }

    pub async fn code_exists(&self, code: &str) -> Result<bool> {
        let found = referral_link::Entity::find()
            .select_only()
            .column(referral_link::Column::Id)
            .filter(
                Condition::any()
                    .add(referral_link::Column::Code.eq(code))
                    .add(referral_link::Column::ShortCode.eq(code)),
            )
            .into_tuple::<String>()
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }

    pub async fn list_links(&self, filter: &LinkFilter) -> Result<Vec<ReferralLink>> {
        let mut query = referral_link::Entity::find();

        if let Some(ref event_id) = filter.event_id {
            query = query.filter(referral_link::Column::EventId.eq(event_id.as_str()));
        }
        if let Some(ref affiliate_id) = filter.affiliate_id {
            query = query.filter(referral_link::Column::AffiliateId.eq(affiliate_id.as_str()));
        }
        if let Some(ref agency_id) = filter.agency_id {
            query = query.filter(referral_link::Column::AgencyId.eq(agency_id.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(referral_link::Column::Status.eq(status.as_ref()));
        }
        if !filter.include_deleted {
            query = query.filter(referral_link::Column::DeletedAt.is_null());
        }

        query
            .order_by_desc(referral_link::Column::CreatedAt)
            .limit(std::cmp::Ord::min(filter.limit.unwrap_or(100), 1000))
            .offset(filter.offset.unwrap_or(0))
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_link)
            .collect()
    }

    /// 保存可变字段（不含计数器）
    pub async fn update_link(&self, link: &ReferralLink) -> Result<()> {
        let active = link_to_active_model(link, false);
        active.update(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                AffiliateError::conflict(format!("短码已存在: {:?}", link.short_code))
            } else {
                AffiliateError::from(e)
            }
        })?;

        self.invalidate_link_cache().await;
        Ok(())
    }

    /// 仅当链接还没有短码时写入，返回是否写入成功
    pub async fn set_short_code(&self, id: &str, short_code: &str) -> Result<bool> {
        let result = referral_link::Entity::update_many()
            .col_expr(referral_link::Column::ShortCode, Expr::value(short_code))
            .col_expr(referral_link::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(referral_link::Column::Id.eq(id))
            .filter(referral_link::Column::ShortCode.is_null())
            .exec(&self.db)
            .await;

        match result {
            Ok(res) => {
                self.invalidate_link_cache().await;
                Ok(res.rows_affected == 1)
            }
            Err(e) if is_unique_violation(&e) => Err(AffiliateError::conflict(format!(
                "短码冲突: {}",
                short_code
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// 软删除：status → paused 并记录删除时间
    pub async fn soft_delete_link(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let res = referral_link::Entity::update_many()
            .col_expr(
                referral_link::Column::Status,
                Expr::value(LinkStatus::Paused.as_ref()),
            )
            .col_expr(referral_link::Column::DeletedAt, Expr::value(at))
            .col_expr(referral_link::Column::UpdatedAt, Expr::value(at))
            .filter(referral_link::Column::Id.eq(id))
            .filter(referral_link::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        self.invalidate_link_cache().await;
        Ok(res.rows_affected == 1)
    }

    /// 点击计数原子自增（不经过缓存）
    pub async fn increment_click_count(&self, id: &str) -> Result<()> {
        let db = &self.db;
        retry::with_retry(
            &format!("increment_click_count({})", id),
            self.retry_config,
            || async {
                referral_link::Entity::update_many()
                    .col_expr(
                        referral_link::Column::ClickCount,
                        Expr::col(referral_link::Column::ClickCount).add(1),
                    )
                    .filter(referral_link::Column::Id.eq(id))
                    .exec(db)
                    .await
            },
        )
        .await?;
        Ok(())
    }
}
