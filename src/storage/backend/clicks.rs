//! referral_clicks 读写

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, sea_query::Expr,
};

use super::converters::{model_to_click, new_click_to_active_model};
use super::{SeaOrmStorage, retry};
use crate::errors::Result;
use crate::storage::models::{NewClick, ReferralClick};

use migration::entities::referral_click;

impl SeaOrmStorage {
    /// 写入点击，返回自增 id
    pub async fn insert_click(&self, click: &NewClick) -> Result<i64> {
        let db = &self.db;
        let res = retry::with_retry(
            &format!("insert_click({})", click.link_id),
            self.retry_config,
            || async {
                referral_click::Entity::insert(new_click_to_active_model(click))
                    .exec(db)
                    .await
            },
        )
        .await?;
        Ok(res.last_insert_id)
    }

    /// 去重窗口内同一访客在同一链接上的最近一次点击
    pub async fn find_recent_click(
        &self,
        link_id: &str,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<ReferralClick>> {
        referral_click::Entity::find()
            .filter(referral_click::Column::LinkId.eq(link_id))
            .filter(referral_click::Column::VisitorFingerprint.eq(fingerprint))
            .filter(referral_click::Column::ClickedAt.gte(since))
            .order_by_desc(referral_click::Column::ClickedAt)
            .order_by_desc(referral_click::Column::Id)
            .one(&self.db)
            .await?
            .map(model_to_click)
            .transpose()
    }

    /// 链接的点击历史，按 (clicked_at, id) 升序
    pub async fn clicks_for_link(
        &self,
        link_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ReferralClick>> {
        let mut query =
            referral_click::Entity::find().filter(referral_click::Column::LinkId.eq(link_id));
        if let Some(since) = since {
            query = query.filter(referral_click::Column::ClickedAt.gte(since));
        }

        query
            .order_by_asc(referral_click::Column::ClickedAt)
            .order_by_asc(referral_click::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_click)
            .collect()
    }

    pub async fn get_click(&self, id: i64) -> Result<Option<ReferralClick>> {
        referral_click::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_click)
            .transpose()
    }

    /// converted: false → true，只发生一次；返回是否由本次调用完成
    pub(crate) async fn mark_click_converted<C: ConnectionTrait>(
        conn: &C,
        click_id: i64,
        conversion_id: &str,
    ) -> Result<bool> {
        let res = referral_click::Entity::update_many()
            .col_expr(referral_click::Column::Converted, Expr::value(true))
            .col_expr(
                referral_click::Column::ConversionId,
                Expr::value(conversion_id),
            )
            .filter(referral_click::Column::Id.eq(click_id))
            .filter(referral_click::Column::Converted.eq(false))
            .exec(conn)
            .await?;
        Ok(res.rows_affected == 1)
    }
}
