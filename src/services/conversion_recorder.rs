//! 转化记录
//!
//! 购票时调用：解码 tracking cookie → 校验链接 → 读取佣金配置 → 归因 →
//! 计算佣金 → 在一个事务中写入转化并标记主点击。
//! 任一前置条件不满足都返回 `NotRecorded`，不会向购票流程抛出错误。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use strum::{AsRefStr, Display};
use tracing::{debug, info};
use uuid::Uuid;

use super::attribution::{self, primary_click};
use super::commission::{self, Parties};
use crate::errors::Result;
use crate::storage::backend::PersistOutcome;
use crate::storage::{
    ConversionStatus, LegPayoutStatus, ReferralConversion, SeaOrmStorage, Ticket,
};
use crate::tracking::CookieCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotRecordedReason {
    NoCookie,
    InvalidCookie,
    CookieExpired,
    InvalidTicket,
    LinkNotFound,
    LinkInactive,
    EventMismatch,
    NoCommissionConfig,
    NoAttributedClick,
}

#[derive(Debug)]
pub enum ConversionOutcome {
    Recorded(Box<ReferralConversion>),
    /// 同一 ticket 已记录过，返回已有记录
    Duplicate(Box<ReferralConversion>),
    NotRecorded(NotRecordedReason),
}

pub struct ConversionRecorder {
    storage: Arc<SeaOrmStorage>,
    codec: CookieCodec,
}

impl ConversionRecorder {
    pub fn new(storage: Arc<SeaOrmStorage>, codec: CookieCodec) -> Self {
        Self { storage, codec }
    }

    pub async fn record(&self, cookie: Option<&str>, ticket: &Ticket) -> Result<ConversionOutcome> {
        self.record_at(cookie, ticket, Utc::now()).await
    }

    pub async fn record_at(
        &self,
        cookie: Option<&str>,
        ticket: &Ticket,
        now: DateTime<Utc>,
    ) -> Result<ConversionOutcome> {
        use NotRecordedReason::*;

        let Some(cookie) = cookie.filter(|c| !c.is_empty()) else {
            return Ok(ConversionOutcome::NotRecorded(NoCookie));
        };
        let Some(payload) = self.codec.decode(cookie) else {
            return Ok(ConversionOutcome::NotRecorded(InvalidCookie));
        };
        if payload.is_expired(now) {
            debug!("Tracking cookie for {} expired at {}", payload.ref_code, payload.expires_at);
            return Ok(ConversionOutcome::NotRecorded(CookieExpired));
        }
        if ticket.id.is_empty() || ticket.price.is_sign_negative() {
            return Ok(ConversionOutcome::NotRecorded(InvalidTicket));
        }

        if let Some(existing) = self.storage.find_conversion_by_ticket(&ticket.id).await? {
            debug!("Ticket {} already converted as {}", ticket.id, existing.id);
            return Ok(ConversionOutcome::Duplicate(Box::new(existing)));
        }

        let Some(link) = self.storage.get_link(&payload.link_id).await? else {
            return Ok(ConversionOutcome::NotRecorded(LinkNotFound));
        };
        if !link.is_trackable(now) {
            return Ok(ConversionOutcome::NotRecorded(LinkInactive));
        }
        if link.event_id != ticket.event_id {
            debug!(
                "Ticket {} is for event {}, link {} is for {}",
                ticket.id, ticket.event_id, link.id, link.event_id
            );
            return Ok(ConversionOutcome::NotRecorded(EventMismatch));
        }

        let Some(config) = self.storage.get_commission_config(&link.event_id).await? else {
            return Ok(ConversionOutcome::NotRecorded(NoCommissionConfig));
        };
        let policy = &config.policy;

        let converted_at = ticket.purchased_at.unwrap_or(now);
        let window_days = i64::from(policy.attribution_window_days);
        let clicks = self
            .storage
            .clicks_for_link(&link.id, Some(converted_at - Duration::days(window_days)))
            .await?;
        let attributed =
            attribution::resolve(&clicks, converted_at, policy.attribution_model, window_days);
        let Some(primary_click_id) = primary_click(&attributed).map(|c| c.click_id) else {
            return Ok(ConversionOutcome::NotRecorded(NoAttributedClick));
        };

        let tier_2_affiliate_id = link
            .parent_affiliate_id
            .clone()
            .filter(|_| policy.multi_tier_enabled && link.affiliate_id.is_some());
        let parties = Parties {
            agency: link.agency_id.is_some(),
            affiliate: link.affiliate_id.is_some(),
            tier_2: tier_2_affiliate_id.is_some(),
        };
        let amounts = match commission::calculate(ticket.price, policy, parties) {
            Ok(amounts) => amounts,
            Err(e) => {
                debug!("Ticket {} rejected by calculator: {}", ticket.id, e);
                return Ok(ConversionOutcome::NotRecorded(InvalidTicket));
            }
        };

        let conversion = ReferralConversion {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket.id.clone(),
            event_id: link.event_id.clone(),
            link_id: link.id.clone(),
            click_id: Some(primary_click_id),
            affiliate_id: link.affiliate_id.clone(),
            agency_id: link.agency_id.clone(),
            tier_2_affiliate_id,
            amounts,
            attribution_model: policy.attribution_model,
            calculation_breakdown: commission::format_breakdown(&amounts, policy),
            config_snapshot: serde_json::to_value(&config)?,
            attributed_clicks: attributed,
            status: ConversionStatus::Confirmed,
            agency_payout_status: LegPayoutStatus::Pending,
            agency_payout_id: None,
            affiliate_payout_status: LegPayoutStatus::Pending,
            affiliate_payout_id: None,
            converted_at,
            created_at: now,
        };

        match self.storage.persist_conversion(&conversion).await? {
            PersistOutcome::Inserted { click_marked } => {
                info!(
                    "Conversion {} recorded for ticket {} via {} (affiliate {}, click marked: {})",
                    conversion.id,
                    conversion.ticket_id,
                    link.code,
                    conversion.amounts.affiliate_commission,
                    click_marked
                );
                Ok(ConversionOutcome::Recorded(Box::new(conversion)))
            }
            PersistOutcome::Duplicate(existing) => Ok(ConversionOutcome::Duplicate(existing)),
        }
    }
}
