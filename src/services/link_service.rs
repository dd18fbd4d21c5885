//! Referral link management service
//!
//! 创建、查询、更新、软删除、生成短码。所有写操作都会让 code 缓存失效。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{AffiliateError, Result};
use crate::storage::{LinkFilter, LinkStatus, ReferralLink, SeaOrmStorage};
use crate::utils::generate_random_code;

/// 自动生成的推广码长度
pub const REFERRAL_CODE_LENGTH: usize = 8;
/// 短码长度
pub const SHORT_CODE_LENGTH: usize = 6;
/// 生成随机码时的最大重试次数
pub const MAX_CODE_ATTEMPTS: usize = 5;

// ============ Request DTOs ============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLinkRequest {
    /// 为空时自动生成
    #[serde(default)]
    pub code: Option<String>,
    pub event_id: String,
    #[serde(default)]
    pub affiliate_id: Option<String>,
    #[serde(default)]
    pub agency_id: Option<String>,
    #[serde(default)]
    pub parent_affiliate_id: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_uses: Option<i64>,
}

/// None 表示保持原值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLinkRequest {
    #[serde(default)]
    pub status: Option<LinkStatus>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_uses: Option<i64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// 推广码只允许字母、数字、`_`、`-`，长度 3..=32
pub fn is_valid_referral_code(code: &str) -> bool {
    (3..=32).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn validate_target_url(target: &str) -> Result<()> {
    let url = url::Url::parse(target)
        .map_err(|e| AffiliateError::validation(format!("invalid target_url '{}': {}", target, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AffiliateError::validation(format!(
            "target_url scheme '{}' is not allowed",
            scheme
        ))),
    }
}

fn validate_limits(
    expires_at: Option<DateTime<Utc>>,
    max_uses: Option<i64>,
    now: DateTime<Utc>,
) -> Result<()> {
    if let Some(exp) = expires_at
        && exp <= now
    {
        return Err(AffiliateError::validation("expires_at must be in the future"));
    }
    if let Some(max) = max_uses
        && max <= 0
    {
        return Err(AffiliateError::validation("max_uses must be positive"));
    }
    Ok(())
}

// ============ LinkService Implementation ============

pub struct LinkService {
    storage: Arc<SeaOrmStorage>,
}

impl LinkService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    async fn generate_unique_code(&self, length: usize) -> Result<String> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_random_code(length);
            if !self.storage.code_exists(&code).await? {
                return Ok(code);
            }
            debug!("Generated code {} collided (attempt {})", code, attempt);
        }
        Err(AffiliateError::conflict(format!(
            "failed to generate a unique code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    pub async fn create_link(&self, req: CreateLinkRequest) -> Result<ReferralLink> {
        let now = Utc::now();
        let event_id = req.event_id.trim().to_string();
        if event_id.is_empty() {
            return Err(AffiliateError::validation("event_id is required"));
        }

        let affiliate_id = non_empty(req.affiliate_id);
        let agency_id = non_empty(req.agency_id);
        if affiliate_id.is_some() == agency_id.is_some() {
            return Err(AffiliateError::validation(
                "a link must belong to exactly one of affiliate_id or agency_id",
            ));
        }
        let parent_affiliate_id = non_empty(req.parent_affiliate_id);
        if parent_affiliate_id.is_some() && affiliate_id.is_none() {
            return Err(AffiliateError::validation(
                "parent_affiliate_id requires an affiliate link",
            ));
        }
        if parent_affiliate_id.is_some() && parent_affiliate_id == affiliate_id {
            return Err(AffiliateError::validation(
                "parent_affiliate_id must differ from affiliate_id",
            ));
        }

        let target_url = non_empty(req.target_url);
        if let Some(ref target) = target_url {
            validate_target_url(target)?;
        }
        validate_limits(req.expires_at, req.max_uses, now)?;

        if self.storage.get_commission_config(&event_id).await?.is_none() {
            return Err(AffiliateError::validation(format!(
                "event '{}' has no commission config",
                event_id
            )));
        }

        let code = match non_empty(req.code) {
            Some(code) => {
                if !is_valid_referral_code(&code) {
                    return Err(AffiliateError::validation(format!(
                        "invalid referral code '{}'",
                        code
                    )));
                }
                if self.storage.code_exists(&code).await? {
                    return Err(AffiliateError::conflict(format!(
                        "referral code '{}' already exists",
                        code
                    )));
                }
                code
            }
            None => self.generate_unique_code(REFERRAL_CODE_LENGTH).await?,
        };

        let link = ReferralLink {
            id: Uuid::new_v4().to_string(),
            code,
            short_code: None,
            event_id,
            affiliate_id,
            agency_id,
            parent_affiliate_id,
            target_url,
            utm_source: non_empty(req.utm_source),
            utm_medium: non_empty(req.utm_medium),
            utm_campaign: non_empty(req.utm_campaign),
            status: LinkStatus::Active,
            expires_at: req.expires_at,
            max_uses: req.max_uses,
            use_count: 0,
            click_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.storage.insert_link(&link).await?;

        info!(
            "LinkService: created link {} ({}) for event {}",
            link.code, link.id, link.event_id
        );
        Ok(link)
    }

    pub async fn get_link(&self, id: &str) -> Result<ReferralLink> {
        self.storage
            .get_link(id)
            .await?
            .ok_or_else(|| AffiliateError::not_found(format!("link '{}' not found", id)))
    }

    pub async fn list_links(&self, filter: &LinkFilter) -> Result<Vec<ReferralLink>> {
        self.storage.list_links(filter).await
    }

    pub async fn update_link(&self, id: &str, req: UpdateLinkRequest) -> Result<ReferralLink> {
        let now = Utc::now();
        let mut link = self.get_link(id).await?;
        if link.deleted_at.is_some() {
            return Err(AffiliateError::not_found(format!("link '{}' was deleted", id)));
        }

        if let Some(target) = non_empty(req.target_url) {
            validate_target_url(&target)?;
            link.target_url = Some(target);
        }
        validate_limits(req.expires_at, req.max_uses, now)?;
        if let Some(status) = req.status {
            link.status = status;
        }
        if let Some(v) = non_empty(req.utm_source) {
            link.utm_source = Some(v);
        }
        if let Some(v) = non_empty(req.utm_medium) {
            link.utm_medium = Some(v);
        }
        if let Some(v) = non_empty(req.utm_campaign) {
            link.utm_campaign = Some(v);
        }
        if req.expires_at.is_some() {
            link.expires_at = req.expires_at;
        }
        if req.max_uses.is_some() {
            link.max_uses = req.max_uses;
        }
        link.updated_at = now;

        self.storage.update_link(&link).await?;
        info!("LinkService: updated link {}", link.id);
        Ok(link)
    }

    /// status → paused 并记录删除时间，不做物理删除
    pub async fn delete_link(&self, id: &str) -> Result<()> {
        if self.storage.soft_delete_link(id, Utc::now()).await? {
            info!("LinkService: soft-deleted link {}", id);
            Ok(())
        } else {
            Err(AffiliateError::not_found(format!("link '{}' not found", id)))
        }
    }

    /// 生成短码；已有短码时直接返回
    pub async fn shorten(&self, id: &str) -> Result<ReferralLink> {
        let link = self.get_link(id).await?;
        if link.deleted_at.is_some() {
            return Err(AffiliateError::not_found(format!("link '{}' was deleted", id)));
        }
        if link.short_code.is_some() {
            return Ok(link);
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let short_code = generate_random_code(SHORT_CODE_LENGTH);
            if self.storage.code_exists(&short_code).await? {
                debug!("Short code {} collided (attempt {})", short_code, attempt);
                continue;
            }
            match self.storage.set_short_code(id, &short_code).await {
                Ok(true) => {
                    info!("LinkService: link {} shortened to {}", id, short_code);
                    return self.get_link(id).await;
                }
                // 并发请求已写入短码
                Ok(false) => return self.get_link(id).await,
                Err(AffiliateError::Conflict(_)) => {
                    debug!("Short code {} taken concurrently (attempt {})", short_code, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        warn!("LinkService: could not allocate a short code for {}", id);
        Err(AffiliateError::conflict(format!(
            "failed to generate a unique short code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    /// 短链跳转使用，只返回可追踪的链接
    pub async fn resolve_short_code(&self, short_code: &str) -> Result<Option<ReferralLink>> {
        let link = self.storage.get_link_by_short_code(short_code).await?;
        Ok(link.filter(|l| l.is_trackable(Utc::now())))
    }
}
