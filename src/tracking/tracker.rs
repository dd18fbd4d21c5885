//! 点击追踪
//!
//! 根据请求中的推广码记录点击并签发 tracking cookie。只要链接可追踪，
//! cookie 总会签发（或刷新），与是否写入点击记录无关。

use std::num::NonZeroU32;
use std::sync::Arc;

use actix_web::HttpRequest;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header::{HOST, REFERER, USER_AGENT};
use chrono::{DateTime, Duration, Utc};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use strum::{AsRefStr, Display};
use tracing::{debug, trace, warn};

use super::classifier::{classify_user_agent, is_suspicious_referrer, visitor_fingerprint};
use super::codec::{CookieCodec, TrackingPayload};
use crate::config::TrackingConfig;
use crate::errors::Result;
use crate::storage::{NewClick, SeaOrmStorage};
use crate::utils::ClientIpResolver;

/// 从请求中提取的追踪上下文
#[derive(Debug, Clone, Default)]
pub struct ClickContext {
    pub ref_code: String,
    pub client_ip: Option<String>,
    pub user_agent: String,
    pub referrer: Option<String>,
    pub host: Option<String>,
    pub utm_source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    UnknownLink,
    InactiveLink,
}

/// 点击记录的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRecord {
    Recorded(i64),
    /// 去重窗口内已有点击
    Deduplicated(i64),
    Bot,
    SuspiciousReferrer,
    RateLimited,
    /// 写入失败，cookie 仍然签发
    Failed,
}

impl ClickRecord {
    pub fn click_id(&self) -> Option<i64> {
        match self {
            ClickRecord::Recorded(id) | ClickRecord::Deduplicated(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum TrackingOutcome {
    Applied {
        cookie: Cookie<'static>,
        click: ClickRecord,
    },
    Skipped(SkipReason),
}

pub struct ClickTracker {
    storage: Arc<SeaOrmStorage>,
    codec: CookieCodec,
    ip_resolver: ClientIpResolver,
    limiter: DefaultKeyedRateLimiter<String>,
    cookie_name: String,
    cookie_domain: Option<String>,
    query_param: String,
    secure: bool,
    attribution_days: i64,
    dedupe_window: Duration,
}

impl ClickTracker {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        codec: CookieCodec,
        config: &TrackingConfig,
        production: bool,
    ) -> Self {
        let per_minute = if production {
            config.rate_limit_per_minute
        } else {
            config.dev_rate_limit_per_minute
        };
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));

        Self {
            storage,
            codec,
            ip_resolver: ClientIpResolver::new(&config.trusted_proxies),
            limiter: RateLimiter::keyed(quota),
            cookie_name: config.cookie_name.clone(),
            cookie_domain: config.cookie_domain.clone().filter(|d| !d.is_empty()),
            query_param: config.query_param.clone(),
            secure: production,
            attribution_days: config.attribution_days.max(1),
            dedupe_window: Duration::minutes(config.dedupe_window_minutes.max(0)),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn codec(&self) -> &CookieCodec {
        &self.codec
    }

    /// 清理已恢复满额度的限流 key，返回剩余 key 数
    pub fn prune_rate_limits(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    /// 请求不带推广码时返回 None
    pub fn context_from_request(&self, req: &HttpRequest) -> Option<ClickContext> {
        let mut ref_code = None;
        let mut utm_source = None;
        for (key, value) in url::form_urlencoded::parse(req.query_string().as_bytes()) {
            if key == self.query_param.as_str() {
                ref_code = Some(value.trim().to_string());
            } else if key == "utm_source" {
                utm_source = Some(value.into_owned());
            }
        }
        let ref_code = ref_code.filter(|c| !c.is_empty())?;

        let header = |name| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Some(ClickContext {
            ref_code,
            client_ip: self.ip_resolver.client_ip(req),
            user_agent: header(USER_AGENT).unwrap_or_default(),
            referrer: header(REFERER),
            host: header(HOST),
            utm_source,
        })
    }

    pub async fn track(&self, ctx: &ClickContext) -> Result<TrackingOutcome> {
        self.track_at(ctx, Utc::now()).await
    }

    pub async fn track_at(&self, ctx: &ClickContext, now: DateTime<Utc>) -> Result<TrackingOutcome> {
        let Some(link) = self.storage.get_link_by_code(&ctx.ref_code).await? else {
            debug!("Referral code {} not found", ctx.ref_code);
            return Ok(TrackingOutcome::Skipped(SkipReason::UnknownLink));
        };
        if !link.is_trackable(now) || link.payee().is_none() {
            debug!("Referral link {} is not trackable", link.id);
            return Ok(TrackingOutcome::Skipped(SkipReason::InactiveLink));
        }

        let client = classify_user_agent(&ctx.user_agent);
        let fingerprint = visitor_fingerprint(
            ctx.client_ip.as_deref().unwrap_or_default(),
            &ctx.user_agent,
        );

        let click = if client.is_bot {
            trace!("Bot click on {} not recorded", link.code);
            ClickRecord::Bot
        } else if is_suspicious_referrer(ctx.referrer.as_deref(), ctx.host.as_deref()) {
            debug!("Suspicious referrer on {}: {:?}", link.code, ctx.referrer);
            ClickRecord::SuspiciousReferrer
        } else if self
            .limiter
            .check_key(&ctx.client_ip.clone().unwrap_or_else(|| fingerprint.clone()))
            .is_err()
        {
            debug!("Click rate limit hit for {:?}", ctx.client_ip);
            ClickRecord::RateLimited
        } else {
            let since = now - self.dedupe_window;
            match self
                .storage
                .find_recent_click(&link.id, &fingerprint, since)
                .await
            {
                Ok(Some(existing)) => ClickRecord::Deduplicated(existing.id),
                Ok(None) => {
                    let new_click = NewClick {
                        link_id: link.id.clone(),
                        event_id: link.event_id.clone(),
                        affiliate_id: link.affiliate_id.clone(),
                        agency_id: link.agency_id.clone(),
                        visitor_fingerprint: fingerprint,
                        device_type: client.device_type,
                        browser: client.browser,
                        os: client.os,
                        referrer: ctx.referrer.clone(),
                        utm_source: ctx.utm_source.clone().or_else(|| link.utm_source.clone()),
                        is_bot: false,
                        clicked_at: now,
                    };
                    match self.record(&link.id, &new_click).await {
                        Ok(id) => ClickRecord::Recorded(id),
                        Err(e) => {
                            warn!("Failed to record click on {}: {}", link.code, e);
                            ClickRecord::Failed
                        }
                    }
                }
                Err(e) => {
                    warn!("Dedupe lookup failed for {}: {}", link.code, e);
                    ClickRecord::Failed
                }
            }
        };

        let payload = TrackingPayload {
            ref_code: link.code.clone(),
            affiliate_id: link.affiliate_id.clone(),
            agency_id: link.agency_id.clone(),
            link_id: link.id.clone(),
            click_id: click.click_id(),
            clicked_at: now,
            expires_at: now + Duration::days(self.attribution_days),
        };
        let cookie = self.build_cookie(self.codec.encode(&payload)?);

        Ok(TrackingOutcome::Applied { cookie, click })
    }

    async fn record(&self, link_id: &str, click: &NewClick) -> Result<i64> {
        let id = self.storage.insert_click(click).await?;
        self.storage.increment_click_count(link_id).await?;
        Ok(id)
    }

    pub fn build_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.cookie_name.clone(), value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_max_age(actix_web::cookie::time::Duration::days(
            self.attribution_days,
        ));
        if let Some(ref domain) = self.cookie_domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }

    /// 解码请求携带的 tracking cookie，过期或无效返回 None
    pub fn read_cookie(&self, value: &str, now: DateTime<Utc>) -> Option<TrackingPayload> {
        self.codec
            .decode(value)
            .filter(|payload| !payload.is_expired(now))
    }
}
