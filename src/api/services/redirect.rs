//! 短链跳转
//!
//! `/r/{short_code}` → 307 到链接的目标地址，并在查询串中附加推广码，
//! 落地请求由点击追踪中间件签发 cookie。

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use std::sync::Arc;
use tracing::{debug, error, trace};

use crate::services::LinkService;
use crate::storage::ReferralLink;

/// 短码只包含 base62 字符
fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= 32 && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// 目标地址加上 `{query_param}={code}`，已存在同名参数时替换
pub fn landing_url(link: &ReferralLink, query_param: &str) -> Option<String> {
    let target = link.target_url.as_deref()?;
    let mut url = url::Url::parse(target).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != query_param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(kept);
        pairs.append_pair(query_param, &link.code);
    }
    Some(url.to_string())
}

/// 跳转时使用的推广码参数名
#[derive(Clone, Debug)]
pub struct RedirectParam(pub String);

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        path: web::Path<String>,
        links: web::Data<Arc<LinkService>>,
        param: web::Data<RedirectParam>,
    ) -> HttpResponse {
        let short_code = path.into_inner();
        if !is_valid_short_code(&short_code) {
            trace!("Invalid short code rejected: {}", short_code);
            return Self::not_found_response();
        }

        match links.resolve_short_code(&short_code).await {
            Ok(Some(link)) => match landing_url(&link, &param.0) {
                Some(location) => {
                    debug!("Redirecting {} → {}", short_code, location);
                    HttpResponse::TemporaryRedirect()
                        .insert_header(("Location", location))
                        .insert_header(("Cache-Control", "no-cache, no-store, must-revalidate"))
                        .finish()
                }
                None => {
                    debug!("Link {} has no usable target url", link.id);
                    Self::not_found_response()
                }
            },
            Ok(None) => {
                debug!("Short code not found or inactive: {}", short_code);
                Self::not_found_response()
            }
            Err(e) => {
                error!("Database error during redirect lookup: {}", e);
                HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
                    .insert_header(("Content-Type", "text/html; charset=utf-8"))
                    .body("Internal Server Error")
            }
        }
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Not Found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn link(target: Option<&str>) -> ReferralLink {
        let now = Utc::now();
        ReferralLink {
            id: "l1".into(),
            code: "SUMMER24".into(),
            short_code: Some("aB3xYz".into()),
            event_id: "evt".into(),
            affiliate_id: Some("aff".into()),
            agency_id: None,
            parent_affiliate_id: None,
            target_url: target.map(str::to_string),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            status: Default::default(),
            expires_at: None,
            max_uses: None,
            use_count: 0,
            click_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_landing_url_appends_ref() {
        let url = landing_url(&link(Some("https://tickets.example.com/e/1?lang=en")), "ref").unwrap();
        assert_eq!(url, "https://tickets.example.com/e/1?lang=en&ref=SUMMER24");
    }

    #[test]
    fn test_landing_url_replaces_existing_ref() {
        let url = landing_url(&link(Some("https://x.example/?ref=OLD")), "ref").unwrap();
        assert_eq!(url, "https://x.example/?ref=SUMMER24");
        assert!(landing_url(&link(None), "ref").is_none());
    }

    #[test]
    fn test_short_code_validation() {
        assert!(is_valid_short_code("aB3xYz"));
        assert!(!is_valid_short_code(""));
        assert!(!is_valid_short_code("../etc"));
    }
}
