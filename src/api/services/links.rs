//! 推广链接 CRUD 与短码生成

use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::{info, trace};

use crate::services::{CreateLinkRequest, LinkService, UpdateLinkRequest};

use super::error_code::Domain;
use super::helpers::{api_result, created_response, error_from_affiliate};
use super::types::{GetLinksQuery, PaginatedResponse};

/// 获取链接列表（支持分页和过滤）
pub async fn list_links(
    query: web::Query<GetLinksQuery>,
    links: web::Data<Arc<LinkService>>,
) -> impl Responder {
    trace!("API: list links with filters: {:?}", query);
    let (page, page_size) = (query.page(), query.page_size());
    let result = links
        .list_links(&query.to_filter())
        .await
        .map(|items| PaginatedResponse {
            items,
            page,
            page_size,
        });
    api_result(result, Domain::Links)
}

pub async fn create_link(
    body: web::Json<CreateLinkRequest>,
    links: web::Data<Arc<LinkService>>,
) -> HttpResponse {
    match links.create_link(body.into_inner()).await {
        Ok(link) => {
            info!("API: created link {} ({})", link.id, link.code);
            created_response(link)
        }
        Err(e) => error_from_affiliate(&e, Domain::Links),
    }
}

pub async fn get_link(
    path: web::Path<String>,
    links: web::Data<Arc<LinkService>>,
) -> impl Responder {
    api_result(links.get_link(&path).await, Domain::Links)
}

pub async fn update_link(
    path: web::Path<String>,
    body: web::Json<UpdateLinkRequest>,
    links: web::Data<Arc<LinkService>>,
) -> impl Responder {
    api_result(
        links.update_link(&path, body.into_inner()).await,
        Domain::Links,
    )
}

/// 软删除：状态改为 paused 并记录 deleted_at
pub async fn delete_link(
    path: web::Path<String>,
    links: web::Data<Arc<LinkService>>,
) -> impl Responder {
    let id = path.into_inner();
    let result = links
        .delete_link(&id)
        .await
        .map(|()| serde_json::json!({ "id": id, "deleted": true }));
    api_result(result, Domain::Links)
}

pub async fn shorten_link(
    path: web::Path<String>,
    links: web::Data<Arc<LinkService>>,
) -> impl Responder {
    api_result(links.shorten(&path).await, Domain::Links)
}
