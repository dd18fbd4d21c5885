//! 活动佣金配置端点

use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::info;

use crate::services::{CommissionConfigRequest, CommissionConfigService, PreviewRequest};

use super::error_code::Domain;
use super::helpers::{api_result, created_response, error_from_affiliate};

pub async fn create_config(
    path: web::Path<String>,
    body: web::Json<CommissionConfigRequest>,
    configs: web::Data<Arc<CommissionConfigService>>,
) -> HttpResponse {
    match configs.create(&path, body.into_inner()).await {
        Ok(config) => {
            info!("API: commission config created for event {}", config.event_id);
            created_response(config)
        }
        Err(e) => error_from_affiliate(&e, Domain::CommissionConfig),
    }
}

pub async fn get_config(
    path: web::Path<String>,
    configs: web::Data<Arc<CommissionConfigService>>,
) -> impl Responder {
    api_result(configs.get(&path).await, Domain::CommissionConfig)
}

pub async fn update_config(
    path: web::Path<String>,
    body: web::Json<CommissionConfigRequest>,
    configs: web::Data<Arc<CommissionConfigService>>,
) -> impl Responder {
    api_result(
        configs.update(&path, body.into_inner()).await,
        Domain::CommissionConfig,
    )
}

/// 按假设票价试算，不落库
pub async fn preview_config(
    path: web::Path<String>,
    body: web::Json<PreviewRequest>,
    configs: web::Data<Arc<CommissionConfigService>>,
) -> impl Responder {
    api_result(
        configs.preview(&path, &body).await,
        Domain::CommissionConfig,
    )
}
