//! 结算批次管理端点

use actix_web::{Responder, web};
use std::sync::Arc;

use crate::services::{CompleteBatchRequest, FailRequest, PayoutService, RejectRequest};

use super::error_code::Domain;
use super::helpers::api_result;

/// 主办方待审批的批次（pending / scheduled）
pub async fn list_pending(
    path: web::Path<String>,
    payouts: web::Data<Arc<PayoutService>>,
) -> impl Responder {
    api_result(payouts.list_pending(&path).await, Domain::Payouts)
}

pub async fn payee_history(
    path: web::Path<String>,
    payouts: web::Data<Arc<PayoutService>>,
) -> impl Responder {
    api_result(payouts.payee_history(&path).await, Domain::Payouts)
}

pub async fn get_payout(
    path: web::Path<String>,
    payouts: web::Data<Arc<PayoutService>>,
) -> impl Responder {
    api_result(payouts.get(&path).await, Domain::Payouts)
}

pub async fn approve_payout(
    path: web::Path<String>,
    payouts: web::Data<Arc<PayoutService>>,
) -> impl Responder {
    api_result(payouts.approve(&path).await, Domain::Payouts)
}

/// body 可省略
pub async fn reject_payout(
    path: web::Path<String>,
    body: Option<web::Json<RejectRequest>>,
    payouts: web::Data<Arc<PayoutService>>,
) -> impl Responder {
    let reason = body.and_then(|b| b.into_inner().reason);
    api_result(payouts.reject(&path, reason).await, Domain::Payouts)
}

pub async fn complete_payouts(
    body: web::Json<CompleteBatchRequest>,
    payouts: web::Data<Arc<PayoutService>>,
) -> impl Responder {
    api_result(payouts.complete_batch(&body).await, Domain::Payouts)
}

pub async fn fail_payout(
    path: web::Path<String>,
    body: web::Json<FailRequest>,
    payouts: web::Data<Arc<PayoutService>>,
) -> impl Responder {
    api_result(payouts.fail(&path, &body.reason).await, Domain::Payouts)
}
