use actix_web::{Responder, web};
use std::sync::Arc;

use crate::services::PerformanceService;

use super::error_code::Domain;
use super::helpers::api_result;
use super::types::PerformanceQuery;

/// affiliate 业绩缓存；不传 period 时返回全部周期
pub async fn get_performance(
    path: web::Path<String>,
    query: web::Query<PerformanceQuery>,
    performance: web::Data<Arc<PerformanceService>>,
) -> impl Responder {
    api_result(
        performance.get(&path, query.period).await,
        Domain::General,
    )
}
