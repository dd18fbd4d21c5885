//! 读取 affiliate 业绩缓存

use std::sync::Arc;

use crate::errors::Result;
use crate::storage::{PerformancePeriod, PerformanceSnapshot, SeaOrmStorage};

pub struct PerformanceService {
    storage: Arc<SeaOrmStorage>,
}

impl PerformanceService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// period 为空时返回该 affiliate 所有已缓存的周期
    pub async fn get(
        &self,
        affiliate_id: &str,
        period: Option<PerformancePeriod>,
    ) -> Result<Vec<PerformanceSnapshot>> {
        self.storage
            .get_performance_snapshots(affiliate_id, period)
            .await
    }
}
