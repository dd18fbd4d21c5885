use std::sync::Arc;

use crate::config::StaticConfig;
use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::{ClaimOutcome, LEG_UPDATE_CHUNK, LinkFilter, SeaOrmStorage};
pub use models::*;

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StaticConfig) -> Result<Arc<SeaOrmStorage>> {
        let storage = SeaOrmStorage::new(
            &config.database,
            std::time::Duration::from_secs(config.tracking.link_cache_ttl_secs),
        )
        .await?;
        Ok(Arc::new(storage))
    }
}
