//! Service layer for business logic
//!
//! 纯计算（归因、佣金）与编排服务，HTTP handler 和 CLI 共用。

pub mod attribution;
pub mod commission;
mod commission_config_service;
mod conversion_recorder;
mod link_service;
mod payout_service;
mod performance_service;

pub use commission_config_service::*;
pub use conversion_recorder::*;
pub use link_service::*;
pub use payout_service::*;
pub use performance_service::*;
