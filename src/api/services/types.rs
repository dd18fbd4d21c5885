//! API 类型定义

use serde::{Deserialize, Serialize};

use crate::storage::{LinkFilter, LinkStatus, PerformancePeriod};

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GetLinksQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub event_id: Option<String>,
    pub affiliate_id: Option<String>,
    pub agency_id: Option<String>,
    pub status: Option<LinkStatus>,
    #[serde(default)]
    pub include_deleted: bool,
}

impl GetLinksQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn to_filter(&self) -> LinkFilter {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        LinkFilter {
            event_id: non_empty(&self.event_id),
            affiliate_id: non_empty(&self.affiliate_id),
            agency_id: non_empty(&self.agency_id),
            status: self.status,
            include_deleted: self.include_deleted,
            limit: Some(self.page_size()),
            offset: Some((self.page() - 1) * self.page_size()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PerformanceQuery {
    pub period: Option<PerformancePeriod>,
}

/// 转化回调的响应；无论是否记录都返回 200
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversionHookResponse {
    pub recorded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_id: Option<String>,
    #[serde(default)]
    pub duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ============ Health ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthStorageCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub storage: HealthStorageCheck,
    pub response_time_ms: u32,
}
