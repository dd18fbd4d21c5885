//! 领域模型
//!
//! 数据库实体（`migration::entities`）以字符串、分、基点存储；
//! 这里是服务层使用的强类型版本，转换见 `backend::converters`。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

macro_rules! string_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($(#[$vmeta:meta])* $variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
            AsRefStr, Display, EnumString, EnumIter,
        )]
        #[serde(rename_all = "snake_case")]
        #[strum(serialize_all = "snake_case")]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }
    };
}

string_enum! {
    /// 推广链接生命周期
    #[derive(Default)]
    pub enum LinkStatus { #[default] Active, Paused, Expired }
}

string_enum! {
    pub enum PayeeKind { Affiliate, Agency }
}

string_enum! {
    /// 平台费计算方式
    #[derive(Default)]
    pub enum FeeType { #[default] Percentage, Fixed, Hybrid }
}

string_enum! {
    #[derive(Default)]
    pub enum CommissionType { #[default] Percentage, Fixed }
}

string_enum! {
    /// affiliate 百分比佣金的计算基数
    #[derive(Default)]
    pub enum CommissionBase { TicketPrice, #[default] OrganizerRevenue, AgencyRevenue }
}

string_enum! {
    #[derive(Default)]
    pub enum AttributionModel { #[default] LastClick, FirstClick, Linear, TimeDecay }
}

string_enum! {
    /// manual 的活动不会被定时任务自动结算
    #[derive(Default)]
    pub enum PayoutFrequency { Weekly, Biweekly, #[default] Monthly, Manual }
}

string_enum! {
    pub enum ConversionStatus { Pending, Confirmed, Cancelled }
}

string_enum! {
    /// 单条转化上某一方（agency / affiliate）的结算状态
    pub enum LegPayoutStatus { Pending, Scheduled, Paid }
}

string_enum! {
    pub enum PayoutStatus { Pending, Scheduled, Processing, Completed, Failed, Cancelled }
}

string_enum! {
    pub enum PerformancePeriod { Today, Week, Month, Quarter, Year, AllTime }
}

string_enum! {
    pub enum DeviceType { Mobile, Tablet, Desktop }
}

impl PerformancePeriod {
    /// 滚动窗口长度，all_time 没有下界
    pub fn window(&self) -> Option<chrono::Duration> {
        match self {
            PerformancePeriod::Today => Some(chrono::Duration::hours(24)),
            PerformancePeriod::Week => Some(chrono::Duration::days(7)),
            PerformancePeriod::Month => Some(chrono::Duration::days(30)),
            PerformancePeriod::Quarter => Some(chrono::Duration::days(90)),
            PerformancePeriod::Year => Some(chrono::Duration::days(365)),
            PerformancePeriod::AllTime => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralLink {
    pub id: String,
    pub code: String,
    pub short_code: Option<String>,
    pub event_id: String,
    pub affiliate_id: Option<String>,
    pub agency_id: Option<String>,
    pub parent_affiliate_id: Option<String>,
    pub target_url: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub status: LinkStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i64>,
    pub use_count: i64,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ReferralLink {
    /// active、未过期、未删除、未超出使用上限
    pub fn is_trackable(&self, now: DateTime<Utc>) -> bool {
        self.status == LinkStatus::Active
            && self.deleted_at.is_none()
            && self.expires_at.is_none_or(|exp| exp > now)
            && self.max_uses.is_none_or(|max| self.use_count < max)
    }

    pub fn payee(&self) -> Option<(PayeeKind, &str)> {
        match (&self.affiliate_id, &self.agency_id) {
            (Some(id), None) => Some((PayeeKind::Affiliate, id)),
            (None, Some(id)) => Some((PayeeKind::Agency, id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralClick {
    pub id: i64,
    pub link_id: String,
    pub event_id: String,
    pub affiliate_id: Option<String>,
    pub agency_id: Option<String>,
    pub visitor_fingerprint: String,
    pub device_type: DeviceType,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub is_bot: bool,
    pub clicked_at: DateTime<Utc>,
    pub converted: bool,
    pub conversion_id: Option<String>,
}

/// 待写入的点击
#[derive(Debug, Clone)]
pub struct NewClick {
    pub link_id: String,
    pub event_id: String,
    pub affiliate_id: Option<String>,
    pub agency_id: Option<String>,
    pub visitor_fingerprint: String,
    pub device_type: DeviceType,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub is_bot: bool,
    pub clicked_at: DateTime<Utc>,
}

/// 主办方编写的佣金策略（不含归属信息）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionPolicy {
    pub platform_fee_type: FeeType,
    pub platform_fee_percentage: Decimal,
    pub platform_fee_fixed: Decimal,
    pub platform_fee_cap: Option<Decimal>,
    pub agency_commission_type: CommissionType,
    pub agency_commission_percentage: Decimal,
    pub agency_commission_fixed: Decimal,
    pub affiliate_commission_enabled: bool,
    pub affiliate_commission_type: CommissionType,
    pub affiliate_commission_percentage: Decimal,
    pub affiliate_commission_fixed: Decimal,
    pub affiliate_commission_base: CommissionBase,
    pub multi_tier_enabled: bool,
    pub tier_2_rate: Decimal,
    /// 仅保存，暂不参与计算
    pub tier_3_rate: Decimal,
    pub attribution_model: AttributionModel,
    pub attribution_window_days: i32,
    pub payout_frequency: PayoutFrequency,
    pub payout_delay_days: i32,
    pub minimum_payout_amount: Decimal,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            platform_fee_type: FeeType::Percentage,
            platform_fee_percentage: Decimal::ZERO,
            platform_fee_fixed: Decimal::ZERO,
            platform_fee_cap: None,
            agency_commission_type: CommissionType::Percentage,
            agency_commission_percentage: Decimal::ZERO,
            agency_commission_fixed: Decimal::ZERO,
            affiliate_commission_enabled: true,
            affiliate_commission_type: CommissionType::Percentage,
            affiliate_commission_percentage: Decimal::ZERO,
            affiliate_commission_fixed: Decimal::ZERO,
            affiliate_commission_base: CommissionBase::OrganizerRevenue,
            multi_tier_enabled: false,
            tier_2_rate: Decimal::ZERO,
            tier_3_rate: Decimal::ZERO,
            attribution_model: AttributionModel::LastClick,
            attribution_window_days: 30,
            payout_frequency: PayoutFrequency::Monthly,
            payout_delay_days: 7,
            minimum_payout_amount: Decimal::ZERO,
        }
    }
}

/// 每个活动一份的佣金配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionConfig {
    pub event_id: String,
    pub organizer_id: String,
    #[serde(flatten)]
    pub policy: CommissionPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 一次计算的完整拆分结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CommissionBreakdown {
    pub ticket_price: Decimal,
    pub platform_fee: Decimal,
    pub organizer_revenue: Decimal,
    pub agency_commission: Decimal,
    pub affiliate_commission: Decimal,
    pub tier_2_commission: Decimal,
    pub organizer_net: Decimal,
}

/// 获得归因的点击及其权重
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedClick {
    pub click_id: i64,
    pub clicked_at: DateTime<Utc>,
    pub weight: f64,
}

/// 外部售票流程传入的票据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub event_id: String,
    pub price: Decimal,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub purchased_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralConversion {
    pub id: String,
    pub ticket_id: String,
    pub event_id: String,
    pub link_id: String,
    pub click_id: Option<i64>,
    pub affiliate_id: Option<String>,
    pub agency_id: Option<String>,
    pub tier_2_affiliate_id: Option<String>,
    #[serde(flatten)]
    pub amounts: CommissionBreakdown,
    pub attribution_model: AttributionModel,
    pub attributed_clicks: Vec<AttributedClick>,
    pub config_snapshot: serde_json::Value,
    pub calculation_breakdown: String,
    pub status: ConversionStatus,
    pub agency_payout_status: LegPayoutStatus,
    pub agency_payout_id: Option<String>,
    pub affiliate_payout_status: LegPayoutStatus,
    pub affiliate_payout_id: Option<String>,
    pub converted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliatePayout {
    pub id: String,
    pub payee_kind: PayeeKind,
    pub payee_id: String,
    pub event_id: String,
    pub organizer_id: String,
    pub status: PayoutStatus,
    pub conversion_ids: Vec<String>,
    pub conversion_count: i64,
    pub total_revenue: Decimal,
    pub gross_amount: Decimal,
    pub net_amount: Decimal,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub transaction_reference: Option<String>,
}

/// 某个 affiliate 在某个时间段的汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub affiliate_id: String,
    pub period: PerformancePeriod,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: DateTime<Utc>,
    pub total_clicks: i64,
    pub unique_visitors: i64,
    pub conversions: i64,
    pub revenue: Decimal,
    pub commission: Decimal,
    pub conversion_rate: f64,
    pub refreshed_at: DateTime<Utc>,
}
