pub mod affiliate_payout;
pub mod affiliate_performance_cache;
pub mod event_commission_config;
pub mod referral_click;
pub mod referral_conversion;
pub mod referral_link;

pub use affiliate_payout::Entity as AffiliatePayoutEntity;
pub use affiliate_performance_cache::Entity as AffiliatePerformanceCacheEntity;
pub use event_commission_config::Entity as EventCommissionConfigEntity;
pub use referral_click::Entity as ReferralClickEntity;
pub use referral_conversion::Entity as ReferralConversionEntity;
pub use referral_link::Entity as ReferralLinkEntity;
