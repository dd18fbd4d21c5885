//! 实体 Model 与领域模型之间的转换
//!
//! 金额落库为分，比例落库为基点，枚举落库为 snake_case 字符串。

use std::str::FromStr;

use sea_orm::ActiveValue::{NotSet, Set};

use crate::errors::{AffiliateError, Result};
use crate::storage::models::*;
use crate::utils::money::{bps_to_percent, from_cents, percent_to_bps, to_cents};
use migration::entities::{
    affiliate_payout, affiliate_performance_cache, event_commission_config, referral_click,
    referral_conversion, referral_link,
};

fn parse_enum<T: FromStr>(value: &str, field: &str) -> Result<T> {
    T::from_str(value).map_err(|_| {
        AffiliateError::serialization(format!("无法识别的 {} 值: {}", field, value))
    })
}

pub fn model_to_link(model: referral_link::Model) -> Result<ReferralLink> {
    Ok(ReferralLink {
        status: parse_enum(&model.status, "link status")?,
        id: model.id,
        code: model.code,
        short_code: model.short_code,
        event_id: model.event_id,
        affiliate_id: model.affiliate_id,
        agency_id: model.agency_id,
        parent_affiliate_id: model.parent_affiliate_id,
        target_url: model.target_url,
        utm_source: model.utm_source,
        utm_medium: model.utm_medium,
        utm_campaign: model.utm_campaign,
        expires_at: model.expires_at,
        max_uses: model.max_uses,
        use_count: model.use_count,
        click_count: model.click_count,
        created_at: model.created_at,
        updated_at: model.updated_at,
        deleted_at: model.deleted_at,
    })
}

/// 计数字段（click_count / use_count）只在插入时写入，之后由原子自增维护
pub fn link_to_active_model(link: &ReferralLink, is_new: bool) -> referral_link::ActiveModel {
    referral_link::ActiveModel {
        id: Set(link.id.clone()),
        code: Set(link.code.clone()),
        short_code: Set(link.short_code.clone()),
        event_id: Set(link.event_id.clone()),
        affiliate_id: Set(link.affiliate_id.clone()),
        agency_id: Set(link.agency_id.clone()),
        parent_affiliate_id: Set(link.parent_affiliate_id.clone()),
        target_url: Set(link.target_url.clone()),
        utm_source: Set(link.utm_source.clone()),
        utm_medium: Set(link.utm_medium.clone()),
        utm_campaign: Set(link.utm_campaign.clone()),
        status: Set(link.status.to_string()),
        expires_at: Set(link.expires_at),
        max_uses: Set(link.max_uses),
        use_count: if is_new { Set(link.use_count) } else { NotSet },
        click_count: if is_new { Set(link.click_count) } else { NotSet },
        created_at: if is_new { Set(link.created_at) } else { NotSet },
        updated_at: Set(link.updated_at),
        deleted_at: Set(link.deleted_at),
    }
}

pub fn model_to_click(model: referral_click::Model) -> Result<ReferralClick> {
    Ok(ReferralClick {
        device_type: parse_enum(&model.device_type, "device type")?,
        id: model.id,
        link_id: model.link_id,
        event_id: model.event_id,
        affiliate_id: model.affiliate_id,
        agency_id: model.agency_id,
        visitor_fingerprint: model.visitor_fingerprint,
        browser: model.browser,
        os: model.os,
        referrer: model.referrer,
        utm_source: model.utm_source,
        is_bot: model.is_bot,
        clicked_at: model.clicked_at,
        converted: model.converted,
        conversion_id: model.conversion_id,
    })
}

pub fn new_click_to_active_model(click: &NewClick) -> referral_click::ActiveModel {
    referral_click::ActiveModel {
        id: NotSet,
        link_id: Set(click.link_id.clone()),
        event_id: Set(click.event_id.clone()),
        affiliate_id: Set(click.affiliate_id.clone()),
        agency_id: Set(click.agency_id.clone()),
        visitor_fingerprint: Set(click.visitor_fingerprint.clone()),
        device_type: Set(click.device_type.to_string()),
        browser: Set(click.browser.clone()),
        os: Set(click.os.clone()),
        referrer: Set(click.referrer.clone()),
        utm_source: Set(click.utm_source.clone()),
        is_bot: Set(click.is_bot),
        clicked_at: Set(click.clicked_at),
        converted: Set(false),
        conversion_id: Set(None),
    }
}

pub fn model_to_config(model: event_commission_config::Model) -> Result<CommissionConfig> {
    let policy = CommissionPolicy {
        platform_fee_type: parse_enum(&model.platform_fee_type, "platform fee type")?,
        platform_fee_percentage: bps_to_percent(model.platform_fee_bps),
        platform_fee_fixed: from_cents(model.platform_fee_fixed_cents),
        platform_fee_cap: model.platform_fee_cap_cents.map(from_cents),
        agency_commission_type: parse_enum(&model.agency_commission_type, "agency type")?,
        agency_commission_percentage: bps_to_percent(model.agency_commission_bps),
        agency_commission_fixed: from_cents(model.agency_commission_fixed_cents),
        affiliate_commission_enabled: model.affiliate_commission_enabled,
        affiliate_commission_type: parse_enum(
            &model.affiliate_commission_type,
            "affiliate type",
        )?,
        affiliate_commission_percentage: bps_to_percent(model.affiliate_commission_bps),
        affiliate_commission_fixed: from_cents(model.affiliate_commission_fixed_cents),
        affiliate_commission_base: parse_enum(
            &model.affiliate_commission_base,
            "commission base",
        )?,
        multi_tier_enabled: model.multi_tier_enabled,
        tier_2_rate: bps_to_percent(model.tier_2_bps),
        tier_3_rate: bps_to_percent(model.tier_3_bps),
        attribution_model: parse_enum(&model.attribution_model, "attribution model")?,
        attribution_window_days: model.attribution_window_days,
        payout_frequency: parse_enum(&model.payout_frequency, "payout frequency")?,
        payout_delay_days: model.payout_delay_days,
        minimum_payout_amount: from_cents(model.minimum_payout_cents),
    };

    Ok(CommissionConfig {
        event_id: model.event_id,
        organizer_id: model.organizer_id,
        policy,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub fn config_to_active_model(
    config: &CommissionConfig,
    is_new: bool,
) -> event_commission_config::ActiveModel {
    let p = &config.policy;
    event_commission_config::ActiveModel {
        event_id: Set(config.event_id.clone()),
        organizer_id: Set(config.organizer_id.clone()),
        platform_fee_type: Set(p.platform_fee_type.to_string()),
        platform_fee_bps: Set(percent_to_bps(p.platform_fee_percentage)),
        platform_fee_fixed_cents: Set(to_cents(p.platform_fee_fixed)),
        platform_fee_cap_cents: Set(p.platform_fee_cap.map(to_cents)),
        agency_commission_type: Set(p.agency_commission_type.to_string()),
        agency_commission_bps: Set(percent_to_bps(p.agency_commission_percentage)),
        agency_commission_fixed_cents: Set(to_cents(p.agency_commission_fixed)),
        affiliate_commission_enabled: Set(p.affiliate_commission_enabled),
        affiliate_commission_type: Set(p.affiliate_commission_type.to_string()),
        affiliate_commission_bps: Set(percent_to_bps(p.affiliate_commission_percentage)),
        affiliate_commission_fixed_cents: Set(to_cents(p.affiliate_commission_fixed)),
        affiliate_commission_base: Set(p.affiliate_commission_base.to_string()),
        multi_tier_enabled: Set(p.multi_tier_enabled),
        tier_2_bps: Set(percent_to_bps(p.tier_2_rate)),
        tier_3_bps: Set(percent_to_bps(p.tier_3_rate)),
        attribution_model: Set(p.attribution_model.to_string()),
        attribution_window_days: Set(p.attribution_window_days),
        payout_frequency: Set(p.payout_frequency.to_string()),
        payout_delay_days: Set(p.payout_delay_days),
        minimum_payout_cents: Set(to_cents(p.minimum_payout_amount)),
        created_at: if is_new { Set(config.created_at) } else { NotSet },
        updated_at: Set(config.updated_at),
    }
}

pub fn model_to_conversion(model: referral_conversion::Model) -> Result<ReferralConversion> {
    Ok(ReferralConversion {
        amounts: CommissionBreakdown {
            ticket_price: from_cents(model.ticket_price_cents),
            platform_fee: from_cents(model.platform_fee_cents),
            organizer_revenue: from_cents(model.organizer_revenue_cents),
            agency_commission: from_cents(model.agency_commission_cents),
            affiliate_commission: from_cents(model.affiliate_commission_cents),
            tier_2_commission: from_cents(model.tier_2_commission_cents),
            organizer_net: from_cents(model.organizer_net_cents),
        },
        attribution_model: parse_enum(&model.attribution_model, "attribution model")?,
        attributed_clicks: serde_json::from_str(&model.attributed_clicks)?,
        config_snapshot: serde_json::from_str(&model.config_snapshot)?,
        status: parse_enum(&model.status, "conversion status")?,
        agency_payout_status: parse_enum(&model.agency_payout_status, "payout status")?,
        affiliate_payout_status: parse_enum(&model.affiliate_payout_status, "payout status")?,
        id: model.id,
        ticket_id: model.ticket_id,
        event_id: model.event_id,
        link_id: model.link_id,
        click_id: model.click_id,
        affiliate_id: model.affiliate_id,
        agency_id: model.agency_id,
        tier_2_affiliate_id: model.tier_2_affiliate_id,
        calculation_breakdown: model.calculation_breakdown,
        agency_payout_id: model.agency_payout_id,
        affiliate_payout_id: model.affiliate_payout_id,
        converted_at: model.converted_at,
        created_at: model.created_at,
    })
}

pub fn conversion_to_active_model(
    conversion: &ReferralConversion,
) -> Result<referral_conversion::ActiveModel> {
    let a = &conversion.amounts;
    Ok(referral_conversion::ActiveModel {
        id: Set(conversion.id.clone()),
        ticket_id: Set(conversion.ticket_id.clone()),
        event_id: Set(conversion.event_id.clone()),
        link_id: Set(conversion.link_id.clone()),
        click_id: Set(conversion.click_id),
        affiliate_id: Set(conversion.affiliate_id.clone()),
        agency_id: Set(conversion.agency_id.clone()),
        tier_2_affiliate_id: Set(conversion.tier_2_affiliate_id.clone()),
        ticket_price_cents: Set(to_cents(a.ticket_price)),
        platform_fee_cents: Set(to_cents(a.platform_fee)),
        organizer_revenue_cents: Set(to_cents(a.organizer_revenue)),
        agency_commission_cents: Set(to_cents(a.agency_commission)),
        affiliate_commission_cents: Set(to_cents(a.affiliate_commission)),
        tier_2_commission_cents: Set(to_cents(a.tier_2_commission)),
        organizer_net_cents: Set(to_cents(a.organizer_net)),
        attribution_model: Set(conversion.attribution_model.to_string()),
        attributed_clicks: Set(serde_json::to_string(&conversion.attributed_clicks)?),
        config_snapshot: Set(serde_json::to_string(&conversion.config_snapshot)?),
        calculation_breakdown: Set(conversion.calculation_breakdown.clone()),
        status: Set(conversion.status.to_string()),
        agency_payout_status: Set(conversion.agency_payout_status.to_string()),
        agency_payout_id: Set(conversion.agency_payout_id.clone()),
        affiliate_payout_status: Set(conversion.affiliate_payout_status.to_string()),
        affiliate_payout_id: Set(conversion.affiliate_payout_id.clone()),
        converted_at: Set(conversion.converted_at),
        created_at: Set(conversion.created_at),
    })
}

pub fn model_to_payout(model: affiliate_payout::Model) -> Result<AffiliatePayout> {
    Ok(AffiliatePayout {
        payee_kind: parse_enum(&model.payee_kind, "payee kind")?,
        status: parse_enum(&model.status, "payout status")?,
        conversion_ids: serde_json::from_str(&model.conversion_ids)?,
        total_revenue: from_cents(model.total_revenue_cents),
        gross_amount: from_cents(model.gross_amount_cents),
        net_amount: from_cents(model.net_amount_cents),
        id: model.id,
        payee_id: model.payee_id,
        event_id: model.event_id,
        organizer_id: model.organizer_id,
        conversion_count: model.conversion_count,
        period_start: model.period_start,
        period_end: model.period_end,
        created_at: model.created_at,
        updated_at: model.updated_at,
        approved_at: model.approved_at,
        completed_at: model.completed_at,
        failure_reason: model.failure_reason,
        transaction_reference: model.transaction_reference,
    })
}

pub fn payout_to_active_model(payout: &AffiliatePayout) -> Result<affiliate_payout::ActiveModel> {
    Ok(affiliate_payout::ActiveModel {
        id: Set(payout.id.clone()),
        payee_kind: Set(payout.payee_kind.to_string()),
        payee_id: Set(payout.payee_id.clone()),
        event_id: Set(payout.event_id.clone()),
        organizer_id: Set(payout.organizer_id.clone()),
        status: Set(payout.status.to_string()),
        conversion_ids: Set(serde_json::to_string(&payout.conversion_ids)?),
        conversion_count: Set(payout.conversion_count),
        total_revenue_cents: Set(to_cents(payout.total_revenue)),
        gross_amount_cents: Set(to_cents(payout.gross_amount)),
        net_amount_cents: Set(to_cents(payout.net_amount)),
        period_start: Set(payout.period_start),
        period_end: Set(payout.period_end),
        created_at: Set(payout.created_at),
        updated_at: Set(payout.updated_at),
        approved_at: Set(payout.approved_at),
        completed_at: Set(payout.completed_at),
        failure_reason: Set(payout.failure_reason.clone()),
        transaction_reference: Set(payout.transaction_reference.clone()),
    })
}

pub fn model_to_snapshot(model: affiliate_performance_cache::Model) -> Result<PerformanceSnapshot> {
    Ok(PerformanceSnapshot {
        period: parse_enum(&model.period, "performance period")?,
        affiliate_id: model.affiliate_id,
        window_start: model.window_start,
        window_end: model.window_end,
        total_clicks: model.total_clicks,
        unique_visitors: model.unique_visitors,
        conversions: model.conversions,
        revenue: from_cents(model.revenue_cents),
        commission: from_cents(model.commission_cents),
        conversion_rate: model.conversion_rate,
        refreshed_at: model.refreshed_at,
    })
}

pub fn snapshot_to_active_model(
    snapshot: &PerformanceSnapshot,
) -> affiliate_performance_cache::ActiveModel {
    affiliate_performance_cache::ActiveModel {
        id: NotSet,
        affiliate_id: Set(snapshot.affiliate_id.clone()),
        period: Set(snapshot.period.to_string()),
        window_start: Set(snapshot.window_start),
        window_end: Set(snapshot.window_end),
        total_clicks: Set(snapshot.total_clicks),
        unique_visitors: Set(snapshot.unique_visitors),
        conversions: Set(snapshot.conversions),
        revenue_cents: Set(to_cents(snapshot.revenue)),
        commission_cents: Set(to_cents(snapshot.commission)),
        conversion_rate: Set(snapshot.conversion_rate),
        refreshed_at: Set(snapshot.refreshed_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn config_model() -> event_commission_config::Model {
        let now = Utc::now();
        event_commission_config::Model {
            event_id: "evt".into(),
            organizer_id: "org".into(),
            platform_fee_type: "hybrid".into(),
            platform_fee_bps: 250,
            platform_fee_fixed_cents: 99,
            platform_fee_cap_cents: Some(1000),
            agency_commission_type: "fixed".into(),
            agency_commission_bps: 0,
            agency_commission_fixed_cents: 500,
            affiliate_commission_enabled: true,
            affiliate_commission_type: "percentage".into(),
            affiliate_commission_bps: 2000,
            affiliate_commission_fixed_cents: 0,
            affiliate_commission_base: "organizer_revenue".into(),
            multi_tier_enabled: true,
            tier_2_bps: 1000,
            tier_3_bps: 0,
            attribution_model: "time_decay".into(),
            attribution_window_days: 14,
            payout_frequency: "weekly".into(),
            payout_delay_days: 3,
            minimum_payout_cents: 1000,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_config_scaling() {
        let config = model_to_config(config_model()).unwrap();
        let p = &config.policy;
        assert_eq!(p.platform_fee_type, FeeType::Hybrid);
        assert_eq!(p.platform_fee_percentage, Decimal::new(25, 1));
        assert_eq!(p.platform_fee_fixed, Decimal::new(99, 2));
        assert_eq!(p.platform_fee_cap, Some(Decimal::TEN));
        assert_eq!(p.tier_2_rate, Decimal::TEN);
        assert_eq!(p.attribution_model, AttributionModel::TimeDecay);
        assert_eq!(p.minimum_payout_amount, Decimal::TEN);

        let active = config_to_active_model(&config, true);
        assert!(matches!(active.platform_fee_bps, Set(250)));
        assert!(matches!(active.minimum_payout_cents, Set(1000)));
        assert!(matches!(active.payout_frequency, Set(ref f) if f == "weekly"));
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        let mut model = config_model();
        model.attribution_model = "position_based".into();
        let err = model_to_config(model).unwrap_err();
        assert!(matches!(err, AffiliateError::Serialization(_)));
    }

    #[test]
    fn test_link_update_keeps_counters_unset() {
        let now = Utc::now();
        let link = ReferralLink {
            id: "l1".into(),
            code: "ABCD1234".into(),
            short_code: None,
            event_id: "evt".into(),
            affiliate_id: Some("aff".into()),
            agency_id: None,
            parent_affiliate_id: None,
            target_url: Some("https://tickets.example.com/e/1".into()),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            status: LinkStatus::Active,
            expires_at: None,
            max_uses: None,
            use_count: 3,
            click_count: 10,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let active = link_to_active_model(&link, false);
        assert!(matches!(active.click_count, NotSet));
        assert!(matches!(active.use_count, NotSet));
        assert!(matches!(active.status, Set(ref s) if s == "active"));
    }
}
