//! 佣金计算
//!
//! 平台费 → agency → affiliate → tier-2 逐层拆分。每一步在计算点四舍五入到
//! 2 位小数，且每一层都不超过主办方收入的剩余部分，保证 `organizer_net ≥ 0`。

use rust_decimal::Decimal;

use crate::errors::{AffiliateError, Result};
use crate::storage::models::{
    CommissionBase, CommissionBreakdown, CommissionPolicy, CommissionType, FeeType,
};
use crate::utils::money::{MAX_AMOUNT, percent_of, round_money};

/// 本次转化涉及的收款方
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Parties {
    pub agency: bool,
    pub affiliate: bool,
    /// 存在上级 affiliate（多级佣金开启时才计算）
    pub tier_2: bool,
}

pub fn calculate(
    ticket_price: Decimal,
    policy: &CommissionPolicy,
    parties: Parties,
) -> Result<CommissionBreakdown> {
    if ticket_price.is_sign_negative() || ticket_price > MAX_AMOUNT {
        return Err(AffiliateError::validation(format!(
            "ticket price out of range: {}",
            ticket_price
        )));
    }
    let price = round_money(ticket_price);

    let platform_fee = platform_fee(price, policy);
    let organizer_revenue = price - platform_fee;
    let mut remaining = organizer_revenue;

    let agency_commission = if parties.agency {
        let amount = commission_amount(
            policy.agency_commission_type,
            organizer_revenue,
            policy.agency_commission_percentage,
            policy.agency_commission_fixed,
        );
        take(&mut remaining, amount)
    } else {
        Decimal::ZERO
    };

    let affiliate_commission = if policy.affiliate_commission_enabled && parties.affiliate {
        let base = match policy.affiliate_commission_base {
            CommissionBase::TicketPrice => price,
            CommissionBase::OrganizerRevenue => organizer_revenue,
            CommissionBase::AgencyRevenue => agency_commission,
        };
        let amount = commission_amount(
            policy.affiliate_commission_type,
            base,
            policy.affiliate_commission_percentage,
            policy.affiliate_commission_fixed,
        );
        take(&mut remaining, amount)
    } else {
        Decimal::ZERO
    };

    // 佣金的佣金
    let tier_2_commission = if policy.multi_tier_enabled && parties.tier_2 {
        take(
            &mut remaining,
            percent_of(affiliate_commission, policy.tier_2_rate),
        )
    } else {
        Decimal::ZERO
    };

    Ok(CommissionBreakdown {
        ticket_price: price,
        platform_fee,
        organizer_revenue,
        agency_commission,
        affiliate_commission,
        tier_2_commission,
        organizer_net: remaining,
    })
}

fn platform_fee(price: Decimal, policy: &CommissionPolicy) -> Decimal {
    let fee = match policy.platform_fee_type {
        FeeType::Percentage => percent_of(price, policy.platform_fee_percentage),
        FeeType::Fixed => round_money(policy.platform_fee_fixed),
        FeeType::Hybrid => {
            percent_of(price, policy.platform_fee_percentage) + round_money(policy.platform_fee_fixed)
        }
    };
    let fee = match policy.platform_fee_cap {
        Some(cap) => fee.min(round_money(cap)),
        None => fee,
    };
    fee.max(Decimal::ZERO).min(price)
}

fn commission_amount(kind: CommissionType, base: Decimal, pct: Decimal, fixed: Decimal) -> Decimal {
    match kind {
        CommissionType::Percentage => percent_of(base, pct),
        CommissionType::Fixed => round_money(fixed),
    }
    .max(Decimal::ZERO)
}

/// 从剩余收入中扣除，最多扣到 0
fn take(remaining: &mut Decimal, amount: Decimal) -> Decimal {
    let taken = amount.min(*remaining);
    *remaining -= taken;
    taken
}

/// 写入佣金配置前的校验
pub fn validate_policy(policy: &CommissionPolicy) -> Result<()> {
    let percentages = [
        ("platform_fee_percentage", policy.platform_fee_percentage),
        ("agency_commission_percentage", policy.agency_commission_percentage),
        ("affiliate_commission_percentage", policy.affiliate_commission_percentage),
        ("tier_2_rate", policy.tier_2_rate),
        ("tier_3_rate", policy.tier_3_rate),
    ];
    for (field, value) in percentages {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(AffiliateError::validation(format!(
                "{} must be between 0 and 100, got {}",
                field, value
            )));
        }
    }

    let amounts = [
        ("platform_fee_fixed", Some(policy.platform_fee_fixed)),
        ("platform_fee_cap", policy.platform_fee_cap),
        ("agency_commission_fixed", Some(policy.agency_commission_fixed)),
        ("affiliate_commission_fixed", Some(policy.affiliate_commission_fixed)),
        ("minimum_payout_amount", Some(policy.minimum_payout_amount)),
    ];
    for (field, value) in amounts {
        if let Some(value) = value
            && (value < Decimal::ZERO || value > MAX_AMOUNT)
        {
            return Err(AffiliateError::validation(format!(
                "{} must be between 0 and {}, got {}",
                field, MAX_AMOUNT, value
            )));
        }
    }

    if !(1..=365).contains(&policy.attribution_window_days) {
        return Err(AffiliateError::validation(format!(
            "attribution_window_days must be between 1 and 365, got {}",
            policy.attribution_window_days
        )));
    }
    if !(0..=365).contains(&policy.payout_delay_days) {
        return Err(AffiliateError::validation(format!(
            "payout_delay_days must be between 0 and 365, got {}",
            policy.payout_delay_days
        )));
    }

    // agency% + affiliate% × (1 + tier2%) 不能超过主办方收入
    if policy.agency_commission_type == CommissionType::Percentage
        && policy.affiliate_commission_type == CommissionType::Percentage
        && policy.affiliate_commission_base == CommissionBase::OrganizerRevenue
    {
        let tier_factor = if policy.multi_tier_enabled {
            Decimal::ONE + policy.tier_2_rate / Decimal::ONE_HUNDRED
        } else {
            Decimal::ONE
        };
        let affiliate_share = if policy.affiliate_commission_enabled {
            policy.affiliate_commission_percentage * tier_factor
        } else {
            Decimal::ZERO
        };
        let total = policy.agency_commission_percentage + affiliate_share;
        if total > Decimal::ONE_HUNDRED {
            return Err(AffiliateError::validation(format!(
                "commission rates exceed organizer revenue ({}%)",
                total.normalize()
            )));
        }
    }

    Ok(())
}

/// 审计用的计算过程文本
pub fn format_breakdown(breakdown: &CommissionBreakdown, policy: &CommissionPolicy) -> String {
    let fee_rule = match policy.platform_fee_type {
        FeeType::Percentage => format!("{}%", policy.platform_fee_percentage.normalize()),
        FeeType::Fixed => format!("fixed {}", policy.platform_fee_fixed),
        FeeType::Hybrid => format!(
            "{}% + {}",
            policy.platform_fee_percentage.normalize(),
            policy.platform_fee_fixed
        ),
    };
    let fee_rule = match policy.platform_fee_cap {
        Some(cap) => format!("{}, cap {}", fee_rule, cap),
        None => fee_rule,
    };

    let rule = |kind: CommissionType, pct: Decimal, fixed: Decimal| match kind {
        CommissionType::Percentage => format!("{}%", pct.normalize()),
        CommissionType::Fixed => format!("fixed {}", fixed),
    };

    let mut lines = vec![
        format!("Ticket price: {:.2}", breakdown.ticket_price),
        format!("Platform fee ({}): {:.2}", fee_rule, breakdown.platform_fee),
        format!("Organizer revenue: {:.2}", breakdown.organizer_revenue),
        format!(
            "Agency commission ({}): {:.2}",
            rule(
                policy.agency_commission_type,
                policy.agency_commission_percentage,
                policy.agency_commission_fixed
            ),
            breakdown.agency_commission
        ),
        format!(
            "Affiliate commission ({} of {}): {:.2}",
            rule(
                policy.affiliate_commission_type,
                policy.affiliate_commission_percentage,
                policy.affiliate_commission_fixed
            ),
            policy.affiliate_commission_base,
            breakdown.affiliate_commission
        ),
    ];
    if policy.multi_tier_enabled {
        lines.push(format!(
            "Tier-2 commission ({}% of affiliate commission): {:.2}",
            policy.tier_2_rate.normalize(),
            breakdown.tier_2_commission
        ));
    }
    lines.push(format!("Organizer net: {:.2}", breakdown.organizer_net));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn basic_policy() -> CommissionPolicy {
        CommissionPolicy {
            platform_fee_percentage: dec("5"),
            affiliate_commission_percentage: dec("20"),
            ..Default::default()
        }
    }

    const AFFILIATE_ONLY: Parties = Parties {
        agency: false,
        affiliate: true,
        tier_2: false,
    };

    fn assert_balanced(b: &CommissionBreakdown) {
        assert!(b.organizer_net >= Decimal::ZERO);
        assert_eq!(
            b.organizer_net + b.agency_commission + b.affiliate_commission + b.tier_2_commission,
            b.organizer_revenue
        );
        assert_eq!(b.platform_fee + b.organizer_revenue, b.ticket_price);
    }

    #[test]
    fn test_reference_scenario() {
        let b = calculate(dec("100"), &basic_policy(), AFFILIATE_ONLY).unwrap();
        assert_eq!(b.platform_fee, dec("5.00"));
        assert_eq!(b.organizer_revenue, dec("95.00"));
        assert_eq!(b.agency_commission, Decimal::ZERO);
        assert_eq!(b.affiliate_commission, dec("19.00"));
        assert_eq!(b.tier_2_commission, Decimal::ZERO);
        assert_eq!(b.organizer_net, dec("76.00"));
        assert_balanced(&b);
    }

    #[test]
    fn test_platform_fee_variants() {
        let mut policy = basic_policy();
        policy.platform_fee_type = FeeType::Hybrid;
        policy.platform_fee_fixed = dec("1.50");
        let b = calculate(dec("40"), &policy, Parties::default()).unwrap();
        assert_eq!(b.platform_fee, dec("3.50"));

        policy.platform_fee_cap = Some(dec("3"));
        let b = calculate(dec("40"), &policy, Parties::default()).unwrap();
        assert_eq!(b.platform_fee, dec("3.00"));

        policy.platform_fee_type = FeeType::Fixed;
        policy.platform_fee_cap = None;
        policy.platform_fee_fixed = dec("10");
        let b = calculate(dec("4"), &policy, Parties::default()).unwrap();
        assert_eq!(b.platform_fee, dec("4"));
        assert_eq!(b.organizer_revenue, Decimal::ZERO);
    }

    #[test]
    fn test_agency_and_commission_bases() {
        let mut policy = basic_policy();
        policy.agency_commission_percentage = dec("10");
        policy.affiliate_commission_base = CommissionBase::AgencyRevenue;
        policy.affiliate_commission_percentage = dec("50");
        let parties = Parties {
            agency: true,
            affiliate: true,
            tier_2: false,
        };
        let b = calculate(dec("100"), &policy, parties).unwrap();
        assert_eq!(b.agency_commission, dec("9.50"));
        assert_eq!(b.affiliate_commission, dec("4.75"));
        assert_balanced(&b);

        policy.affiliate_commission_base = CommissionBase::TicketPrice;
        policy.affiliate_commission_percentage = dec("10");
        let b = calculate(dec("100"), &policy, parties).unwrap();
        assert_eq!(b.affiliate_commission, dec("10.00"));
        assert_balanced(&b);
    }

    #[test]
    fn test_tier_2_is_commission_on_commission() {
        let mut policy = basic_policy();
        policy.multi_tier_enabled = true;
        policy.tier_2_rate = dec("10");
        let parties = Parties {
            agency: false,
            affiliate: true,
            tier_2: true,
        };
        let b = calculate(dec("100"), &policy, parties).unwrap();
        assert_eq!(b.affiliate_commission, dec("19.00"));
        assert_eq!(b.tier_2_commission, dec("1.90"));
        assert_eq!(b.organizer_net, dec("74.10"));

        // 关闭多级后不计算
        policy.multi_tier_enabled = false;
        let b = calculate(dec("100"), &policy, parties).unwrap();
        assert_eq!(b.tier_2_commission, Decimal::ZERO);
    }

    #[test]
    fn test_disabled_or_absent_parties_earn_nothing() {
        let mut policy = basic_policy();
        policy.affiliate_commission_enabled = false;
        let b = calculate(dec("100"), &policy, AFFILIATE_ONLY).unwrap();
        assert_eq!(b.affiliate_commission, Decimal::ZERO);
        assert_eq!(b.organizer_net, dec("95.00"));

        policy.agency_commission_percentage = dec("10");
        let b = calculate(dec("100"), &policy, AFFILIATE_ONLY).unwrap();
        assert_eq!(b.agency_commission, Decimal::ZERO);
    }

    #[test]
    fn test_fixed_commissions_are_capped_by_revenue() {
        let policy = CommissionPolicy {
            agency_commission_type: CommissionType::Fixed,
            agency_commission_fixed: dec("8"),
            affiliate_commission_type: CommissionType::Fixed,
            affiliate_commission_fixed: dec("5"),
            ..Default::default()
        };
        let parties = Parties {
            agency: true,
            affiliate: true,
            tier_2: false,
        };
        let b = calculate(dec("10"), &policy, parties).unwrap();
        assert_eq!(b.agency_commission, dec("8"));
        assert_eq!(b.affiliate_commission, dec("2"));
        assert_eq!(b.organizer_net, Decimal::ZERO);
        assert_balanced(&b);
    }

    #[test]
    fn test_rounding_happens_at_each_step() {
        let policy = CommissionPolicy {
            platform_fee_percentage: dec("3.33"),
            affiliate_commission_percentage: dec("12.5"),
            ..Default::default()
        };
        for price in ["0.01", "9.99", "19.95", "33.33", "1234.56"] {
            let b = calculate(dec(price), &policy, AFFILIATE_ONLY).unwrap();
            for amount in [b.platform_fee, b.affiliate_commission, b.organizer_net] {
                assert!(amount.scale() <= 2, "{amount} not rounded");
            }
            assert_balanced(&b);
        }
    }

    #[test]
    fn test_rejects_invalid_price() {
        assert!(calculate(dec("-1"), &basic_policy(), AFFILIATE_ONLY).is_err());
        assert!(calculate(dec("1000000001"), &basic_policy(), AFFILIATE_ONLY).is_err());
        assert!(calculate(Decimal::ZERO, &basic_policy(), AFFILIATE_ONLY).is_ok());
    }

    #[test]
    fn test_validate_policy() {
        assert!(validate_policy(&basic_policy()).is_ok());

        let mut p = basic_policy();
        p.platform_fee_percentage = dec("101");
        assert!(validate_policy(&p).is_err());

        let mut p = basic_policy();
        p.agency_commission_fixed = dec("-1");
        assert!(validate_policy(&p).is_err());

        let mut p = basic_policy();
        p.attribution_window_days = 0;
        assert!(validate_policy(&p).is_err());

        let mut p = basic_policy();
        p.agency_commission_percentage = dec("60");
        p.affiliate_commission_percentage = dec("40");
        assert!(validate_policy(&p).is_ok());
        p.multi_tier_enabled = true;
        p.tier_2_rate = dec("10");
        assert!(validate_policy(&p).is_err());
    }

    #[test]
    fn test_format_breakdown_mentions_each_leg() {
        let policy = basic_policy();
        let b = calculate(dec("100"), &policy, AFFILIATE_ONLY).unwrap();
        let text = format_breakdown(&b, &policy);
        assert!(text.contains("Platform fee (5%): 5.00"));
        assert!(text.contains("Affiliate commission (20% of organizer_revenue): 19.00"));
        assert!(text.contains("Organizer net: 76.00"));
        assert!(!text.contains("Tier-2"));
    }
}
