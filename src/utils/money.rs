//! 金额工具
//!
//! 领域内金额统一用 `Decimal`，在计算点四舍五入（远离零）到 2 位小数；
//! 落库时以最小货币单位（分）保存，比例以基点（1% = 100）保存。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// 单笔金额上限，防止 i64 分溢出
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * pct / 100`，已四舍五入
pub fn percent_of(amount: Decimal, pct: Decimal) -> Decimal {
    round_money(amount * pct / Decimal::ONE_HUNDRED)
}

pub fn to_cents(value: Decimal) -> i64 {
    (round_money(value) * Decimal::ONE_HUNDRED)
        .to_i64()
        .unwrap_or(if value.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// 百分比 → 基点（保留两位小数精度）
pub fn percent_to_bps(pct: Decimal) -> i64 {
    to_cents(pct)
}

pub fn bps_to_percent(bps: i64) -> Decimal {
    Decimal::new(bps, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
        assert_eq!(round_money(Decimal::new(1234, 3)), Decimal::new(123, 2));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(
            percent_of(Decimal::ONE_HUNDRED, Decimal::new(5, 0)),
            Decimal::new(500, 2)
        );
        // 33.333...% of 10 = 3.33
        assert_eq!(
            percent_of(Decimal::TEN, Decimal::new(3333, 2)),
            Decimal::new(333, 2)
        );
    }

    #[test]
    fn test_cents_conversion() {
        assert_eq!(to_cents(Decimal::new(1999, 2)), 1999);
        assert_eq!(to_cents(Decimal::new(19995, 3)), 2000);
        assert_eq!(from_cents(7600), Decimal::new(76, 0));
        assert_eq!(bps_to_percent(2050), Decimal::new(2050, 2));
        assert_eq!(percent_to_bps(Decimal::new(125, 1)), 1250);
    }
}
