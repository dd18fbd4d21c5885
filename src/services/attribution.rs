//! 归因解析
//!
//! 给定链接的点击历史与转化时刻，按归因模型选出获得归因的点击并分配权重。
//! 只有落在 `[at - window, at]` 内的点击参与计算；窗口内没有点击时返回空。
//! 时间戳相同的点击按写入顺序（id）排序。

use chrono::{DateTime, Duration, Utc};

use crate::storage::models::{AttributedClick, AttributionModel, ReferralClick};

/// time_decay 的半衰期（天）
pub const TIME_DECAY_HALF_LIFE_DAYS: f64 = 7.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub fn resolve(
    clicks: &[ReferralClick],
    at: DateTime<Utc>,
    model: AttributionModel,
    window_days: i64,
) -> Vec<AttributedClick> {
    let window_start = at - Duration::days(window_days.max(0));
    let mut in_window: Vec<&ReferralClick> = clicks
        .iter()
        .filter(|c| c.clicked_at >= window_start && c.clicked_at <= at)
        .collect();
    in_window.sort_by_key(|c| (c.clicked_at, c.id));

    let (Some(first), Some(last)) = (in_window.first(), in_window.last()) else {
        return Vec::new();
    };

    match model {
        AttributionModel::LastClick => vec![credit(last, 1.0)],
        AttributionModel::FirstClick => vec![credit(first, 1.0)],
        AttributionModel::Linear => {
            let weight = 1.0 / in_window.len() as f64;
            in_window.iter().map(|c| credit(c, weight)).collect()
        }
        AttributionModel::TimeDecay => {
            let raw: Vec<f64> = in_window
                .iter()
                .map(|c| decay_weight(at - c.clicked_at))
                .collect();
            let total: f64 = raw.iter().sum();
            in_window
                .iter()
                .zip(raw)
                .map(|(c, w)| credit(c, w / total))
                .collect()
        }
    }
}

/// `exp(-Δt / half_life)`，Δt 以天为单位
pub fn decay_weight(age: Duration) -> f64 {
    let days = age.num_milliseconds().max(0) as f64 / MILLIS_PER_DAY;
    (-days / TIME_DECAY_HALF_LIFE_DAYS).exp()
}

/// 被标记为 converted 的主点击：权重最高者，并列时取最近的一次
pub fn primary_click(attributed: &[AttributedClick]) -> Option<&AttributedClick> {
    attributed
        .iter()
        .reduce(|best, c| if c.weight >= best.weight { c } else { best })
}

fn credit(click: &ReferralClick, weight: f64) -> AttributedClick {
    AttributedClick {
        click_id: click.id,
        clicked_at: click.clicked_at,
        weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::DeviceType;
    use strum::IntoEnumIterator;

    fn click(id: i64, clicked_at: DateTime<Utc>) -> ReferralClick {
        ReferralClick {
            id,
            link_id: "link".into(),
            event_id: "evt".into(),
            affiliate_id: Some("aff".into()),
            agency_id: None,
            visitor_fingerprint: format!("fp-{}", id),
            device_type: DeviceType::Desktop,
            browser: None,
            os: None,
            referrer: None,
            utm_source: None,
            is_bot: false,
            clicked_at,
            converted: false,
            conversion_id: None,
        }
    }

    fn history(at: DateTime<Utc>) -> Vec<ReferralClick> {
        vec![
            click(1, at - Duration::days(40)),
            click(2, at - Duration::days(10)),
            click(3, at - Duration::days(3)),
            click(4, at - Duration::hours(2)),
        ]
    }

    #[test]
    fn test_weights_sum_to_one_for_every_model() {
        let at = Utc::now();
        for model in AttributionModel::iter() {
            let result = resolve(&history(at), at, model, 30);
            assert!(!result.is_empty(), "{model} returned nothing");
            let sum: f64 = result.iter().map(|c| c.weight).sum();
            assert!((sum - 1.0).abs() < 1e-9, "{model} weights sum to {sum}");
            assert!(result.iter().all(|c| c.click_id != 1), "{model} used out-of-window click");
        }
    }

    #[test]
    fn test_empty_when_nothing_in_window() {
        let at = Utc::now();
        let clicks = vec![click(1, at - Duration::days(31)), click(2, at + Duration::hours(1))];
        for model in AttributionModel::iter() {
            assert!(resolve(&clicks, at, model, 30).is_empty());
        }
        assert!(resolve(&[], at, AttributionModel::LastClick, 30).is_empty());
    }

    #[test]
    fn test_single_touch_models() {
        let at = Utc::now();
        let last = resolve(&history(at), at, AttributionModel::LastClick, 30);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].click_id, 4);
        assert_eq!(last[0].weight, 1.0);

        let first = resolve(&history(at), at, AttributionModel::FirstClick, 30);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].click_id, 2);
    }

    #[test]
    fn test_linear_is_uniform() {
        let at = Utc::now();
        let result = resolve(&history(at), at, AttributionModel::Linear, 30);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|c| (c.weight - 1.0 / 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_time_decay_favours_recent_clicks() {
        let at = Utc::now();
        let result = resolve(&history(at), at, AttributionModel::TimeDecay, 30);
        let ids: Vec<i64> = result.iter().map(|c| c.click_id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert!(result[0].weight < result[1].weight);
        assert!(result[1].weight < result[2].weight);
        assert!(result[0].weight > 0.0);
    }

    #[test]
    fn test_decay_weight_strictly_decreasing() {
        let mut prev = decay_weight(Duration::zero());
        assert_eq!(prev, 1.0);
        for hours in [1, 12, 24, 24 * 7, 24 * 20, 24 * 29] {
            let w = decay_weight(Duration::hours(hours));
            assert!(w < prev, "weight at {hours}h not below previous");
            prev = w;
        }
    }

    #[test]
    fn test_ties_resolve_by_insertion_order() {
        let at = Utc::now();
        let ts = at - Duration::hours(1);
        // 输入顺序打乱，结果仍按 id 稳定排序
        let clicks = vec![click(9, ts), click(5, ts), click(7, ts)];

        let first = resolve(&clicks, at, AttributionModel::FirstClick, 30);
        assert_eq!(first[0].click_id, 5);
        let last = resolve(&clicks, at, AttributionModel::LastClick, 30);
        assert_eq!(last[0].click_id, 9);

        let linear = resolve(&clicks, at, AttributionModel::Linear, 30);
        assert_eq!(
            linear.iter().map(|c| c.click_id).collect::<Vec<_>>(),
            vec![5, 7, 9]
        );
        assert_eq!(primary_click(&linear).map(|c| c.click_id), Some(9));
    }

    #[test]
    fn test_primary_click_is_heaviest() {
        let at = Utc::now();
        let result = resolve(&history(at), at, AttributionModel::TimeDecay, 30);
        assert_eq!(primary_click(&result).map(|c| c.click_id), Some(4));
        assert!(primary_click(&[]).is_none());
    }
}
