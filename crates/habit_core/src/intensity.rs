use serde::Serialize;

use crate::aggregate::{DayAggregate, RangeAggregate};

/// Hue of a fully completed cell; zero is an all-missed cell.
pub const MAX_HUE: u16 = 142;

/// Maps a completion ratio linearly onto the red-to-green hue range.
pub fn hue(ratio: f64) -> u16 {
    if ratio.is_nan() {
        return 0;
    }
    (ratio.clamp(0.0, 1.0) * f64::from(MAX_HUE)).round() as u16
}

/// Presentation-neutral colouring decision for one calendar cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "hue", rename_all = "snake_case")]
pub enum CellShade {
    Future,
    PreTracking,
    NoActivity,
    Hue(u16),
}

/// Annual-grid rule: only days where something was marked get a hue.
pub fn shade_for_day(aggregate: &DayAggregate, future: bool) -> CellShade {
    if future {
        CellShade::Future
    } else if aggregate.has_activity() {
        CellShade::Hue(hue(aggregate.ratio))
    } else {
        CellShade::NoActivity
    }
}

/// Life-grid rule: any valid-habit slot in the bucket earns a hue.
pub fn shade_for_range(aggregate: &RangeAggregate, future: bool, pre_tracking: bool) -> CellShade {
    if future {
        CellShade::Future
    } else if pre_tracking {
        CellShade::PreTracking
    } else if aggregate.has_activity() {
        CellShade::Hue(hue(aggregate.ratio))
    } else {
        CellShade::NoActivity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn endpoints_and_midpoint() {
        assert_eq!(hue(0.0), 0);
        assert_eq!(hue(1.0), MAX_HUE);
        assert_eq!(hue(0.5), 71);
        assert_eq!(hue(3.0 / 14.0), 30);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        assert_eq!(hue(-0.2), 0);
        assert_eq!(hue(1.7), MAX_HUE);
        assert_eq!(hue(f64::NAN), 0);
    }

    #[test]
    fn empty_day_is_not_coloured_red() {
        let empty = DayAggregate::default();
        assert_eq!(shade_for_day(&empty, false), CellShade::NoActivity);

        let all_missed = DayAggregate {
            completed: 0,
            missed: 2,
            total: 2,
            ratio: 0.0,
        };
        assert_eq!(shade_for_day(&all_missed, false), CellShade::Hue(0));
        assert_eq!(shade_for_day(&all_missed, true), CellShade::Future);
    }

    #[test]
    fn range_shade_prefers_future_then_pre_tracking() {
        let agg = RangeAggregate {
            completed: 3,
            missed: 0,
            total: 3,
            ratio: 1.0,
        };
        assert_eq!(shade_for_range(&agg, true, true), CellShade::Future);
        assert_eq!(shade_for_range(&agg, false, true), CellShade::PreTracking);
        assert_eq!(shade_for_range(&agg, false, false), CellShade::Hue(MAX_HUE));
        assert_eq!(
            shade_for_range(&RangeAggregate::default(), false, false),
            CellShade::NoActivity
        );
    }

    proptest! {
        #[test]
        fn hue_is_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(hue(low) <= hue(high));
            prop_assert!(hue(high) <= MAX_HUE);
        }
    }
}
