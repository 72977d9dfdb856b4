use chrono::{DateTime, Duration, Utc};

use crate::models::{CrmStatus, EngagementSample};

/// A prospect goes hot once some event reached this scroll depth and some
/// event (not necessarily the same one) reached the hot dwell time.
pub const HOT_MIN_SCROLL_DEPTH: i32 = 80;
pub const HOT_MIN_DWELL_SECONDS: f64 = 30.0;

pub const WARM_MIN_SCROLL_DEPTH: i32 = 50;
pub const WARM_MIN_DWELL_SECONDS: f64 = 10.0;

/// Events closer together than this count as the same viewing session and
/// do not bump the visit counter.
pub const SESSION_WINDOW_MS: i64 = 3_600_000;

/// Derive the CRM temperature from the full event history of one prospect.
///
/// Pure function of the history: re-running it over the same samples always
/// yields the same tier, so a failed write-back self-heals on the next event.
pub fn evaluate_status(samples: &[EngagementSample]) -> CrmStatus {
    let deepest_scroll = samples
        .iter()
        .filter_map(|sample| sample.scroll_depth)
        .max();
    let longest_dwell = samples
        .iter()
        .filter_map(|sample| sample.dwell_seconds)
        .fold(None::<f64>, |best, dwell| match best {
            Some(current) if current >= dwell => Some(current),
            _ => Some(dwell),
        });

    let (scroll, dwell) = match (deepest_scroll, longest_dwell) {
        (Some(scroll), Some(dwell)) => (scroll, dwell),
        _ => return CrmStatus::Cold,
    };

    if scroll >= HOT_MIN_SCROLL_DEPTH && dwell >= HOT_MIN_DWELL_SECONDS {
        CrmStatus::Hot
    } else if scroll >= WARM_MIN_SCROLL_DEPTH && dwell >= WARM_MIN_DWELL_SECONDS {
        CrmStatus::Warm
    } else {
        CrmStatus::Cold
    }
}

/// Visit counter after one more event arrives at `now`.
///
/// First-ever view starts the counter at 1. A view more than an hour after
/// the previous one opens a new session and increments; anything inside the
/// window is a repeated ping and leaves the counter alone.
pub fn next_visit_count(
    visit_count: i32,
    last_viewed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i32 {
    match last_viewed_at {
        None => 1,
        Some(last) if now - last > Duration::milliseconds(SESSION_WINDOW_MS) => visit_count + 1,
        Some(_) => visit_count,
    }
}

/// Convert the report page's 0..1 scroll fraction to the stored 0..100
/// percentage. Out-of-range or non-finite fractions are rejected.
pub fn normalize_scroll_depth(fraction: f64) -> Option<i32> {
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return None;
    }
    Some((fraction * 100.0).round() as i32)
}

/// Dwell values come straight off a page timer; anything negative or
/// non-finite is a client bug and gets dropped.
pub fn normalize_dwell_seconds(dwell: f64) -> Option<f64> {
    if !dwell.is_finite() || dwell < 0.0 {
        return None;
    }
    Some(dwell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(scroll_depth: Option<i32>, dwell_seconds: Option<f64>) -> EngagementSample {
        EngagementSample {
            scroll_depth,
            dwell_seconds,
        }
    }

    #[test]
    fn empty_history_is_cold() {
        assert_eq!(evaluate_status(&[]), CrmStatus::Cold);
    }

    #[test]
    fn shallow_short_visit_stays_cold() {
        let history = vec![sample(Some(20), Some(3.0))];
        assert_eq!(evaluate_status(&history), CrmStatus::Cold);
    }

    #[test]
    fn warm_thresholds_promote_to_warm() {
        let history = vec![sample(Some(55), Some(12.0))];
        assert_eq!(evaluate_status(&history), CrmStatus::Warm);
    }

    #[test]
    fn hot_thresholds_promote_to_hot() {
        let history = vec![sample(Some(85), Some(35.0))];
        assert_eq!(evaluate_status(&history), CrmStatus::Hot);
    }

    #[test]
    fn hot_takes_precedence_over_warm() {
        // Both predicates hold across this history; hot must win.
        let history = vec![sample(Some(60), Some(15.0)), sample(Some(90), Some(45.0))];
        assert_eq!(evaluate_status(&history), CrmStatus::Hot);
    }

    #[test]
    fn hot_satisfied_across_distinct_events() {
        let history = vec![sample(Some(90), None), sample(None, Some(40.0))];
        assert_eq!(evaluate_status(&history), CrmStatus::Hot);
    }

    #[test]
    fn deep_scroll_alone_is_not_warm() {
        let history = vec![sample(Some(95), None)];
        assert_eq!(evaluate_status(&history), CrmStatus::Cold);
    }

    #[test]
    fn evaluation_is_idempotent_over_fixed_history() {
        let history = vec![
            sample(Some(85), Some(5.0)),
            sample(Some(30), Some(32.0)),
            sample(None, None),
        ];
        let first = evaluate_status(&history);
        assert_eq!(first, CrmStatus::Hot);
        for _ in 0..5 {
            assert_eq!(evaluate_status(&history), first);
        }
    }

    #[test]
    fn boundary_values_qualify() {
        let warm = vec![sample(Some(WARM_MIN_SCROLL_DEPTH), Some(WARM_MIN_DWELL_SECONDS))];
        assert_eq!(evaluate_status(&warm), CrmStatus::Warm);
        let hot = vec![sample(Some(HOT_MIN_SCROLL_DEPTH), Some(HOT_MIN_DWELL_SECONDS))];
        assert_eq!(evaluate_status(&hot), CrmStatus::Hot);
    }

    #[test]
    fn first_visit_starts_counter_at_one() {
        let now = Utc::now();
        assert_eq!(next_visit_count(0, None, now), 1);
    }

    #[test]
    fn pings_inside_session_window_do_not_inflate() {
        let now = Utc::now();
        let last = now - Duration::minutes(10);
        assert_eq!(next_visit_count(3, Some(last), now), 3);
    }

    #[test]
    fn view_after_window_opens_new_session() {
        let now = Utc::now();
        let last = now - Duration::minutes(61);
        assert_eq!(next_visit_count(3, Some(last), now), 4);
    }

    #[test]
    fn exact_window_edge_is_same_session() {
        let now = Utc::now();
        let last = now - Duration::milliseconds(SESSION_WINDOW_MS);
        assert_eq!(next_visit_count(2, Some(last), now), 2);
    }

    #[test]
    fn scroll_fraction_rounds_to_percentage() {
        assert_eq!(normalize_scroll_depth(0.85), Some(85));
        assert_eq!(normalize_scroll_depth(0.0), Some(0));
        assert_eq!(normalize_scroll_depth(1.0), Some(100));
        assert_eq!(normalize_scroll_depth(0.004), Some(0));
    }

    #[test]
    fn out_of_range_scroll_is_rejected() {
        assert_eq!(normalize_scroll_depth(1.2), None);
        assert_eq!(normalize_scroll_depth(-0.1), None);
        assert_eq!(normalize_scroll_depth(f64::NAN), None);
    }

    #[test]
    fn negative_dwell_is_rejected() {
        assert_eq!(normalize_dwell_seconds(-1.0), None);
        assert_eq!(normalize_dwell_seconds(f64::INFINITY), None);
        assert_eq!(normalize_dwell_seconds(12.5), Some(12.5));
    }
}
