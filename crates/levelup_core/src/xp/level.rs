//! Level curve.
//!
//! The XP needed to go from level `L` to `L + 1` is `100 * L`, so the
//! cumulative requirement for level `L` is the triangular number
//! `L * (L - 1) / 2 * 100`. Level 1 starts at 0 XP.

use serde::Serialize;

const XP_PER_LEVEL_STEP: u64 = 100;

/// Cumulative XP needed to reach `level`. Saturates instead of overflowing.
pub fn required_xp(level: u64) -> u64 {
    checked_required_xp(level).unwrap_or(u64::MAX)
}

fn checked_required_xp(level: u64) -> Option<u64> {
    // L * (L - 1) is always even, so halving first keeps the result exact.
    let pairs = level.checked_mul(level.saturating_sub(1))? / 2;
    pairs.checked_mul(XP_PER_LEVEL_STEP)
}

/// Level reached with `xp` cumulative XP.
///
/// Uses the closed-form inverse of the curve, then corrects for
/// floating-point error against the integer thresholds.
pub fn level_for_xp(xp: u64) -> u64 {
    let step = XP_PER_LEVEL_STEP as f64;
    let estimate = ((-step + (step * step + 8.0 * step * xp as f64).sqrt()) / (2.0 * step)).floor();
    let mut level = if estimate.is_finite() && estimate > 0.0 {
        estimate as u64 + 1
    } else {
        1
    };

    while level > 1 && checked_required_xp(level).map_or(true, |floor| floor > xp) {
        level -= 1;
    }
    while let Some(next) = checked_required_xp(level + 1) {
        if next > xp {
            break;
        }
        level += 1;
    }
    level
}

/// XP still missing before the next level.
pub fn xp_needed_for_next_level(xp: u64) -> u64 {
    required_xp(level_for_xp(xp) + 1).saturating_sub(xp)
}

/// Percentage of the current level already earned, in `[0, 100)`.
pub fn level_progress(xp: u64) -> f64 {
    let level = level_for_xp(xp);
    let floor = required_xp(level);
    let span = required_xp(level + 1).saturating_sub(floor);
    if span == 0 {
        return 0.0;
    }
    // Saturated thresholds and f64 rounding can both land on exactly 100.
    ((xp - floor) as f64 / span as f64 * 100.0).min(PROGRESS_CEILING)
}

/// Largest reported progress; the range is half-open.
const PROGRESS_CEILING: f64 = 100.0 - 100.0 * f64::EPSILON;

/// Display-ready view of XP totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub level: u64,
    pub xp: u64,
    pub xp_earned_today: u64,
    pub xp_needed_for_next_level: u64,
    pub level_progress: f64,
}

impl ProgressSnapshot {
    pub fn new(xp: u64, xp_earned_today: u64) -> Self {
        Self {
            level: level_for_xp(xp),
            xp,
            xp_earned_today,
            xp_needed_for_next_level: xp_needed_for_next_level(xp),
            level_progress: level_progress(xp),
        }
    }
}
