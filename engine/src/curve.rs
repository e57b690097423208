//! Multiplier curve.
//!
//! The live multiplier is a pure function of the time elapsed since the round
//! entered `playing`. Callers always pass the elapsed wall-clock time, so a
//! host that stalls and wakes up late lands on the right value instead of
//! replaying missed ticks.

use skytrax_types::Multiplier;
use std::time::Duration;

/// Unrounded curve value: `1 + 0.1t + 0.05t^1.5`, `t` in seconds.
pub fn raw_multiplier(elapsed: Duration) -> f64 {
    let t = elapsed.as_secs_f64();
    1.0 + 0.1 * t + 0.05 * t.powf(1.5)
}

/// Curve value at `elapsed`, rounded to two decimals.
pub fn multiplier_at(elapsed: Duration) -> Multiplier {
    Multiplier::from_f64(raw_multiplier(elapsed)).unwrap_or(Multiplier::ONE)
}

/// Next live multiplier: never below `previous`, never above `target`.
pub fn advance(previous: Multiplier, elapsed: Duration, target: Multiplier) -> Multiplier {
    multiplier_at(elapsed).max(previous).min(target)
}

/// Earliest whole millisecond at which the rounded curve reaches `target`.
pub fn elapsed_to_reach(target: Multiplier) -> Duration {
    if target <= Multiplier::ONE {
        return Duration::ZERO;
    }

    // Grow an upper bound, then bisect (the curve is strictly increasing)
    let mut high: u64 = 1_000;
    while multiplier_at(Duration::from_millis(high)) < target {
        high = high.saturating_mul(2);
        if high == u64::MAX {
            return Duration::from_millis(high);
        }
    }
    let mut low: u64 = 0;
    while low < high {
        let mid = low + (high - low) / 2;
        if multiplier_at(Duration::from_millis(mid)) >= target {
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    Duration::from_millis(low)
}
