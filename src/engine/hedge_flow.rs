//! Delta-hedging-flow estimator.
//!
//! Models the rehedging order flow implied by market makers' aggregate delta
//! exposure changing between ticks: each instrument contributes its delta
//! change weighted by open interest and the contract multiplier. The per-tick
//! values form their own history series; trailing-window flow is the
//! trapezoidal integral of that series.

use super::history::History;

/// Shares per option contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Flow for one tick: `Σ (delta_now − delta_prev) × openInterest × 100`.
pub fn tick_flow(deltas_now: &[f64], deltas_prev: &[f64], open_interest: &[f64]) -> f64 {
    deltas_now
        .iter()
        .zip(deltas_prev)
        .zip(open_interest)
        .map(|((now, prev), oi)| (now - prev) * oi)
        .sum::<f64>()
        * CONTRACT_MULTIPLIER
}

/// Flow since session start, closed form: `Σ delta_now × openInterest × 100`.
///
/// Integrating the per-tick series from an unknown start delta of zero is
/// equivalent to the end-point product when the start contribution is defined
/// as zero, so the intraday window uses this instead of the trapezoid. The
/// structural asymmetry with [`windowed_flow`] is intentional.
pub fn session_flow(deltas_now: &[f64], open_interest: &[f64]) -> f64 {
    deltas_now
        .iter()
        .zip(open_interest)
        .map(|(delta, oi)| delta * oi)
        .sum::<f64>()
        * CONTRACT_MULTIPLIER
}

/// Trapezoidal integral of the stored flow series over a trailing window of
/// `window_len` ticks, with `sample_interval_secs` spacing.
///
/// The integration range is buffer indices `[1, window_len - 1)`: the very
/// newest and very oldest samples are excluded, matching the boundary
/// trimming a delta difference needs (two adjacent samples per value).
pub fn windowed_flow(flow: &History<f64>, window_len: usize, sample_interval_secs: u64) -> f64 {
    let values: Vec<f64> = flow
        .range(1, window_len.saturating_sub(1))
        .copied()
        .collect();
    trapezoid(&values, sample_interval_secs as f64)
}

/// Trapezoidal-rule integral of equally spaced samples.
fn trapezoid(values: &[f64], dx: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.windows(2).map(|w| (w[0] + w[1]) * 0.5 * dx).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_flow_scenario() {
        // Delta moves 0.5 -> 0.3 with open interest 100:
        // (0.3 - 0.5) * 100 * 100 = -2000
        let flow = tick_flow(&[0.3], &[0.5], &[100.0]);
        assert_eq!(flow, -2_000.0);
    }

    #[test]
    fn test_tick_flow_sums_instruments() {
        let flow = tick_flow(&[0.2, -0.1], &[0.1, -0.3], &[10.0, 20.0]);
        // (0.1 * 10 + 0.2 * 20) * 100 = 500
        assert!((flow - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_session_flow_closed_form() {
        let flow = session_flow(&[0.5, -0.25], &[100.0, 40.0]);
        // (0.5 * 100 - 0.25 * 40) * 100 = 4000
        assert!((flow - 4_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_trapezoid() {
        // f = [1, 2, 3] with dx=2: (1.5 + 2.5) * 2 = 8
        assert_eq!(trapezoid(&[1.0, 2.0, 3.0], 2.0), 8.0);
        assert_eq!(trapezoid(&[1.0], 2.0), 0.0);
        assert_eq!(trapezoid(&[], 2.0), 0.0);
    }

    #[test]
    fn test_windowed_flow_trims_boundaries() {
        let mut flow = History::filled(10, 2, 0.0);
        // Buffer newest-to-oldest after pushes: [60, 50, 40, 30, 20, 10, 0, ...]
        for v in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0] {
            flow.rotate_and_set_head(v);
        }
        // Window of 6 ticks integrates indices 1..5 = [50, 40, 30, 20]
        let integral = windowed_flow(&flow, 6, 2);
        assert_eq!(integral, (45.0 + 35.0 + 25.0) * 2.0);
    }

    #[test]
    fn test_windowed_flow_idempotent() {
        let mut flow = History::filled(8, 2, 0.0);
        for v in [3.0, -1.0, 4.0, -1.0, 5.0] {
            flow.rotate_and_set_head(v);
        }
        let first = windowed_flow(&flow, 5, 2);
        let second = windowed_flow(&flow, 5, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_windowed_flow_degenerate_windows() {
        let mut flow = History::filled(8, 2, 1.0);
        flow.rotate_and_set_head(9.0);
        // Windows too short to hold two interior samples integrate to zero
        assert_eq!(windowed_flow(&flow, 0, 2), 0.0);
        assert_eq!(windowed_flow(&flow, 2, 2), 0.0);
        assert_eq!(windowed_flow(&flow, 3, 2), 0.0);
    }
}
