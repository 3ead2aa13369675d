//! Chart-series projection for the frame.
//!
//! Turns current-tick values into the two bar-chart series, the
//! unusual-activity highlight masks, and the spot marker index. Pure
//! projection over the engine's current state; nothing here touches history.

use super::{masked, FlowEngine};

/// One value per strike, split by right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub puts: Vec<f64>,
    pub calls: Vec<f64>,
}

/// Everything the frame needs to draw the charts for one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalFrame {
    /// Current volume over seeded open interest, per strike.
    pub volume_to_oi: ChartSeries,
    /// Open-interest change since session start, per strike.
    pub oi_change: ChartSeries,
    /// True where put volume exceeds the seeded put open interest.
    pub unusual_puts: Vec<bool>,
    /// True where call volume exceeds the seeded call open interest.
    pub unusual_calls: Vec<bool>,
    /// Index of the strike nearest the current underlying price.
    pub spot_index: usize,
    pub spot_price: f64,
}

/// Project the engine's current tick onto chart series and highlight masks.
pub fn project(engine: &FlowEngine, strike_axis: &[f64]) -> SignalFrame {
    let mask = engine.put_mask();

    let volume_now = engine.option_volume().head();
    let put_volumes = masked(volume_now, mask, true);
    let call_volumes = masked(volume_now, mask, false);

    let seeded = engine.open_interest_seeded();
    let put_oi = masked(seeded, mask, true);
    let call_oi = masked(seeded, mask, false);

    let oi_now = engine.open_interest().head();
    let oi_base = &engine.baseline().open_interest;
    let oi_change: Vec<f64> = oi_now
        .iter()
        .zip(oi_base)
        .map(|(now, base)| now - base)
        .collect();

    SignalFrame {
        volume_to_oi: ChartSeries {
            puts: ratios(&put_volumes, &put_oi),
            calls: ratios(&call_volumes, &call_oi),
        },
        oi_change: ChartSeries {
            puts: masked(&oi_change, mask, true),
            calls: masked(&oi_change, mask, false),
        },
        unusual_puts: exceeds(&put_volumes, &put_oi),
        unusual_calls: exceeds(&call_volumes, &call_oi),
        spot_index: nearest_strike(strike_axis, engine.spot()),
        spot_price: engine.spot(),
    }
}

fn ratios(volumes: &[f64], open_interest: &[f64]) -> Vec<f64> {
    volumes
        .iter()
        .zip(open_interest)
        .map(|(v, oi)| v / oi)
        .collect()
}

fn exceeds(volumes: &[f64], open_interest: &[f64]) -> Vec<bool> {
    volumes
        .iter()
        .zip(open_interest)
        .map(|(v, oi)| v > oi)
        .collect()
}

/// Index of the strike closest to `spot`; ties resolve to the lower strike.
pub fn nearest_strike(strike_axis: &[f64], spot: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (idx, strike) in strike_axis.iter().enumerate() {
        let distance = (strike - spot).abs();
        if distance < best_distance {
            best_distance = distance;
            best = idx;
        }
    }
    best
}
