//! Windowed analytics engine.
//!
//! [`FlowEngine`] owns the five rolling history buffers, the open-interest
//! tracker, the put/call partition, and the session baseline. It is
//! constructed once at startup from the warm-up feed read and then mutated
//! exactly once per loop iteration; rendering only ever reads it between
//! ticks, so a frame never observes a buffer mid-rotation.

pub mod hedge_flow;
pub mod history;
pub mod ingest;
pub mod open_interest;
pub mod report;
pub mod signals;

use self::history::History;
use self::ingest::{TickBatch, TickValues};
use self::open_interest::OpenInterestTracker;

/// Timing parameters for the engine, all in seconds.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Wall-clock spacing between successive ticks.
    pub sample_interval_secs: u64,
    /// Session length the buffers must cover.
    pub session_secs: u64,
    /// How often the open-interest estimates are re-seeded from the feed.
    pub oi_refresh_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 2,
            // One 6.5h equity trading day
            session_secs: 23_400,
            oi_refresh_secs: 60,
        }
    }
}

/// State captured at seeding, diffed against by the intraday report.
#[derive(Debug, Clone)]
pub struct SessionBaseline {
    /// Option volumes at seed time.
    pub volumes: Vec<f64>,
    /// Initially seeded open-interest estimates.
    pub open_interest: Vec<f64>,
    /// Underlying volume at seed time.
    pub underlying_volume: f64,
}

/// What one tick produced, for the frame to surface.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// Indices of instruments whose delta was unavailable this tick.
    pub missing_delta: Vec<usize>,
    /// Whether this tick re-seeded open interest from the feed.
    pub refreshed_open_interest: bool,
}

/// The windowed analytics engine. One per monitored underlying.
#[derive(Debug, Clone)]
pub struct FlowEngine {
    cfg: EngineConfig,
    put_mask: Vec<bool>,
    underlying_volume: History<f64>,
    option_volume: History<Vec<f64>>,
    option_delta: History<Vec<f64>>,
    open_interest: History<Vec<f64>>,
    hedge_flow: History<f64>,
    tracker: OpenInterestTracker,
    baseline: SessionBaseline,
    spot: f64,
    ticks: u64,
}

impl FlowEngine {
    /// Build the engine from the warm-up read: seed the open-interest
    /// estimates and pre-fill every buffer with the first observed snapshot
    /// so windowed deltas are well-defined from the first tick.
    pub fn seed(cfg: EngineConfig, put_mask: Vec<bool>, first: &TickBatch) -> Self {
        let values = ingest::sanitize(first);
        let tracker = OpenInterestTracker::seed(&first.reported_open_interest(&put_mask));
        let baseline = SessionBaseline {
            volumes: values.volumes.clone(),
            open_interest: tracker.estimates().to_vec(),
            underlying_volume: values.underlying_volume,
        };

        let len = History::<f64>::session_len(cfg.session_secs, cfg.sample_interval_secs);
        let interval = cfg.sample_interval_secs;

        Self {
            underlying_volume: History::filled(len, interval, values.underlying_volume),
            option_volume: History::filled(len, interval, values.volumes.clone()),
            option_delta: History::filled(len, interval, values.deltas.clone()),
            open_interest: History::filled(len, interval, tracker.estimates().to_vec()),
            hedge_flow: History::filled(len, interval, 0.0),
            spot: values.underlying_price,
            tracker,
            baseline,
            put_mask,
            cfg,
            ticks: 0,
        }
    }

    /// Admit one tick: sanitize the batch, ratchet open interest from volume,
    /// rotate every buffer, push this tick's hedge flow, and re-seed open
    /// interest when the refresh interval has elapsed.
    pub fn apply(&mut self, batch: &TickBatch) -> TickOutcome {
        let values = ingest::sanitize(batch);
        self.tracker.update_from_volume(&values.volumes);
        self.rotate(&values);
        self.ticks += 1;

        let refreshed = self.refresh_due();
        if refreshed {
            self.tracker
                .periodic_refresh(&batch.reported_open_interest(&self.put_mask));
        }

        TickOutcome {
            missing_delta: values.missing_delta,
            refreshed_open_interest: refreshed,
        }
    }

    fn rotate(&mut self, values: &TickValues) {
        self.spot = values.underlying_price;
        self.underlying_volume
            .rotate_and_set_head(values.underlying_volume);
        self.option_volume
            .rotate_and_set_head(values.volumes.clone());
        self.option_delta.rotate_and_set_head(values.deltas.clone());
        self.open_interest
            .rotate_and_set_head(self.tracker.estimates().to_vec());

        // Delta differences need the rotated buffer: head is this tick,
        // index 1 the previous one.
        let flow = hedge_flow::tick_flow(
            self.option_delta.head(),
            self.option_delta.at_index(1),
            self.open_interest.head(),
        );
        self.hedge_flow.rotate_and_set_head(flow);
    }

    fn refresh_due(&self) -> bool {
        let elapsed = self.ticks * self.cfg.sample_interval_secs;
        elapsed > 0 && elapsed % self.cfg.oi_refresh_secs == 0
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// True at index i when instrument i is a put.
    pub fn put_mask(&self) -> &[bool] {
        &self.put_mask
    }

    pub fn baseline(&self) -> &SessionBaseline {
        &self.baseline
    }

    /// Last underlying price seen.
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Loop time elapsed since seeding.
    pub fn elapsed_secs(&self) -> u64 {
        self.ticks * self.cfg.sample_interval_secs
    }

    pub fn underlying_volume(&self) -> &History<f64> {
        &self.underlying_volume
    }

    pub fn option_volume(&self) -> &History<Vec<f64>> {
        &self.option_volume
    }

    pub fn option_delta(&self) -> &History<Vec<f64>> {
        &self.option_delta
    }

    pub fn open_interest(&self) -> &History<Vec<f64>> {
        &self.open_interest
    }

    pub fn hedge_flow_series(&self) -> &History<f64> {
        &self.hedge_flow
    }

    pub fn open_interest_estimates(&self) -> &[f64] {
        self.tracker.estimates()
    }

    /// Open interest as last seeded or refreshed from the feed, before any
    /// volume ratcheting. Unusual-volume signals compare against this.
    pub fn open_interest_seeded(&self) -> &[f64] {
        self.tracker.seeded()
    }

    /// Total put open interest over total call open interest, for the header.
    pub fn put_call_oi_ratio(&self) -> f64 {
        let puts: f64 = masked_sum(self.tracker.estimates(), &self.put_mask, true);
        let calls: f64 = masked_sum(self.tracker.estimates(), &self.put_mask, false);
        puts / calls
    }
}

/// Sum of `values[i]` where `mask[i] == keep`.
pub(crate) fn masked_sum(values: &[f64], mask: &[bool], keep: bool) -> f64 {
    values
        .iter()
        .zip(mask)
        .filter(|(_, m)| **m == keep)
        .map(|(v, _)| *v)
        .sum()
}

/// Select `values[i]` where `mask[i] == keep`.
pub(crate) fn masked<T: Copy>(values: &[T], mask: &[bool], keep: bool) -> Vec<T> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, m)| **m == keep)
        .map(|(v, _)| *v)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::ingest::{OptionQuote, UnderlyingQuote};
    use super::*;

    fn batch(volumes: &[f64], deltas: &[Option<f64>], underlying_volume: f64) -> TickBatch {
        TickBatch {
            underlying: UnderlyingQuote {
                volume: underlying_volume,
                last_price: 100.0,
            },
            options: volumes
                .iter()
                .zip(deltas)
                .map(|(v, d)| OptionQuote {
                    volume: Some(*v),
                    delta: *d,
                    put_open_interest: Some(8.0),
                    call_open_interest: Some(15.0),
                })
                .collect(),
        }
    }

    fn two_instrument_engine() -> FlowEngine {
        // One put, one call at the same strike
        let first = batch(&[10.0, 20.0], &[Some(-0.4), Some(0.5)], 500.0);
        let cfg = EngineConfig {
            sample_interval_secs: 2,
            session_secs: 120,
            oi_refresh_secs: 60,
        };
        FlowEngine::seed(cfg, vec![true, false], &first)
    }

    #[test]
    fn test_seed_establishes_baseline() {
        let engine = two_instrument_engine();
        assert_eq!(engine.baseline().volumes, vec![10.0, 20.0]);
        assert_eq!(engine.baseline().open_interest, vec![8.0, 15.0]);
        assert_eq!(engine.baseline().underlying_volume, 500.0);
        assert_eq!(engine.option_volume().len(), 61);
    }

    #[test]
    fn test_volume_exceeding_estimate_ratchets_open_interest() {
        let mut engine = two_instrument_engine();
        let outcome = engine.apply(&batch(&[30.0, 25.0], &[Some(-0.4), Some(0.5)], 600.0));

        // Volume revealed a higher lower bound on open interest for both
        assert_eq!(engine.open_interest().head(), &vec![30.0, 25.0]);
        assert!(outcome.missing_delta.is_empty());
    }

    #[test]
    fn test_tick_rotation_order() {
        let mut engine = two_instrument_engine();
        engine.apply(&batch(&[11.0, 21.0], &[Some(-0.4), Some(0.5)], 510.0));
        engine.apply(&batch(&[12.0, 22.0], &[Some(-0.3), Some(0.6)], 520.0));

        assert_eq!(engine.option_volume().head(), &vec![12.0, 22.0]);
        assert_eq!(engine.option_volume().at_index(1), &vec![11.0, 21.0]);
        assert_eq!(engine.option_volume().at_index(2), &vec![10.0, 20.0]);
    }

    #[test]
    fn test_hedge_flow_pushed_every_tick() {
        let mut engine = two_instrument_engine();
        // No delta change: flow 0
        engine.apply(&batch(&[10.0, 20.0], &[Some(-0.4), Some(0.5)], 500.0));
        assert_eq!(*engine.hedge_flow_series().head(), 0.0);

        // Volume already ratcheted open interest to 10/20, so:
        // (0.1 * 10 + 0.1 * 20) * 100 = 300
        engine.apply(&batch(&[10.0, 20.0], &[Some(-0.3), Some(0.6)], 500.0));
        assert!((engine.hedge_flow_series().head() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_delta_surfaced() {
        let mut engine = two_instrument_engine();
        let outcome = engine.apply(&batch(&[10.0, 20.0], &[None, Some(0.5)], 500.0));
        assert_eq!(outcome.missing_delta, vec![0]);
        // Substituted with 0, not faulted
        assert_eq!(engine.option_delta().head(), &vec![0.0, 0.5]);
    }

    #[test]
    fn test_refresh_cadence() {
        let mut engine = two_instrument_engine();
        // 2s interval, 60s refresh: tick 30 is the first refresh
        for tick in 1..=30u64 {
            let outcome = engine.apply(&batch(&[10.0, 20.0], &[Some(-0.4), Some(0.5)], 500.0));
            assert_eq!(outcome.refreshed_open_interest, tick == 30);
        }
    }

    #[test]
    fn test_refresh_overrides_ratchet() {
        let mut engine = two_instrument_engine();
        // Ratchet the put estimate up to 40 via volume, then drive to the
        // refresh tick. The feed still reports 8/15, so the refresh re-seeds
        // the estimate downward, overriding the ratchet.
        for _ in 0..30 {
            engine.apply(&batch(&[40.0, 20.0], &[Some(-0.4), Some(0.5)], 500.0));
        }
        assert_eq!(engine.open_interest().head()[0], 40.0);
        assert_eq!(engine.open_interest_estimates()[0], 8.0);

        // The next tick's volume immediately reveals the same lower bound
        engine.apply(&batch(&[40.0, 20.0], &[Some(-0.4), Some(0.5)], 500.0));
        assert_eq!(engine.open_interest().head()[0], 40.0);
    }

    #[test]
    fn test_put_call_oi_ratio() {
        let engine = two_instrument_engine();
        assert!((engine.put_call_oi_ratio() - 8.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_masked_helpers() {
        let mask = vec![true, false, true];
        assert_eq!(masked_sum(&[1.0, 2.0, 4.0], &mask, true), 5.0);
        assert_eq!(masked(&[1.0, 2.0, 4.0], &mask, false), vec![2.0]);
    }
}
