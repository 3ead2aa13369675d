//! Trailing-window reporting over the engine's buffers.
//!
//! A report diffs the newest sample against the sample one window-length ago
//! (or against the session-start baseline for the intraday window) and splits
//! the result by put/call side. Pure reads; the reporter never mutates the
//! engine.

use super::hedge_flow;
use super::{masked_sum, FlowEngine};

/// A fixed look-back horizon. `offset_secs: None` means "since session
/// start".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingWindow {
    pub label: String,
    pub offset_secs: Option<u64>,
}

impl TrailingWindow {
    pub fn intraday(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            offset_secs: None,
        }
    }

    pub fn minutes(minutes: u64) -> Self {
        Self {
            label: format!("{minutes} min"),
            offset_secs: Some(minutes * 60),
        }
    }

    /// The default window set: intraday plus 15/10/5/3/1 minutes.
    pub fn defaults() -> Vec<Self> {
        let mut windows = vec![Self::intraday("intraday")];
        windows.extend([15, 10, 5, 3, 1].map(Self::minutes));
        windows
    }
}

/// One formatted-ready line of windowed signals.
///
/// `volume_ratio` is put over call volume delta and is allowed to be ±inf or
/// NaN when the call side saw no volume; display code formats it defensively.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    pub label: String,
    pub put_volume_delta: f64,
    pub call_volume_delta: f64,
    pub volume_ratio: f64,
    pub put_oi_delta: f64,
    pub call_oi_delta: f64,
    pub hedge_flow: f64,
    pub underlying_volume_delta: f64,
}

/// Read-only view over a [`FlowEngine`] producing [`WindowReport`]s.
pub struct WindowReporter<'a> {
    engine: &'a FlowEngine,
}

impl<'a> WindowReporter<'a> {
    pub fn new(engine: &'a FlowEngine) -> Self {
        Self { engine }
    }

    pub fn report_all(&self, windows: &[TrailingWindow]) -> Vec<WindowReport> {
        windows.iter().map(|w| self.report(w)).collect()
    }

    pub fn report(&self, window: &TrailingWindow) -> WindowReport {
        let engine = self.engine;
        let mask = engine.put_mask();
        let volume_now = engine.option_volume().head();
        let oi_now = engine.open_interest().head();

        let (volume_base, oi_base, hedge_flow, underlying_base): (&[f64], &[f64], f64, f64) =
            match window.offset_secs {
                None => (
                    &engine.baseline().volumes,
                    &engine.baseline().open_interest,
                    hedge_flow::session_flow(engine.option_delta().head(), oi_now),
                    engine.baseline().underlying_volume,
                ),
                Some(offset_secs) => {
                    let idx = engine.option_volume().index_of(offset_secs);
                    (
                        engine.option_volume().at_index(idx),
                        engine.open_interest().at_index(idx),
                        hedge_flow::windowed_flow(
                            engine.hedge_flow_series(),
                            idx,
                            engine.config().sample_interval_secs,
                        ),
                        *engine.underlying_volume().at_index(idx),
                    )
                }
            };

        let volume_delta: Vec<f64> = volume_now
            .iter()
            .zip(volume_base)
            .map(|(now, base)| now - base)
            .collect();
        let oi_delta: Vec<f64> = oi_now
            .iter()
            .zip(oi_base)
            .map(|(now, base)| now - base)
            .collect();

        let put_volume_delta = masked_sum(&volume_delta, mask, true);
        let call_volume_delta = masked_sum(&volume_delta, mask, false);

        WindowReport {
            label: window.label.clone(),
            put_volume_delta,
            call_volume_delta,
            volume_ratio: put_volume_delta / call_volume_delta,
            put_oi_delta: masked_sum(&oi_delta, mask, true),
            call_oi_delta: masked_sum(&oi_delta, mask, false),
            hedge_flow,
            underlying_volume_delta: *engine.underlying_volume().head() - underlying_base,
        }
    }
}
