//! Converts one raw feed batch into the per-series values to insert.
//!
//! Missing data is not an error here: absent volume becomes 0, absent delta
//! becomes 0 with the instrument index collected into a warning list that the
//! frame displays.

use serde::{Deserialize, Serialize};

use super::open_interest::ReportedOpenInterest;

/// Latest known quote for the underlying.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UnderlyingQuote {
    /// Feed-cumulative traded volume.
    pub volume: f64,
    /// Last traded price.
    pub last_price: f64,
}

/// Latest known quote for one option instrument.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Feed-cumulative traded volume.
    pub volume: Option<f64>,
    /// Model delta supplied by the feed, when available.
    pub delta: Option<f64>,
    /// Put open interest as last reported by the feed.
    pub put_open_interest: Option<f64>,
    /// Call open interest as last reported by the feed.
    pub call_open_interest: Option<f64>,
}

/// One batch sampled from the feed for a single tick, index-aligned with the
/// instrument universe.
#[derive(Debug, Clone, Default)]
pub struct TickBatch {
    pub underlying: UnderlyingQuote,
    pub options: Vec<OptionQuote>,
}

impl TickBatch {
    /// Raw open-interest fields per instrument, for seeding and refresh.
    /// `is_put` selects which reported side is the instrument's own.
    pub fn reported_open_interest(&self, put_mask: &[bool]) -> Vec<ReportedOpenInterest> {
        self.options
            .iter()
            .zip(put_mask)
            .map(|(quote, is_put)| {
                if *is_put {
                    ReportedOpenInterest {
                        own: quote.put_open_interest,
                        opposite: quote.call_open_interest,
                    }
                } else {
                    ReportedOpenInterest {
                        own: quote.call_open_interest,
                        opposite: quote.put_open_interest,
                    }
                }
            })
            .collect()
    }
}

/// Sanitized per-series values for one tick.
#[derive(Debug, Clone, Default)]
pub struct TickValues {
    /// Cumulative volume per instrument, missing/NaN mapped to 0.
    pub volumes: Vec<f64>,
    /// Delta per instrument, missing mapped to 0.
    pub deltas: Vec<f64>,
    /// Indices of instruments whose delta was unavailable this tick.
    pub missing_delta: Vec<usize>,
    pub underlying_volume: f64,
    pub underlying_price: f64,
}

/// Sanitize one raw batch into insertable values.
pub fn sanitize(batch: &TickBatch) -> TickValues {
    let mut volumes = Vec::with_capacity(batch.options.len());
    let mut deltas = Vec::with_capacity(batch.options.len());
    let mut missing_delta = Vec::new();

    for (idx, quote) in batch.options.iter().enumerate() {
        volumes.push(finite_or_zero(quote.volume));
        match quote.delta.filter(|d| d.is_finite()) {
            Some(delta) => deltas.push(delta),
            None => {
                deltas.push(0.0);
                missing_delta.push(idx);
            }
        }
    }

    TickValues {
        volumes,
        deltas,
        missing_delta,
        underlying_volume: finite_or_zero(Some(batch.underlying.volume)),
        underlying_price: batch.underlying.last_price,
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values_substituted_not_faulted() {
        let batch = TickBatch {
            underlying: UnderlyingQuote {
                volume: 1_000.0,
                last_price: 451.2,
            },
            options: vec![
                OptionQuote {
                    volume: Some(30.0),
                    delta: Some(-0.4),
                    ..Default::default()
                },
                OptionQuote {
                    volume: None,
                    delta: None,
                    ..Default::default()
                },
                OptionQuote {
                    volume: Some(f64::NAN),
                    delta: Some(f64::NAN),
                    ..Default::default()
                },
            ],
        };

        let values = sanitize(&batch);
        assert_eq!(values.volumes, vec![30.0, 0.0, 0.0]);
        assert_eq!(values.deltas, vec![-0.4, 0.0, 0.0]);
        assert_eq!(values.missing_delta, vec![1, 2]);
        assert_eq!(values.underlying_volume, 1_000.0);
    }

    #[test]
    fn test_reported_open_interest_follows_right() {
        let batch = TickBatch {
            underlying: UnderlyingQuote::default(),
            options: vec![
                OptionQuote {
                    put_open_interest: Some(11.0),
                    call_open_interest: Some(22.0),
                    ..Default::default()
                },
                OptionQuote {
                    put_open_interest: Some(11.0),
                    call_open_interest: Some(22.0),
                    ..Default::default()
                },
            ],
        };

        let raw = batch.reported_open_interest(&[true, false]);
        assert_eq!(raw[0].own, Some(11.0));
        assert_eq!(raw[0].opposite, Some(22.0));
        assert_eq!(raw[1].own, Some(22.0));
        assert_eq!(raw[1].opposite, Some(11.0));
    }
}
