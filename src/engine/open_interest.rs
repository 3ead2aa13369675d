//! Best-known open-interest estimate per instrument.
//!
//! Open interest is not observable intraday. The tracker seeds each estimate
//! from the feed's reported value at startup, ratchets it up whenever traded
//! volume reveals a higher lower bound, and re-seeds from a fresh feed read on
//! a fixed wall-clock cadence.

/// Open-interest fields as reported by the feed for one instrument.
///
/// Feeds report open interest for both rights on any option ticker, so the
/// opposite right's value is available as a fallback when the instrument's
/// own value is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportedOpenInterest {
    /// Open interest for the instrument's own right.
    pub own: Option<f64>,
    /// Open interest reported for the opposite right at the same strike.
    pub opposite: Option<f64>,
}

impl ReportedOpenInterest {
    /// Resolve to a usable estimate: own value if present and nonzero, else
    /// the opposite right's, else 1.0. Never 0, so downstream ratios are safe
    /// to divide.
    fn resolve(&self) -> f64 {
        match (nonzero(self.own), nonzero(self.opposite)) {
            (Some(own), _) => own,
            (None, Some(other)) => other,
            (None, None) => 1.0,
        }
    }
}

fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

/// Per-instrument open-interest estimates, index-aligned with the instrument
/// universe.
///
/// Two views are kept: the `seeded` value as last reported by the feed, and
/// the ratcheted `estimates` that track the best-known lower bound. Signals
/// that ask "is volume unusual against open interest" compare against the
/// seeded value; the history rows carry the ratcheted one.
#[derive(Debug, Clone)]
pub struct OpenInterestTracker {
    seeded: Vec<f64>,
    estimates: Vec<f64>,
}

impl OpenInterestTracker {
    /// Seed estimates from the warm-up feed read. Runs once at startup.
    pub fn seed(raw: &[ReportedOpenInterest]) -> Self {
        let seeded: Vec<f64> = raw.iter().map(ReportedOpenInterest::resolve).collect();
        Self {
            estimates: seeded.clone(),
            seeded,
        }
    }

    /// Ratchet estimates up from traded volume: cumulative volume can only
    /// reveal a lower bound on true open interest, so between refreshes the
    /// estimate is monotonically non-decreasing.
    pub fn update_from_volume(&mut self, volumes: &[f64]) {
        for (estimate, volume) in self.estimates.iter_mut().zip(volumes) {
            if *volume > *estimate {
                *estimate = *volume;
            }
        }
    }

    /// Re-seed from a fresh feed read, overriding the volume-driven ratchet.
    /// Called once per refresh interval of elapsed loop time.
    pub fn periodic_refresh(&mut self, raw: &[ReportedOpenInterest]) {
        for ((seeded, estimate), reported) in
            self.seeded.iter_mut().zip(&mut self.estimates).zip(raw)
        {
            *seeded = reported.resolve();
            *estimate = *seeded;
        }
    }

    /// Current ratcheted estimate vector, index-aligned with the universe.
    pub fn estimates(&self) -> &[f64] {
        &self.estimates
    }

    /// Open interest as last seeded or refreshed from the feed, before any
    /// volume ratcheting.
    pub fn seeded(&self) -> &[f64] {
        &self.seeded
    }

    /// Estimates for the instruments selected by `mask`.
    pub fn side(&self, mask: &[bool], keep: bool) -> Vec<f64> {
        self.estimates
            .iter()
            .zip(mask)
            .filter(|(_, m)| **m == keep)
            .map(|(v, _)| *v)
            .collect()
    }
}
