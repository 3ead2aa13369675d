//! Instrument universe construction.
//!
//! The universe is resolved once at startup from the bridge's option chain:
//! strikes filtered by the CLI range, one expiration selected by index, puts
//! first then calls so every per-tick series shares the same instrument
//! order for the whole run.

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Right {
    Put,
    Call,
}

impl Right {
    pub fn suffix(&self) -> &'static str {
        match self {
            Right::Put => "P",
            Right::Call => "C",
        }
    }

    pub fn is_put(&self) -> bool {
        matches!(self, Right::Put)
    }
}

impl std::fmt::Display for Right {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// One tracked option contract. Immutable after universe construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionInstrument {
    pub symbol: String,
    pub strike: f64,
    pub right: Right,
    pub expiration: String,
}

impl OptionInstrument {
    /// Display label, e.g. `450P` or `102.5C`.
    pub fn label(&self) -> String {
        format!("{}{}", format_strike(self.strike), self.right.suffix())
    }
}

/// Format a strike without a trailing `.0` for whole-number strikes.
pub fn format_strike(strike: f64) -> String {
    if strike.fract() == 0.0 {
        format!("{strike:.0}")
    } else {
        format!("{strike}")
    }
}

/// Strike admission filter: keep strikes within `[min, max]` that are whole
/// multiples of `step_modulus`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeFilter {
    pub min: f64,
    pub max: f64,
    pub step_modulus: f64,
}

impl StrikeFilter {
    /// Parse the CLI form `"min,max,modulus"`.
    pub fn parse(raw: &str) -> Result<Self, MonitorError> {
        let parts: Vec<f64> = raw
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| MonitorError::Config(format!("strike filter {raw:?}: {e}")))?;
        match parts.as_slice() {
            [min, max, step_modulus] if step_modulus > &0.0 => Ok(Self {
                min: *min,
                max: *max,
                step_modulus: *step_modulus,
            }),
            [_, _, _] => Err(MonitorError::Config(format!(
                "strike filter {raw:?}: modulus must be positive"
            ))),
            _ => Err(MonitorError::Config(format!(
                "strike filter {raw:?}: expected min,max,modulus"
            ))),
        }
    }

    pub fn admits(&self, strike: f64) -> bool {
        strike >= self.min
            && strike <= self.max
            && (strike % self.step_modulus).abs() < 1e-9
    }
}

/// A resolved option chain for one underlying, as served by the bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionChain {
    pub underlying: String,
    pub strikes: Vec<f64>,
    pub expirations: Vec<String>,
}

/// The full tracked contract set, partitioned puts-then-calls.
#[derive(Debug, Clone)]
pub struct Universe {
    pub underlying: String,
    pub expiration: String,
    pub instruments: Vec<OptionInstrument>,
    /// True at index i when `instruments[i]` is a put.
    pub put_mask: Vec<bool>,
    /// Strikes shared by both sides, ascending. One chart row per entry.
    pub strike_axis: Vec<f64>,
}

impl Universe {
    /// Build the contract set from a resolved chain: filter strikes, select
    /// one expiration by index into the sorted expiration list, and emit one
    /// put and one call per surviving strike.
    pub fn build(
        chain: &OptionChain,
        filter: &StrikeFilter,
        expiration_index: usize,
    ) -> Result<Self, MonitorError> {
        let mut strikes: Vec<f64> = chain
            .strikes
            .iter()
            .copied()
            .filter(|s| filter.admits(*s))
            .collect();
        strikes.sort_by(|a, b| a.total_cmp(b));
        strikes.dedup();

        if strikes.is_empty() {
            return Err(MonitorError::Chain {
                symbol: chain.underlying.clone(),
                reason: "no strikes admitted by filter".into(),
            });
        }

        let mut expirations = chain.expirations.clone();
        expirations.sort();
        let expiration = expirations
            .get(expiration_index)
            .cloned()
            .ok_or_else(|| MonitorError::Chain {
                symbol: chain.underlying.clone(),
                reason: format!(
                    "expiration index {expiration_index} out of range ({} available)",
                    expirations.len()
                ),
            })?;

        let mut instruments = Vec::with_capacity(strikes.len() * 2);
        for right in [Right::Put, Right::Call] {
            for strike in &strikes {
                instruments.push(OptionInstrument {
                    symbol: chain.underlying.clone(),
                    strike: *strike,
                    right,
                    expiration: expiration.clone(),
                });
            }
        }
        let put_mask = instruments.iter().map(|i| i.right.is_put()).collect();

        Ok(Self {
            underlying: chain.underlying.clone(),
            expiration,
            instruments,
            put_mask,
            strike_axis: strikes,
        })
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.instruments.iter().map(OptionInstrument::label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> OptionChain {
        OptionChain {
            underlying: "SPY".into(),
            strikes: vec![447.5, 448.0, 449.0, 450.0, 451.0, 452.5, 455.0],
            expirations: vec!["20260918".into(), "20260821".into()],
        }
    }

    #[test]
    fn test_strike_filter_parse() {
        let filter = StrikeFilter::parse("50,800,1").unwrap();
        assert_eq!(
            filter,
            StrikeFilter {
                min: 50.0,
                max: 800.0,
                step_modulus: 1.0
            }
        );

        assert!(StrikeFilter::parse("50,800").is_err());
        assert!(StrikeFilter::parse("a,b,c").is_err());
        assert!(StrikeFilter::parse("50,800,0").is_err());
    }

    #[test]
    fn test_strike_filter_admission() {
        let filter = StrikeFilter::parse("448,452,1").unwrap();
        assert!(filter.admits(450.0));
        assert!(!filter.admits(447.5)); // below min
        assert!(!filter.admits(452.5)); // fractional, fails modulus
        assert!(!filter.admits(455.0)); // above max

        let fives = StrikeFilter::parse("0,1000,5").unwrap();
        assert!(fives.admits(450.0));
        assert!(!fives.admits(452.0));
    }

    #[test]
    fn test_universe_partition_and_order() {
        let filter = StrikeFilter::parse("448,452,1").unwrap();
        let universe = Universe::build(&chain(), &filter, 0).unwrap();

        // Sorted expirations: 20260821 < 20260918
        assert_eq!(universe.expiration, "20260821");
        assert_eq!(universe.strike_axis, vec![448.0, 449.0, 450.0, 451.0]);

        // Puts first, then calls, same strike order on both sides
        assert_eq!(universe.len(), 8);
        assert_eq!(
            universe.put_mask,
            [true, true, true, true, false, false, false, false]
        );
        assert_eq!(universe.instruments[0].label(), "448P");
        assert_eq!(universe.instruments[4].label(), "448C");
    }

    #[test]
    fn test_fractional_strike_label() {
        let instrument = OptionInstrument {
            symbol: "SPY".into(),
            strike: 102.5,
            right: Right::Call,
            expiration: "20260821".into(),
        };
        assert_eq!(instrument.label(), "102.5C");
    }

    #[test]
    fn test_empty_filter_is_an_error() {
        let filter = StrikeFilter::parse("900,1000,1").unwrap();
        assert!(Universe::build(&chain(), &filter, 0).is_err());
    }

    #[test]
    fn test_expiration_index_out_of_range() {
        let filter = StrikeFilter::parse("448,452,1").unwrap();
        let err = Universe::build(&chain(), &filter, 5).unwrap_err();
        assert!(err.to_string().contains("expiration index"));
    }
}
