//! Market-data collaborator: bridge protocol, client task, and the
//! latest-value snapshot store the sampling loop reads from.

pub mod client;
pub mod types;

use std::collections::HashMap;

use self::types::BridgeMessage;
use crate::engine::ingest::{OptionQuote, TickBatch, UnderlyingQuote};
use crate::universe::Universe;

/// Latest known values for every tracked instrument.
///
/// The client task is the only writer; the sampling loop clones one
/// [`TickBatch`] per tick. A feed update that never arrives simply leaves the
/// previous values in place (stale-but-valid), so a tick never fails on a
/// missed update.
#[derive(Debug)]
pub struct SnapshotStore {
    underlying: UnderlyingQuote,
    options: Vec<OptionQuote>,
    seen: Vec<bool>,
    index: HashMap<String, usize>,
}

impl SnapshotStore {
    pub fn new(universe: &Universe) -> Self {
        let index = universe
            .labels()
            .into_iter()
            .enumerate()
            .map(|(idx, label)| (label, idx))
            .collect();
        Self {
            underlying: UnderlyingQuote::default(),
            options: vec![OptionQuote::default(); universe.len()],
            seen: vec![false; universe.len()],
            index,
        }
    }

    /// Fold one bridge message into the latest-value state. Fields absent
    /// from the message keep their previous value.
    pub fn apply(&mut self, message: &BridgeMessage) {
        match message {
            BridgeMessage::OptionTick {
                contract,
                volume,
                delta,
                put_open_interest,
                call_open_interest,
            } => {
                let Some(&idx) = self.index.get(contract.as_str()) else {
                    return;
                };
                let quote = &mut self.options[idx];
                merge(&mut quote.volume, *volume);
                merge(&mut quote.delta, *delta);
                merge(&mut quote.put_open_interest, *put_open_interest);
                merge(&mut quote.call_open_interest, *call_open_interest);
                self.seen[idx] = true;
            }
            BridgeMessage::UnderlyingTick { volume, last, .. } => {
                self.underlying.volume = *volume;
                self.underlying.last_price = *last;
            }
            _ => {}
        }
    }

    /// Copy of the current state for one tick of the engine.
    pub fn batch(&self) -> TickBatch {
        TickBatch {
            underlying: self.underlying,
            options: self.options.clone(),
        }
    }

    /// (instruments with at least one update, total instruments).
    pub fn coverage(&self) -> (usize, usize) {
        (
            self.seen.iter().filter(|s| **s).count(),
            self.seen.len(),
        )
    }

    /// Warm enough to seed the engine: every instrument has reported.
    pub fn is_warm(&self) -> bool {
        let (seen, total) = self.coverage();
        seen == total
    }
}

fn merge(slot: &mut Option<f64>, update: Option<f64>) {
    if update.is_some() {
        *slot = update;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::{OptionChain, StrikeFilter};

    fn universe() -> Universe {
        let chain = OptionChain {
            underlying: "SPY".into(),
            strikes: vec![449.0, 450.0],
            expirations: vec!["20260821".into()],
        };
        Universe::build(&chain, &StrikeFilter::parse("0,1000,1").unwrap(), 0).unwrap()
    }

    fn option_tick(contract: &str, volume: Option<f64>, delta: Option<f64>) -> BridgeMessage {
        BridgeMessage::OptionTick {
            contract: contract.into(),
            volume,
            delta,
            put_open_interest: None,
            call_open_interest: None,
        }
    }

    #[test]
    fn test_updates_land_on_the_right_instrument() {
        let mut store = SnapshotStore::new(&universe());
        store.apply(&option_tick("450P", Some(33.0), Some(-0.4)));
        store.apply(&BridgeMessage::UnderlyingTick {
            symbol: "SPY".into(),
            volume: 9_000.0,
            last: 449.7,
        });

        let batch = store.batch();
        // Universe order: 449P, 450P, 449C, 450C
        assert_eq!(batch.options[1].volume, Some(33.0));
        assert_eq!(batch.options[0].volume, None);
        assert_eq!(batch.underlying.last_price, 449.7);
    }

    #[test]
    fn test_partial_update_keeps_previous_values() {
        let mut store = SnapshotStore::new(&universe());
        store.apply(&option_tick("450P", Some(33.0), Some(-0.4)));
        // Coalesced update without delta: volume advances, delta survives
        store.apply(&option_tick("450P", Some(40.0), None));

        let batch = store.batch();
        assert_eq!(batch.options[1].volume, Some(40.0));
        assert_eq!(batch.options[1].delta, Some(-0.4));
    }

    #[test]
    fn test_unknown_contract_ignored() {
        let mut store = SnapshotStore::new(&universe());
        store.apply(&option_tick("999C", Some(1.0), None));
        assert_eq!(store.coverage(), (0, 4));
    }

    #[test]
    fn test_warmth_requires_full_coverage() {
        let mut store = SnapshotStore::new(&universe());
        for contract in ["449P", "450P", "449C"] {
            store.apply(&option_tick(contract, Some(1.0), None));
        }
        assert!(!store.is_warm());
        store.apply(&option_tick("450C", Some(1.0), None));
        assert!(store.is_warm());
    }
}
