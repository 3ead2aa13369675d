//! Wire types for the broker-bridge WebSocket protocol.
//!
//! The bridge multiplexes one broker session across local consumers and
//! speaks tagged JSON messages in both directions.

use serde::{Deserialize, Serialize};

use crate::universe::{OptionInstrument, Right};

/// Messages from the bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    #[serde(rename = "welcome")]
    Welcome {
        #[serde(default)]
        message: Option<String>,
    },
    /// Resolved option chain for an underlying, answering a chain request.
    #[serde(rename = "chain")]
    Chain {
        underlying: String,
        strikes: Vec<f64>,
        expirations: Vec<String>,
    },
    /// Latest values for one subscribed option contract. Fields the broker
    /// has not produced yet are omitted.
    #[serde(rename = "option")]
    OptionTick {
        contract: String,
        #[serde(default)]
        volume: Option<f64>,
        #[serde(default)]
        delta: Option<f64>,
        #[serde(default)]
        put_open_interest: Option<f64>,
        #[serde(default)]
        call_open_interest: Option<f64>,
    },
    /// Latest trade state for the underlying.
    #[serde(rename = "underlying")]
    UnderlyingTick {
        symbol: String,
        volume: f64,
        last: f64,
    },
    #[serde(rename = "status")]
    Status {
        #[serde(default)]
        connected: Option<bool>,
    },
}

/// Requests to the bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum BridgeRequest {
    #[serde(rename = "chain")]
    Chain { underlying: String },
    #[serde(rename = "subscribe")]
    Subscribe {
        underlying: String,
        contracts: Vec<ContractSpec>,
    },
    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        underlying: String,
        contracts: Vec<ContractSpec>,
    },
}

/// Contract identity as the bridge addresses it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContractSpec {
    pub symbol: String,
    pub strike: f64,
    pub right: Right,
    pub expiration: String,
    /// Key the bridge echoes back on every option tick.
    pub contract: String,
}

impl From<&OptionInstrument> for ContractSpec {
    fn from(instrument: &OptionInstrument) -> Self {
        Self {
            symbol: instrument.symbol.clone(),
            strike: instrument.strike,
            right: instrument.right,
            expiration: instrument.expiration.clone(),
            contract: instrument.label(),
        }
    }
}
