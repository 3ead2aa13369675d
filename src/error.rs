//! Errors surfaced by the monitor.

use thiserror::Error;

/// All errors generated by the monitor outside the analytics core. Missing
/// feed data and division-by-zero ratios are deliberately not represented
/// here; they are substituted or propagated as values, not faults.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to connect to bridge: {0}")]
    Connect(String),

    #[error("bridge protocol error: {0}")]
    Protocol(String),

    #[error("bridge connection lost: {0}")]
    ConnectionLost(String),

    #[error("option chain unavailable for {symbol}: {reason}")]
    Chain { symbol: String, reason: String },

    #[error("warm-up read produced no data for {symbol}")]
    WarmUpEmpty { symbol: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Whether the error must tear the loop down through the shutdown path.
    /// Everything feed-related is fatal; there are no in-core retries.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MonitorError::Config(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for MonitorError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::ConnectionLost(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(MonitorError::Connect("refused".into()).is_fatal());
        assert!(MonitorError::ConnectionLost("eof".into()).is_fatal());
        assert!(!MonitorError::Config("bad strike filter".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = MonitorError::Chain {
            symbol: "SPY".into(),
            reason: "no expirations".into(),
        };
        assert_eq!(
            err.to_string(),
            "option chain unavailable for SPY: no expirations"
        );
    }
}
