//! CLI configuration surface.
//!
//! Everything the monitor needs at startup: the underlying, the strike
//! filter, the expiration selector, and the loop timing. The bridge URL can
//! also come from `BRIDGE_WS_URL`, matching how the rest of the deployment
//! is wired.

use clap::Parser;

use crate::engine::report::TrailingWindow;
use crate::engine::EngineConfig;
use crate::error::MonitorError;
use crate::universe::StrikeFilter;

pub const DEFAULT_BRIDGE_WS_URL: &str = "ws://127.0.0.1:8765/ws";

/// Live options-flow monitor: unusual volume and delta-hedging flow by strike.
#[derive(Debug, Parser)]
#[command(name = "flow-monitor", version)]
pub struct Cli {
    /// Underlying stock ticker
    #[arg(short = 's', long, default_value = "SPY")]
    pub symbol: String,

    /// Strike filter as "min,max,modulus": keep strikes in [min,max] that
    /// are whole multiples of modulus
    #[arg(short = 'o', long, default_value = "50,800,1")]
    pub strikes: String,

    /// Index into the sorted expiration list
    #[arg(short = 'c', long, default_value_t = 0)]
    pub expiry: usize,

    /// Seconds between samples
    #[arg(long, default_value_t = 2)]
    pub interval: u64,

    /// Session length in seconds the history must cover (one 6.5h trading day)
    #[arg(long, default_value_t = 23_400)]
    pub session: u64,

    /// Seconds between open-interest re-seeds from the feed
    #[arg(long, default_value_t = 60)]
    pub refresh: u64,

    /// Trailing windows in minutes, comma separated; the intraday window is
    /// always reported first
    #[arg(long, default_value = "15,10,5,3,1")]
    pub windows: String,

    /// Bridge WebSocket URL (falls back to BRIDGE_WS_URL, then the default)
    #[arg(long)]
    pub bridge_url: Option<String>,
}

impl Cli {
    pub fn engine_config(&self) -> Result<EngineConfig, MonitorError> {
        if self.interval == 0 {
            return Err(MonitorError::Config("interval must be positive".into()));
        }
        if self.session < self.interval {
            return Err(MonitorError::Config(
                "session must cover at least one sample interval".into(),
            ));
        }
        Ok(EngineConfig {
            sample_interval_secs: self.interval,
            session_secs: self.session,
            oi_refresh_secs: self.refresh.max(self.interval),
        })
    }

    pub fn strike_filter(&self) -> Result<StrikeFilter, MonitorError> {
        StrikeFilter::parse(&self.strikes)
    }

    pub fn trailing_windows(&self) -> Result<Vec<TrailingWindow>, MonitorError> {
        let mut windows = vec![TrailingWindow::intraday("intraday")];
        for part in self.windows.split(',').filter(|p| !p.trim().is_empty()) {
            let minutes: u64 = part
                .trim()
                .parse()
                .map_err(|e| MonitorError::Config(format!("window {part:?}: {e}")))?;
            windows.push(TrailingWindow::minutes(minutes));
        }
        Ok(windows)
    }

    pub fn bridge_url(&self) -> String {
        self.bridge_url
            .clone()
            .or_else(|| std::env::var("BRIDGE_WS_URL").ok())
            .unwrap_or_else(|| DEFAULT_BRIDGE_WS_URL.to_string())
    }
}
