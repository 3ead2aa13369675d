/// Options Flow TUI - Shared Library
///
/// Live options-market-flow monitoring for one underlying: per-strike
/// unusual-volume signals and a delta-hedging-flow estimate over several
/// trailing windows, rendered in the terminal.
///
/// The library splits into:
/// - Windowed analytics engine (rolling histories, open-interest tracking,
///   hedge-flow estimation, window reports, chart projection)
/// - Broker-bridge feed client and snapshot store
/// - Universe/config resolution and the ratatui frame
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ui;
pub mod universe;

// Re-export commonly used types for convenience
pub use engine::history::History;
pub use engine::ingest::{OptionQuote, TickBatch, UnderlyingQuote};
pub use engine::open_interest::{OpenInterestTracker, ReportedOpenInterest};
pub use engine::report::{TrailingWindow, WindowReport, WindowReporter};
pub use engine::signals::{ChartSeries, SignalFrame};
pub use engine::{EngineConfig, FlowEngine, TickOutcome};
pub use error::MonitorError;
pub use feed::client::{BridgeConfig, ConnectionStatus, FeedHandle};
pub use feed::SnapshotStore;
pub use universe::{OptionChain, OptionInstrument, Right, StrikeFilter, Universe};
