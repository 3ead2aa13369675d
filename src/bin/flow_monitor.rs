/// Live options-flow monitor.
///
/// Resolves the option chain, subscribes the strike matrix through the
/// broker bridge, then samples the feed at a fixed interval: each tick
/// updates the windowed analytics engine and redraws the frame. Quitting,
/// Ctrl-C, and feed failure all leave through the same shutdown path, which
/// unsubscribes every contract before releasing the connection.
use std::{
    error::Error,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::Mutex;
use tracing::{info, warn};

use options_flow_tui::{
    config::Cli,
    engine::{report::TrailingWindow, signals},
    feed::{self, client::ConnectionStatus, SnapshotStore},
    ui::{self, FrameData},
    universe::{format_strike, Universe},
    BridgeConfig, FlowEngine, MonitorError, WindowReporter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let cli = Cli::parse();
    let engine_cfg = cli.engine_config()?;
    let filter = cli.strike_filter()?;
    let bridge_cfg = BridgeConfig::new(cli.bridge_url());

    // INIT: resolve the universe
    info!("resolving option chain for {}", cli.symbol);
    let chain = feed::client::fetch_chain(&bridge_cfg.url, &cli.symbol).await?;
    let universe = Universe::build(&chain, &filter, cli.expiry)?;
    info!(
        "chain offered {} strikes, tracking {} contracts expiring {}",
        chain.strikes.len(),
        universe.len(),
        universe.expiration
    );

    let store = Arc::new(Mutex::new(SnapshotStore::new(&universe)));
    let feed_handle = feed::client::spawn(bridge_cfg.clone(), &universe, Arc::clone(&store));

    // SEEDED: warm-up read establishing baseline open interest
    info!("warming up, waiting for first snapshots");
    let (seen, total) = feed::client::warm_up(&store, bridge_cfg.warm_up).await;
    if seen == 0 {
        feed_handle.shutdown().await;
        return Err(MonitorError::WarmUpEmpty {
            symbol: cli.symbol.clone(),
        }
        .into());
    }
    if seen < total {
        warn!("warm-up incomplete: {seen}/{total} instruments reporting");
    }

    let first = store.lock().await.batch();
    let mut engine = FlowEngine::seed(engine_cfg, universe.put_mask.clone(), &first);

    let session_start = Local::now();
    let mut windows = cli.trailing_windows()?;
    windows[0].label = format!("Intra|{}", session_start.format("%I:%M:%S %p"));

    // Ctrl-C must be observable between ticks
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flag.store(true, Ordering::Relaxed);
            }
        });
    }

    // Restore the terminal even if a render panics
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("begin live reporting");
    let result = run_loop(
        &mut terminal,
        &mut engine,
        &universe,
        &windows,
        &store,
        &feed_handle,
        &interrupted,
        session_start,
    )
    .await;

    // SHUTTING_DOWN: runs for quit, Ctrl-C, and feed failure alike
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    feed_handle.shutdown().await;
    info!("live reporting stopped, bridge connection released");

    result.map_err(Into::into)
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: &mut FlowEngine,
    universe: &Universe,
    windows: &[TrailingWindow],
    store: &Arc<Mutex<SnapshotStore>>,
    feed_handle: &feed::client::FeedHandle,
    interrupted: &AtomicBool,
    session_start: chrono::DateTime<Local>,
) -> Result<(), MonitorError> {
    let interval = Duration::from_secs(engine.config().sample_interval_secs);
    let strike_labels: Vec<String> = universe
        .strike_axis
        .iter()
        .map(|s| format_strike(*s))
        .collect();
    let mut last_tick = Instant::now();

    loop {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                let ctrl_c = key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if key.code == KeyCode::Char('q') || key.code == KeyCode::Esc || ctrl_c {
                    return Ok(());
                }
            }
        }
        if interrupted.load(Ordering::Relaxed) {
            return Ok(());
        }
        if feed_handle.status() == ConnectionStatus::Failed {
            return Err(MonitorError::ConnectionLost(
                "reconnect budget exhausted".into(),
            ));
        }

        // POLL -> UPDATE -> REPORT, atomically with respect to rendering:
        // nothing else mutates the engine
        if last_tick.elapsed() >= interval {
            let batch = { store.lock().await.batch() };
            let outcome = engine.apply(&batch);

            let reports = WindowReporter::new(engine).report_all(windows);
            let frame_signals = signals::project(engine, &universe.strike_axis);
            let missing_delta: Vec<String> = outcome
                .missing_delta
                .iter()
                .map(|idx| universe.instruments[*idx].label())
                .collect();

            let frame = FrameData {
                underlying: &universe.underlying,
                expiration: &universe.expiration,
                signals: &frame_signals,
                reports: &reports,
                strike_labels: &strike_labels,
                missing_delta: &missing_delta,
                status: feed_handle.status(),
                session_start,
                elapsed_secs: engine.elapsed_secs(),
                put_call_oi_ratio: engine.put_call_oi_ratio(),
            };
            terminal.draw(|f| ui::draw(f, &frame))?;
            last_tick = Instant::now();
        }
    }
}

/// Logging is opt-in via RUST_LOG and goes to stderr so it can be redirected
/// away from the TUI.
fn init_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init();
    }
}
