use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AnalystError, MarketDataError, RunError};
use crate::models::{ExecutionResult, Signal};
use crate::pipeline::{dispatcher, fusion, indicators, snapshot, synthesizer};
use crate::providers::{telegram, Analyst, MarketData, NotificationSink, OrderAdapter};

/// External collaborators the pipeline consumes, behind trait objects so
/// tests can swap in mocks.
#[derive(Clone)]
pub struct Collaborators {
    pub market_data: Arc<dyn MarketData>,
    pub analyst: Arc<dyn Analyst>,
    pub orders: Arc<dyn OrderAdapter>,
    pub notifier: Arc<dyn NotificationSink>,
}

/// Outcome of one symbol's run. A run either produces a Signal (possibly
/// no-action) plus its execution record, or an explicit error; never a
/// silent drop.
#[derive(Debug)]
pub struct RunReport {
    pub symbol: String,
    pub outcome: Result<(Signal, ExecutionResult), RunError>,
}

/// One full pipeline pass for one symbol: fetch → snapshot → indicators
/// → AI analysis → fusion → synthesis → dispatch.
///
/// All state is local to the call; concurrent runs over different
/// symbols share nothing mutable. The AI and exchange calls are wrapped
/// in the configured timeout.
pub async fn run_pipeline(
    symbol: String,
    cfg: Arc<Config>,
    collab: Collaborators,
) -> RunReport {
    let outcome = run_pipeline_inner(&symbol, &cfg, &collab).await;
    RunReport { symbol, outcome }
}

async fn run_pipeline_inner(
    symbol: &str,
    cfg: &Config,
    collab: &Collaborators,
) -> Result<(Signal, ExecutionResult), RunError> {
    let timeout = Duration::from_secs(cfg.request_timeout_secs);

    let raw_bars = tokio::time::timeout(
        timeout,
        collab.market_data.fetch(symbol, cfg.timeframe, cfg.lookback),
    )
    .await
    .map_err(|_| MarketDataError::Timeout(cfg.request_timeout_secs))??;

    let snap = snapshot::build(raw_bars, symbol, cfg.timeframe, cfg.indicators.min_bars())?;
    if snap.is_incomplete() {
        warn!(
            symbol,
            bars = snap.len(),
            "snapshot incomplete, computing partial indicator set"
        );
    }

    let set = indicators::compute(&snap, &cfg.indicators);

    let raw_rec = tokio::time::timeout(timeout, collab.analyst.analyze(&snap, &set))
        .await
        .map_err(|_| AnalystError::Timeout(cfg.request_timeout_secs))??;

    // A recommendation that fails validation becomes a documented
    // no-action verdict; the run still terminates with a Signal.
    let signal = match fusion::fuse(&set, &raw_rec, &cfg.risk) {
        Ok(decision) => synthesizer::synthesize(&decision, &cfg.risk),
        Err(e) => {
            warn!(symbol, "recommendation rejected: {e}");
            Signal::no_action(symbol, 0.0, e.to_string())
        }
    };

    let result = if signal.is_actionable() && !cfg.live_trading {
        ExecutionResult::Skipped {
            reason: "live trading disabled".to_string(),
        }
    } else {
        dispatcher::dispatch(&signal, collab.orders.as_ref(), &cfg.risk, timeout).await
    };

    Ok((signal, result))
}

pub struct SignalBot {
    config: Arc<Config>,
    collab: Collaborators,
}

impl SignalBot {
    pub fn new(config: Config, collab: Collaborators) -> Self {
        info!("{}", "=".repeat(60));
        info!("AI signal bot starting up");
        info!("Market: {}", config.market.as_str());
        info!("Symbols: {}", config.symbols.join(", "));
        info!(
            "Timeframe: {} | Lookback: {} bars | Scan every {}s",
            config.timeframe, config.lookback, config.scan_interval_secs
        );
        info!(
            "Mode: {}",
            if config.live_trading {
                "LIVE TRADING"
            } else {
                "SIGNALS ONLY"
            }
        );
        info!("{}", "=".repeat(60));

        Self {
            config: Arc::new(config),
            collab,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let startup = format!(
            "Bot started in {} mode, scanning {} symbol(s) every {}s",
            self.config.market.as_str(),
            self.config.symbols.len(),
            self.config.scan_interval_secs
        );
        if let Err(e) = self.collab.notifier.notify(&startup).await {
            warn!("startup notification failed: {e}");
        }

        info!("Bot is now running. Press Ctrl+C to stop.");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down...");
                    return Ok(());
                }
                _ = self.tick() => {}
            }
        }
    }

    /// One scan: every configured symbol runs as its own task, reports
    /// come back over a channel. One symbol failing never stops the
    /// batch.
    async fn tick(&self) {
        let (tx, mut rx) = mpsc::channel::<RunReport>(self.config.symbols.len().max(1));

        for symbol in &self.config.symbols {
            let tx = tx.clone();
            let cfg = Arc::clone(&self.config);
            let collab = self.collab.clone();
            let symbol = symbol.clone();
            tokio::spawn(async move {
                let report = run_pipeline(symbol, cfg, collab).await;
                // Receiver only drops on shutdown.
                let _ = tx.send(report).await;
            });
        }
        drop(tx);

        while let Some(report) = rx.recv().await {
            self.handle_report(report).await;
        }

        tokio::time::sleep(Duration::from_secs(self.config.scan_interval_secs)).await;
    }

    async fn handle_report(&self, report: RunReport) {
        let message = match &report.outcome {
            Ok((signal, result)) => {
                match signal.side {
                    Some(side) => info!(
                        symbol = %report.symbol,
                        %side,
                        confidence = signal.confidence,
                        "actionable signal: {}",
                        signal.rationale
                    ),
                    None => info!(
                        symbol = %report.symbol,
                        confidence = signal.confidence,
                        "no action: {}",
                        signal.rationale
                    ),
                }
                telegram::format_report(signal, result)
            }
            Err(e) => {
                warn!(symbol = %report.symbol, "run failed: {e}");
                format!("#{} run failed: {e}", report.symbol)
            }
        };

        // Fire-and-forget: a dead notification channel never fails a run.
        if let Err(e) = self.collab.notifier.notify(&message).await {
            warn!(symbol = %report.symbol, "notification failed: {e}");
        }
    }
}
