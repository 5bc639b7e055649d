use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use ai_signal_bot::bot::{Collaborators, SignalBot};
use ai_signal_bot::config::{Config, MarketKind};
use ai_signal_bot::providers::{
    Analyst, BybitClient, GroqAnalyst, IbkrClient, MarketData, NotificationSink, OrderAdapter,
    TelegramNotifier, TwelveDataClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let analyst: Arc<dyn Analyst> = Arc::new(GroqAnalyst::new(&cfg));
    let notifier: Arc<dyn NotificationSink> = Arc::new(TelegramNotifier::new(&cfg));

    let (market_data, orders): (Arc<dyn MarketData>, Arc<dyn OrderAdapter>) = match cfg.market {
        MarketKind::Crypto => {
            let bybit = Arc::new(BybitClient::new(&cfg));
            (bybit.clone(), bybit)
        }
        MarketKind::Forex => (
            Arc::new(TwelveDataClient::new(&cfg)),
            Arc::new(IbkrClient::new(&cfg)),
        ),
    };

    if cfg.live_trading {
        orders.authenticate().await.map_err(|e| {
            anyhow::anyhow!("exchange authentication failed, refusing to go live: {e}")
        })?;
    }

    let collab = Collaborators {
        market_data,
        analyst,
        orders,
        notifier,
    };

    let bot = SignalBot::new(cfg, collab);
    bot.run().await?;

    Ok(())
}
