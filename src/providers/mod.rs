pub mod bybit;
pub mod groq;
pub mod ibkr;
pub mod telegram;
pub mod twelvedata;

pub use bybit::BybitClient;
pub use groq::GroqAnalyst;
pub use ibkr::IbkrClient;
pub use telegram::TelegramNotifier;
pub use twelvedata::TwelveDataClient;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::{AnalystError, ExecError, MarketDataError};
use crate::models::{Bar, IndicatorSet, MarketSnapshot, OrderAck, OrderRequest, RawRecommendation, Timeframe};

/// Raw price/volume series source.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>, MarketDataError>;
}

/// AI analysis provider. Output is untrusted until fusion validates it.
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(
        &self,
        snapshot: &MarketSnapshot,
        indicators: &IndicatorSet,
    ) -> Result<RawRecommendation, AnalystError>;
}

/// Order-placement adapter; crypto and forex variants share this contract.
#[async_trait]
pub trait OrderAdapter: Send + Sync {
    async fn authenticate(&self) -> Result<bool, ExecError>;
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck, ExecError>;
}

/// Fire-and-forget notification channel; callers log failures and move on.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}
