use thiserror::Error;

/// Data-quality failures from the snapshot builder.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("insufficient data for {symbol}: {have} usable bars")]
    InsufficientData { symbol: String, have: usize },
    #[error("malformed bar at index {index}: {reason}")]
    MalformedBar { index: usize, reason: String },
}

/// Failures from the market data source.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("market data fetch timed out after {0}s")]
    Timeout(u64),
}

/// Failures from the AI analysis provider.
#[derive(Debug, Error)]
pub enum AnalystError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("analysis timed out after {0}s")]
    Timeout(u64),
}

/// Validation failures at the fusion boundary.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("invalid recommendation: {0}")]
    InvalidRecommendation(String),
}

/// Level sanity-check failures during signal synthesis. Always converted
/// to a no-action verdict, never dispatched.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("invalid levels: {0}")]
    InvalidLevels(String),
}

/// Execution faults classified by retry eligibility.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Network hiccups, rate limits. Eligible for bounded retry.
    #[error("transient execution fault: {0}")]
    Transient(String),
    /// Auth failures, unknown symbols, insufficient balance. No retry.
    #[error("permanent execution fault: {0}")]
    Permanent(String),
    #[error("execution timed out after {0}s")]
    Timeout(u64),
}

/// Anything that aborts a single symbol's run. Aborting one symbol never
/// aborts the batch; the bot reports these per run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
    #[error(transparent)]
    Analyst(#[from] AnalystError),
    #[error(transparent)]
    Fusion(#[from] FusionError),
}
