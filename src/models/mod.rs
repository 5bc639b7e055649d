pub mod bar;
pub mod direction;
pub mod indicators;
pub mod recommendation;
pub mod signal;
pub mod timeframe;

pub use bar::{Bar, MarketSnapshot};
pub use direction::{Action, RiskLevel, Side, Trend};
pub use indicators::IndicatorSet;
pub use recommendation::{AiRecommendation, RawRecommendation};
pub use signal::{Decision, ExecutionResult, OrderAck, OrderRequest, OrderType, Signal};
pub use timeframe::Timeframe;
