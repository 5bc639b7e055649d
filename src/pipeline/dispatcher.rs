use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RiskConfig;
use crate::error::ExecError;
use crate::models::{ExecutionResult, OrderRequest, OrderType, Signal};
use crate::providers::OrderAdapter;

/// Route an actionable signal to the exchange adapter.
///
/// No-action signals come back `Skipped` without touching the adapter.
/// `Transient` faults retry with exponential backoff up to
/// `risk.max_retries` extra attempts; `Permanent` faults surface as a
/// rejection immediately and `Timeout` as a failure. The signal itself
/// is never mutated; the outcome is a separate record.
pub async fn dispatch(
    signal: &Signal,
    adapter: &dyn OrderAdapter,
    risk: &RiskConfig,
    timeout: Duration,
) -> ExecutionResult {
    let Some(side) = signal.side else {
        return ExecutionResult::Skipped {
            reason: signal.rationale.clone(),
        };
    };

    let request = OrderRequest {
        symbol: signal.symbol.clone(),
        side,
        size: signal.size,
        order_type: OrderType::Market,
        limit_price: None,
        stop_loss: Some(signal.stop_loss),
        take_profit: Some(signal.take_profit),
    };

    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        let placed = match tokio::time::timeout(timeout, adapter.place_order(&request)).await {
            Ok(placed) => placed,
            Err(_) => Err(ExecError::Timeout(timeout.as_secs())),
        };
        match placed {
            Ok(ack) => {
                debug!(symbol = %signal.symbol, order_id = %ack.order_id, attempts, "order accepted");
                return ExecutionResult::Accepted {
                    order_id: ack.order_id,
                    attempts,
                };
            }
            Err(ExecError::Transient(msg)) if attempts <= risk.max_retries => {
                let backoff =
                    Duration::from_millis(risk.retry_base_ms * 2u64.pow(attempts - 1));
                warn!(
                    symbol = %signal.symbol,
                    attempt = attempts,
                    "transient execution fault ({msg}), retrying in {backoff:?}"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(err @ ExecError::Transient(_)) => {
                return ExecutionResult::Failed {
                    error: format!("retries exhausted: {err}"),
                    attempts,
                };
            }
            Err(ExecError::Permanent(msg)) => {
                return ExecutionResult::Rejected {
                    reason: msg,
                    attempts,
                };
            }
            Err(err @ ExecError::Timeout(_)) => {
                return ExecutionResult::Failed {
                    error: err.to_string(),
                    attempts,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderAck, Side};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the scripted error a fixed number of times, then accepts.
    struct FlakyAdapter {
        calls: AtomicU32,
        failures: u32,
        error: fn(String) -> ExecError,
    }

    impl FlakyAdapter {
        fn new(failures: u32, error: fn(String) -> ExecError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                error,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OrderAdapter for FlakyAdapter {
        async fn authenticate(&self) -> Result<bool, ExecError> {
            Ok(true)
        }

        async fn place_order(&self, _request: &OrderRequest) -> Result<OrderAck, ExecError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)(format!("scripted failure {n}")))
            } else {
                Ok(OrderAck {
                    order_id: format!("ord-{n}"),
                })
            }
        }
    }

    fn buy_signal() -> Signal {
        Signal {
            symbol: "BTCUSDT".to_string(),
            side: Some(Side::Buy),
            size: 0.01,
            entry: 150.0,
            stop_loss: 148.5,
            take_profit: 152.0,
            confidence: 80.0,
            rationale: "test".to_string(),
        }
    }

    fn fast_risk() -> RiskConfig {
        RiskConfig {
            retry_base_ms: 1,
            ..RiskConfig::default()
        }
    }

    #[tokio::test]
    async fn no_action_is_skipped_without_adapter_call() {
        let adapter = FlakyAdapter::new(0, ExecError::Transient);
        let signal = Signal::no_action("BTCUSDT", 30.0, "below threshold");
        let result = dispatch(&signal, &adapter, &fast_risk(), Duration::from_secs(5)).await;
        assert!(matches!(result, ExecutionResult::Skipped { .. }));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn rate_limited_three_times_then_success_is_four_attempts() {
        let adapter = FlakyAdapter::new(3, ExecError::Transient);
        let result = dispatch(&buy_signal(), &adapter, &fast_risk(), Duration::from_secs(5)).await;
        match result {
            ExecutionResult::Accepted { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected accept, got {other:?}"),
        }
        assert_eq!(adapter.calls(), 4);
    }

    #[tokio::test]
    async fn transient_retries_are_bounded() {
        let adapter = FlakyAdapter::new(100, ExecError::Transient);
        let result = dispatch(&buy_signal(), &adapter, &fast_risk(), Duration::from_secs(5)).await;
        match result {
            ExecutionResult::Failed { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(adapter.calls(), 4);
    }

    #[tokio::test]
    async fn permanent_fault_is_rejected_without_retry() {
        let adapter = FlakyAdapter::new(100, ExecError::Permanent);
        let result = dispatch(&buy_signal(), &adapter, &fast_risk(), Duration::from_secs(5)).await;
        match result {
            ExecutionResult::Rejected { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn timeout_is_surfaced_immediately() {
        let adapter = FlakyAdapter::new(100, |_| ExecError::Timeout(30));
        let result = dispatch(&buy_signal(), &adapter, &fast_risk(), Duration::from_secs(5)).await;
        match result {
            ExecutionResult::Failed { attempts, error } => {
                assert_eq!(attempts, 1);
                assert!(error.contains("timed out"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
