use crate::config::RiskConfig;
use crate::error::LevelError;
use crate::models::{Action, Decision, RiskLevel, Signal};

/// Apply risk policy to a fused decision.
///
/// Always returns a Signal: either actionable with size and levels
/// attached, or a no-action verdict whose rationale documents the gate
/// that stopped it. Broken stop/target geometry is downgraded to
/// no-action rather than dispatched as a malformed order.
pub fn synthesize(decision: &Decision, risk: &RiskConfig) -> Signal {
    let rec = &decision.recommendation;
    let symbol = decision.symbol.clone();

    let summary = rationale(decision);

    if rec.action == Action::Hold {
        return Signal::no_action(symbol, decision.confidence, format!("AI action is HOLD; {summary}"));
    }

    if decision.confidence < risk.min_confidence {
        return Signal::no_action(
            symbol,
            decision.confidence,
            format!(
                "confidence {:.1} below threshold {:.1}; {summary}",
                decision.confidence, risk.min_confidence
            ),
        );
    }

    if rec.risk == RiskLevel::High && !risk.allow_high_risk {
        return Signal::no_action(
            symbol,
            decision.confidence,
            format!("high-risk entries disallowed; {summary}"),
        );
    }

    let take_profit = match check_levels(decision) {
        Ok(tp) => tp,
        Err(e) => {
            return Signal::no_action(symbol, decision.confidence, format!("{e}; {summary}"));
        }
    };

    let size = position_size(rec.entry, decision.indicators.volatility, risk);

    Signal {
        symbol,
        side: rec.action.to_side(),
        size,
        entry: rec.entry,
        stop_loss: rec.stop_loss,
        take_profit,
        confidence: decision.confidence,
        rationale: summary,
    }
}

/// Stop must sit on the loss side of entry and at least one target on
/// the gain side; returns the nearest valid target.
fn check_levels(decision: &Decision) -> Result<f64, LevelError> {
    let rec = &decision.recommendation;
    let entry = rec.entry;

    match rec.action {
        Action::Buy => {
            if rec.stop_loss >= entry {
                return Err(LevelError::InvalidLevels(format!(
                    "buy stop {} not below entry {entry}",
                    rec.stop_loss
                )));
            }
            rec.targets
                .iter()
                .copied()
                .filter(|&tp| tp > entry)
                .fold(None, |best: Option<f64>, tp| {
                    Some(best.map_or(tp, |b| b.min(tp)))
                })
                .ok_or_else(|| {
                    LevelError::InvalidLevels(format!("no buy target above entry {entry}"))
                })
        }
        Action::Sell => {
            if rec.stop_loss <= entry {
                return Err(LevelError::InvalidLevels(format!(
                    "sell stop {} not above entry {entry}",
                    rec.stop_loss
                )));
            }
            rec.targets
                .iter()
                .copied()
                .filter(|&tp| tp < entry)
                .fold(None, |best: Option<f64>, tp| {
                    Some(best.map_or(tp, |b| b.max(tp)))
                })
                .ok_or_else(|| {
                    LevelError::InvalidLevels(format!("no sell target below entry {entry}"))
                })
        }
        Action::Hold => Err(LevelError::InvalidLevels("hold has no levels".to_string())),
    }
}

/// Fixed fraction of capital, scaled inversely by observed volatility.
///
/// Size is in base units (notional / entry). Unknown or calm volatility
/// leaves the scale at 1; elevated volatility shrinks the position
/// proportionally.
fn position_size(entry: f64, volatility: Option<f64>, risk: &RiskConfig) -> f64 {
    let notional = risk.capital * risk.risk_fraction;
    let base = notional / entry;

    let scale = match volatility {
        Some(vol) if vol > risk.vol_reference && risk.vol_reference > 0.0 => {
            risk.vol_reference / vol
        }
        _ => 1.0,
    };

    base * scale
}

fn rationale(decision: &Decision) -> String {
    let rec = &decision.recommendation;
    let agreement = if decision.agreement {
        "indicators agree with AI trend"
    } else {
        "indicators disagree with AI trend"
    };
    format!(
        "{agreement} (computed {}, AI {}); action {}; confidence {:.1}; risk {}",
        decision.computed_trend, rec.trend, rec.action, decision.confidence, rec.risk
    )
}
