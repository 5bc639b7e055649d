use crate::config::RiskConfig;
use crate::error::FusionError;
use crate::models::{
    Action, AiRecommendation, Decision, IndicatorSet, RawRecommendation, RiskLevel, Trend,
};

/// Merge indicator output with the AI's raw recommendation into a
/// validated [`Decision`].
///
/// The raw response is untrusted: enum labels and numeric ranges are
/// checked here and a failure propagates as `InvalidRecommendation` so
/// the caller can retry the provider or abort the run.
pub fn fuse(
    indicators: &IndicatorSet,
    raw: &RawRecommendation,
    risk: &RiskConfig,
) -> Result<Decision, FusionError> {
    let recommendation = validate(raw)?;
    let computed = computed_trend(indicators);
    let agreement = recommendation.trend == computed;

    let penalty = if agreement {
        1.0
    } else {
        risk.disagreement_penalty
    };
    let confidence = (recommendation.confidence * penalty).clamp(0.0, 100.0);

    Ok(Decision {
        symbol: indicators.symbol.clone(),
        indicators: indicators.clone(),
        recommendation,
        computed_trend: computed,
        agreement,
        confidence,
    })
}

/// Enum/range validation of the wire-format recommendation.
pub fn validate(raw: &RawRecommendation) -> Result<AiRecommendation, FusionError> {
    let invalid = |msg: String| FusionError::InvalidRecommendation(msg);

    let trend = Trend::from_str_loose(&raw.trend)
        .ok_or_else(|| invalid(format!("unknown trend label {:?}", raw.trend)))?;
    let action = Action::from_str_loose(&raw.signal)
        .ok_or_else(|| invalid(format!("unknown signal label {:?}", raw.signal)))?;
    let risk = RiskLevel::from_str_loose(&raw.risk_level)
        .ok_or_else(|| invalid(format!("unknown risk level {:?}", raw.risk_level)))?;

    let confidence = raw
        .probability
        .ok_or_else(|| invalid("missing probability".to_string()))?;
    if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
        return Err(invalid(format!("probability {confidence} outside [0, 100]")));
    }

    let price = |name: &str, value: Option<f64>| -> Result<f64, FusionError> {
        let v = value.ok_or_else(|| invalid(format!("missing {name}")))?;
        if !v.is_finite() || v <= 0.0 {
            return Err(invalid(format!("{name} {v} is not a positive price")));
        }
        Ok(v)
    };

    let entry = price("entry", raw.entry)?;
    let stop_loss = price("stop_loss", raw.stop_loss)?;

    let mut targets = Vec::new();
    for (name, tp) in [("tp1", raw.tp1), ("tp2", raw.tp2), ("tp3", raw.tp3)] {
        if let Some(v) = tp {
            if !v.is_finite() || v <= 0.0 {
                return Err(invalid(format!("{name} {v} is not a positive price")));
            }
            targets.push(v);
        }
    }
    if targets.is_empty() {
        return Err(invalid("no take-profit levels".to_string()));
    }

    Ok(AiRecommendation {
        trend,
        action,
        risk,
        confidence,
        entry,
        stop_loss,
        targets,
        reason: raw.reason.clone(),
    })
}

/// Trend label from the indicators alone.
///
/// Bullish iff EMA20 > EMA50 > EMA200 with RSI above 50, bearish when
/// fully reversed, sideways otherwise, including whenever any input is
/// still undefined on an incomplete snapshot.
pub fn computed_trend(indicators: &IndicatorSet) -> Trend {
    let (Some(e20), Some(e50), Some(e200), Some(rsi)) = (
        indicators.ema20,
        indicators.ema50,
        indicators.ema200,
        indicators.rsi,
    ) else {
        return Trend::Sideways;
    };

    if e20 > e50 && e50 > e200 && rsi > 50.0 {
        Trend::Bullish
    } else if e20 < e50 && e50 < e200 && rsi < 50.0 {
        Trend::Bearish
    } else {
        Trend::Sideways
    }
}
