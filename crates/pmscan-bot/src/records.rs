//! Conversion of pipeline outcomes into result-store rows.

use crate::pipeline::{Disposition, MarketOutcome};
use pmscan_persistence::{BotScoreRecord, SignalRecord, SnapshotRecord};

pub fn snapshot_record(cycle: u64, outcome: &MarketOutcome) -> SnapshotRecord {
    let m = &outcome.metrics;
    let a = &outcome.screening.microstructure;
    let h = &outcome.screening.informational;
    SnapshotRecord {
        timestamp_ms: outcome.timestamp.timestamp_millis(),
        cycle,
        market_id: outcome.market_id.to_string(),
        slug: outcome.slug.clone(),
        best_bid: m.best_bid,
        best_ask: m.best_ask,
        mid: m.mid,
        spread: m.spread,
        depth5: m.depth5,
        symmetry: m.symmetry,
        vol24h: m.vol24h,
        position_size: outcome.screening.position_size,
        exit_risk: a.exit_risk,
        eligible_a: a.eligible,
        reason_a: a.reason.as_str().to_string(),
        eligible_h: h.eligible,
        reason_h: h.reason.as_str().to_string(),
    }
}

pub fn bot_score_record(cycle: u64, outcome: &MarketOutcome) -> BotScoreRecord {
    let b = &outcome.bot_score;
    BotScoreRecord {
        timestamp_ms: outcome.timestamp.timestamp_millis(),
        cycle,
        market_id: outcome.market_id.to_string(),
        score: b.score,
        regime: b.regime.as_str().to_string(),
        pmwv: b.components.pmwv,
        pmwv_score: b.components.pmwv_score,
        spread_score: b.components.spread_score,
        depth_score: b.components.depth_score,
        stability_score: b.components.stability_score,
    }
}

/// Signal row for a fired cascade or an informational hand-off.
pub fn signal_record(cycle: u64, outcome: &MarketOutcome) -> Option<SignalRecord> {
    let timestamp_ms = outcome.timestamp.timestamp_millis();
    let base = SignalRecord {
        timestamp_ms,
        cycle,
        market_id: outcome.market_id.to_string(),
        strategy: String::new(),
        signal_id: String::new(),
        regime: outcome.bot_score.regime.as_str().to_string(),
        bot_score: outcome.bot_score.score,
        direction: None,
        entry: None,
        stop: None,
        strength: None,
        reasons: String::new(),
    };

    match &outcome.disposition {
        Disposition::Cascade(signal) => {
            let trade = signal.trade?;
            Some(SignalRecord {
                strategy: "A2".to_string(),
                signal_id: signal.signal_id(),
                direction: Some(trade.direction.as_str().to_string()),
                entry: Some(trade.entry),
                stop: Some(trade.stop),
                strength: Some(trade.strength),
                reasons: signal.conditions.reasons(),
                ..base
            })
        }
        Disposition::Informational => Some(SignalRecord {
            strategy: "H1".to_string(),
            signal_id: format!("h1_{}_{timestamp_ms}", outcome.market_id),
            ..base
        }),
        Disposition::Excluded(_) => None,
    }
}
