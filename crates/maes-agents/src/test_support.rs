//! Test support: a scripted behavior source and action-record builders.
//!
//! `ScriptedBehaviorSource` replays canned logs tick by tick so the feedback
//! loop can be driven with exact withdrawal/claim/buy counts, while still
//! applying the real sentiment smoothing rule.

use std::collections::VecDeque;

use chrono::{NaiveDate, NaiveDateTime};
use maes_models::action::{
    Action, ActionRecord, BankAction, CardCategory, InsuranceAction, TradeSide,
};
use maes_models::persona::RiskProfile;
use maes_models::sector::Sector;
use rust_decimal::Decimal;

use crate::population::{smooth_sentiment, BehaviorSource};

/// 2024-05-23 09:00, the default session start.
pub fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 23)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap_or_default()
}

/// Record with a fixed persona and a nominal amount.
pub fn record_at(action: Action) -> ActionRecord {
    let amount = match action {
        Action::Insurance { .. } => Decimal::ZERO,
        _ => Decimal::from(100_000),
    };
    ActionRecord::new(timestamp(), "user_000", action, amount, RiskProfile::Neutral)
}

pub fn card(kind: CardCategory) -> ActionRecord {
    record_at(Action::Card { kind })
}

pub fn securities(side: TradeSide, sector: Sector) -> ActionRecord {
    record_at(Action::Securities { side, sector })
}

pub fn withdrawals(count: usize) -> Vec<ActionRecord> {
    (0..count)
        .map(|_| {
            record_at(Action::Bank {
                kind: BankAction::Withdrawal,
            })
        })
        .collect()
}

pub fn accident_claims(count: usize) -> Vec<ActionRecord> {
    (0..count)
        .map(|_| {
            record_at(Action::Insurance {
                kind: InsuranceAction::AccidentClaim,
            })
        })
        .collect()
}

/// Replays queued logs; an exhausted script yields empty ticks.
pub struct ScriptedBehaviorSource {
    script: VecDeque<Vec<ActionRecord>>,
    sentiment: f64,
    retain: f64,
    /// Every signal passed to `update_sentiment`, in order.
    pub received_signals: Vec<f64>,
    /// Sentiment observed at the start of each generated tick.
    pub sentiment_at_generate: Vec<f64>,
}

impl ScriptedBehaviorSource {
    pub fn new(script: Vec<Vec<ActionRecord>>) -> Self {
        Self {
            script: script.into(),
            sentiment: 0.0,
            retain: 0.7,
            received_signals: Vec::new(),
            sentiment_at_generate: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl BehaviorSource for ScriptedBehaviorSource {
    fn generate_tick(&mut self, timestamp: NaiveDateTime) -> Vec<ActionRecord> {
        self.sentiment_at_generate.push(self.sentiment);
        let mut log = self.script.pop_front().unwrap_or_default();
        for record in &mut log {
            record.timestamp = timestamp;
        }
        log
    }

    fn update_sentiment(&mut self, signal: f64) {
        self.received_signals.push(signal);
        self.sentiment = smooth_sentiment(self.sentiment, signal, self.retain);
    }

    fn sentiment(&self) -> f64 {
        self.sentiment
    }

    fn population_size(&self) -> usize {
        0
    }
}
