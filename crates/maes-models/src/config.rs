use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::sector::{Instrument, SectorMap};

/// Longest accepted tick: one leap year.
pub const MAX_TICK_MINUTES: i64 = 366 * 24 * 60;

/// Top-level configuration for a simulation session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub population: PopulationConfig,
    pub allocator: AllocatorConfig,
    pub critic: CriticConfig,
    pub session: SessionConfig,
    /// Fixed instrument universe. Ids must be unique.
    pub universe: Vec<Instrument>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            allocator: AllocatorConfig::default(),
            critic: CriticConfig::default(),
            session: SessionConfig::default(),
            universe: SectorMap::default_instruments(),
        }
    }
}

impl SimConfig {
    /// Check ranges and constants that would make generation or allocation
    /// meaningless. An empty universe is accepted here; allocation reports it.
    pub fn validate(&self) -> Result<(), String> {
        let p = &self.population;
        for (name, range) in [
            ("population.base_asset", &p.base_asset),
            ("population.sensitivity", &p.sensitivity),
            ("population.bank_amount", &p.bank_amount),
            ("population.card_amount", &p.card_amount),
            ("population.securities_amount", &p.securities_amount),
            ("population.insurance_amount", &p.insurance_amount),
        ] {
            range.check(name)?;
        }
        if p.sensitivity.min <= 0.0 {
            return Err("population.sensitivity must be strictly positive".to_string());
        }
        if p.age_brackets.is_empty() {
            return Err("population.age_brackets must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&p.smoothing_retain) {
            return Err(format!(
                "population.smoothing_retain must be within [0, 1], got {}",
                p.smoothing_retain
            ));
        }
        if !(0.0..=1.0).contains(&p.tilt_probability) {
            return Err(format!(
                "population.tilt_probability must be within [0, 1], got {}",
                p.tilt_probability
            ));
        }
        if p.panic_securities_weight <= 0.0 || p.panic_withdrawal_weight <= 0.0 {
            return Err("population panic weights must be positive".to_string());
        }

        let a = &self.allocator;
        if a.base_weight.is_nan() || a.base_weight <= 0.0 {
            return Err(format!(
                "allocator.base_weight must be positive, got {}",
                a.base_weight
            ));
        }
        if a.floor.is_nan() || a.floor < 0.0 {
            return Err(format!(
                "allocator.floor must be non-negative, got {}",
                a.floor
            ));
        }

        if self.session.tick_minutes <= 0 || self.session.tick_minutes > MAX_TICK_MINUTES {
            return Err(format!(
                "session.tick_minutes must be within 1..={MAX_TICK_MINUTES}, got {}",
                self.session.tick_minutes
            ));
        }
        Ok(())
    }
}

/// Inclusive interval a uniform draw is taken from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn check(&self, name: &str) -> Result<(), String> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(format!("{name} bounds must be finite"));
        }
        if self.min < 0.0 || self.min > self.max {
            return Err(format!(
                "{name} must satisfy 0 <= min <= max, got [{}, {}]",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

/// Configuration for synthetic population behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PopulationConfig {
    pub size: usize,
    /// Fixed seed for reproducible runs. None draws from OS entropy.
    pub seed: Option<u64>,
    /// Age bracket starts; a persona's age is a bracket plus 0..=9 years.
    pub age_brackets: Vec<u32>,
    pub base_asset: AmountRange,
    pub sensitivity: AmountRange,

    /// Participation rate at neutral sentiment.
    pub base_participation: f64,
    /// Participation never drops below this rate.
    pub participation_floor: f64,
    pub sentiment_participation_gain: f64,
    /// Weight kept from the previous sentiment; the input gets `1 - retain`.
    pub smoothing_retain: f64,

    /// Below this adjustment securities become more likely and tilt to sell.
    pub securities_panic_threshold: f64,
    /// Below this adjustment withdrawals dominate bank actions.
    pub withdrawal_panic_threshold: f64,
    /// Above this adjustment securities trades tilt to buy.
    pub buy_tilt_threshold: f64,
    /// Probability of the favored side once a tilt applies.
    pub tilt_probability: f64,
    /// Card amounts scale by `1 + adjustment * card_sentiment_scale`.
    pub card_sentiment_scale: f64,
    pub panic_securities_weight: f64,
    pub panic_withdrawal_weight: f64,

    pub bank_amount: AmountRange,
    pub card_amount: AmountRange,
    pub securities_amount: AmountRange,
    pub insurance_amount: AmountRange,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 500,
            seed: None,
            age_brackets: vec![20, 30, 40, 50, 60],
            base_asset: AmountRange::new(10_000_000.0, 500_000_000.0),
            sensitivity: AmountRange::new(0.5, 1.5),
            base_participation: 0.3,
            participation_floor: 0.1,
            sentiment_participation_gain: 0.1,
            smoothing_retain: 0.7,
            securities_panic_threshold: -0.3,
            withdrawal_panic_threshold: -0.5,
            buy_tilt_threshold: 0.3,
            tilt_probability: 0.7,
            card_sentiment_scale: 0.2,
            panic_securities_weight: 2.0,
            panic_withdrawal_weight: 3.0,
            bank_amount: AmountRange::new(10_000.0, 1_000_000.0),
            card_amount: AmountRange::new(5_000.0, 200_000.0),
            securities_amount: AmountRange::new(100_000.0, 5_000_000.0),
            insurance_amount: AmountRange::new(0.0, 0.0),
        }
    }
}

/// Constants of the weight formula `max(floor, base + score * scale + bump)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AllocatorConfig {
    pub base_weight: f64,
    pub scale: f64,
    pub floor: f64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            base_weight: 0.10,
            scale: 0.01,
            floor: 0.05,
        }
    }
}

/// Thresholds for the critic's audits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CriticConfig {
    pub min_instruments: usize,
    pub concentration_cap: f64,
    pub strong_signal_threshold: u32,
    pub recommended_bump: f64,
    pub min_log_size: usize,
    /// Withdrawals strictly above this count raise a liquidity alert.
    pub withdrawal_alert_count: usize,
    pub withdrawal_penalty: f64,
    /// Accident claims strictly above this count raise a systemic alert.
    pub accident_alert_count: usize,
    pub accident_penalty: f64,
    pub contraction_threshold: f64,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            min_instruments: 5,
            concentration_cap: 0.20,
            strong_signal_threshold: 3,
            recommended_bump: 0.05,
            min_log_size: 15,
            withdrawal_alert_count: 5,
            withdrawal_penalty: 0.4,
            accident_alert_count: 3,
            accident_penalty: 0.2,
            contraction_threshold: -0.3,
        }
    }
}

/// Driver-level settings: clock, windows, and the illustrative return track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub start_time: NaiveDateTime,
    pub tick_minutes: i64,
    /// Number of most recent action records kept for inspection.
    pub behavior_window: usize,
    pub return_drift: f64,
    pub return_volatility: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_time: NaiveDate::from_ymd_opt(2024, 5, 23)
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .unwrap_or_default(),
            tick_minutes: 60,
            behavior_window: 1000,
            return_drift: 0.001,
            return_volatility: 0.005,
        }
    }
}
