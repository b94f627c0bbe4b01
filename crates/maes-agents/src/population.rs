use chrono::NaiveDateTime;
use maes_models::action::{Action, ActionCategory, ActionRecord, BankAction, CardCategory};
use maes_models::action::{InsuranceAction, TradeSide};
use maes_models::config::{AmountRange, PopulationConfig};
use maes_models::persona::{Persona, RiskProfile};
use maes_models::sector::Sector;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Source of per-tick behavior logs. Mockable for driving the loop with
/// scripted logs in tests.
pub trait BehaviorSource: Send {
    /// Emit the behavior log for one simulated tick.
    fn generate_tick(&mut self, timestamp: NaiveDateTime) -> Vec<ActionRecord>;

    /// Fold the critic's risk signal into the smoothed global sentiment.
    /// Called at most once per tick, after the critic has run.
    fn update_sentiment(&mut self, signal: f64);

    fn sentiment(&self) -> f64;

    fn population_size(&self) -> usize;
}

/// Synthetic population of personas whose activity is biased by a smoothed
/// global sentiment value.
pub struct PopulationSimulator {
    config: PopulationConfig,
    personas: Vec<Persona>,
    sentiment: f64,
    rng: ChaCha8Rng,
}

impl PopulationSimulator {
    /// Seeds from `config.seed`, or from OS entropy when unset.
    pub fn new(config: PopulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_seed(config: PopulationConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Build the population from an injected generator. Persona attributes
    /// are drawn from it first, then every tick continues the same stream.
    pub fn with_rng(config: PopulationConfig, mut rng: ChaCha8Rng) -> Self {
        let personas = (0..config.size)
            .map(|i| generate_persona(&config, i, &mut rng))
            .collect::<Vec<_>>();
        info!(personas = personas.len(), seed = ?config.seed, "Population generated");
        Self {
            config,
            personas,
            sentiment: 0.0,
            rng,
        }
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    /// Per-persona inclusion rate for the next tick.
    pub fn participation_probability(&self) -> f64 {
        participation_probability(&self.config, self.sentiment)
    }

    fn generate_action(&mut self, persona_index: usize, adjustment: f64) -> (Action, Decimal) {
        let cfg = &self.config;
        let rng = &mut self.rng;
        let persona = &self.personas[persona_index];

        let securities_weight = if adjustment < cfg.securities_panic_threshold {
            cfg.panic_securities_weight
        } else {
            1.0
        };
        let category = pick_weighted(
            rng,
            &[
                (ActionCategory::Bank, 1.0),
                (ActionCategory::Card, 1.0),
                (ActionCategory::Securities, securities_weight),
                (ActionCategory::Insurance, 1.0),
            ],
            ActionCategory::Bank,
        );

        match category {
            ActionCategory::Bank => {
                let withdrawal_weight = if adjustment < cfg.withdrawal_panic_threshold {
                    cfg.panic_withdrawal_weight
                } else {
                    1.0
                };
                let kind = pick_weighted(
                    rng,
                    &[
                        (BankAction::Deposit, 1.0),
                        (BankAction::Withdrawal, withdrawal_weight),
                        (BankAction::LoanRepayment, 1.0),
                    ],
                    BankAction::Deposit,
                );
                (Action::Bank { kind }, draw_amount(rng, &cfg.bank_amount, 1.0))
            }
            ActionCategory::Card => {
                let kind = *CardCategory::ALL.choose(rng).unwrap_or(&CardCategory::Food);
                let factor = (1.0 + adjustment * cfg.card_sentiment_scale).max(0.0);
                (Action::Card { kind }, draw_amount(rng, &cfg.card_amount, factor))
            }
            ActionCategory::Securities => {
                let sell = rng.gen_bool(sell_probability(cfg, adjustment));
                let side = if sell { TradeSide::Sell } else { TradeSide::Buy };
                let sector = *persona
                    .preferred_sectors
                    .choose(rng)
                    .unwrap_or(&Sector::Other);
                (
                    Action::Securities { side, sector },
                    draw_amount(rng, &cfg.securities_amount, 1.0),
                )
            }
            ActionCategory::Insurance => {
                let kind = *InsuranceAction::ALL
                    .choose(rng)
                    .unwrap_or(&InsuranceAction::PremiumPayment);
                (
                    Action::Insurance { kind },
                    draw_amount(rng, &cfg.insurance_amount, 1.0),
                )
            }
        }
    }
}

impl BehaviorSource for PopulationSimulator {
    fn generate_tick(&mut self, timestamp: NaiveDateTime) -> Vec<ActionRecord> {
        let participation = self.participation_probability();
        let mut log = Vec::new();

        for index in 0..self.personas.len() {
            if !self.rng.gen_bool(participation) {
                continue;
            }
            let adjustment = self.personas[index].sentiment_adjustment(self.sentiment);
            let (action, amount) = self.generate_action(index, adjustment);
            let persona = &self.personas[index];
            log.push(ActionRecord::new(
                timestamp,
                &persona.id,
                action,
                amount,
                persona.risk_profile,
            ));
        }

        debug!(
            %timestamp,
            actions = log.len(),
            participation,
            sentiment = self.sentiment,
            "Behavior tick generated"
        );
        log
    }

    fn update_sentiment(&mut self, signal: f64) {
        if !signal.is_finite() {
            warn!(signal, "Ignoring non-finite sentiment signal");
            return;
        }
        let previous = self.sentiment;
        self.sentiment = smooth_sentiment(previous, signal, self.config.smoothing_retain);
        debug!(previous, signal, sentiment = self.sentiment, "Sentiment updated");
    }

    fn sentiment(&self) -> f64 {
        self.sentiment
    }

    fn population_size(&self) -> usize {
        self.personas.len()
    }
}

/// `max(floor, base + sentiment * gain)`, capped at 1.
pub fn participation_probability(config: &PopulationConfig, sentiment: f64) -> f64 {
    (config.base_participation + sentiment * config.sentiment_participation_gain)
        .max(config.participation_floor)
        .clamp(0.0, 1.0)
}

/// Probability that a securities action is a sell for the given adjustment.
pub fn sell_probability(config: &PopulationConfig, adjustment: f64) -> f64 {
    let tilt = config.tilt_probability.clamp(0.0, 1.0);
    if adjustment < config.securities_panic_threshold {
        tilt
    } else if adjustment > config.buy_tilt_threshold {
        1.0 - tilt
    } else {
        0.5
    }
}

/// Exponential smoothing `previous * retain + input * (1 - retain)`, with the
/// input and the result clamped to [-1, 1].
pub fn smooth_sentiment(previous: f64, input: f64, retain: f64) -> f64 {
    let input = input.clamp(-1.0, 1.0);
    (previous * retain + input * (1.0 - retain)).clamp(-1.0, 1.0)
}

fn generate_persona(config: &PopulationConfig, index: usize, rng: &mut ChaCha8Rng) -> Persona {
    let bracket = config.age_brackets.choose(rng).copied().unwrap_or_default();
    let age = bracket + rng.gen_range(0..=9);
    let risk_profile = *RiskProfile::ALL.choose(rng).unwrap_or(&RiskProfile::Neutral);
    let base_asset = draw_amount(rng, &config.base_asset, 1.0);
    let preferred_sectors = Sector::PERSONA_SECTORS
        .choose_multiple(rng, 2)
        .copied()
        .collect();
    let sensitivity = draw(rng, &config.sensitivity);

    Persona {
        id: format!("user_{index:03}"),
        age,
        risk_profile,
        base_asset,
        preferred_sectors,
        sensitivity,
    }
}

fn draw(rng: &mut ChaCha8Rng, range: &AmountRange) -> f64 {
    if range.max > range.min {
        rng.gen_range(range.min..=range.max)
    } else {
        range.min
    }
}

/// Uniform KRW amount scaled by `factor`, rounded to whole won.
fn draw_amount(rng: &mut ChaCha8Rng, range: &AmountRange, factor: f64) -> Decimal {
    let value = (draw(rng, range) * factor).max(0.0);
    Decimal::from_f64(value)
        .map(|d| d.round())
        .unwrap_or(Decimal::ZERO)
}

fn pick_weighted<T: Copy>(rng: &mut ChaCha8Rng, choices: &[(T, f64)], fallback: T) -> T {
    choices
        .choose_weighted(rng, |(_, weight)| *weight)
        .map(|(choice, _)| *choice)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 23)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn small_config(size: usize) -> PopulationConfig {
        PopulationConfig {
            size,
            ..PopulationConfig::default()
        }
    }

    #[test]
    fn population_attributes_are_within_configured_bounds() {
        let sim = PopulationSimulator::with_seed(small_config(200), 11);
        assert_eq!(sim.population_size(), 200);
        for persona in sim.personas() {
            assert!((20..=69).contains(&persona.age));
            assert!(persona.base_asset >= Decimal::from(10_000_000));
            assert!(persona.base_asset <= Decimal::from(500_000_000));
            assert!((0.5..=1.5).contains(&persona.sensitivity));
            assert_eq!(persona.preferred_sectors.len(), 2);
            assert_ne!(persona.preferred_sectors[0], persona.preferred_sectors[1]);
            assert!(persona
                .preferred_sectors
                .iter()
                .all(|s| Sector::PERSONA_SECTORS.contains(s)));
        }
        assert_eq!(sim.personas()[7].id, "user_007");
    }

    #[test]
    fn initial_sentiment_is_neutral() {
        let sim = PopulationSimulator::with_seed(small_config(10), 1);
        assert_eq!(sim.sentiment(), 0.0);
        assert!((sim.participation_probability() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn smoothing_follows_seventy_thirty_rule() {
        let mut sim = PopulationSimulator::with_seed(small_config(1), 1);
        let mut expected = 0.0;
        for signal in [-0.4, -0.6, 0.0, 0.25, 1.0, -1.0] {
            sim.update_sentiment(signal);
            expected = 0.7 * expected + 0.3 * signal;
            assert!((sim.sentiment() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn out_of_range_signal_is_clamped() {
        let mut sim = PopulationSimulator::with_seed(small_config(1), 1);
        sim.update_sentiment(-5.0);
        assert!((sim.sentiment() - (-0.3)).abs() < 1e-9);
    }

    #[test]
    fn non_finite_signal_is_ignored() {
        let mut sim = PopulationSimulator::with_seed(small_config(1), 1);
        sim.update_sentiment(-0.4);
        let before = sim.sentiment();
        sim.update_sentiment(f64::NAN);
        assert_eq!(sim.sentiment(), before);
    }

    #[test]
    fn participation_has_a_floor() {
        let config = PopulationConfig::default();
        assert!((participation_probability(&config, 0.0) - 0.3).abs() < 1e-12);
        assert!((participation_probability(&config, 1.0) - 0.4).abs() < 1e-12);
        assert!((participation_probability(&config, -1.0) - 0.2).abs() < 1e-12);

        let steep = PopulationConfig {
            sentiment_participation_gain: 0.5,
            ..PopulationConfig::default()
        };
        assert!((participation_probability(&steep, -1.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn sell_tilt_follows_thresholds() {
        let config = PopulationConfig::default();
        assert_eq!(sell_probability(&config, -1.0), 0.7);
        assert_eq!(sell_probability(&config, -0.3), 0.5);
        assert_eq!(sell_probability(&config, 0.0), 0.5);
        assert!((sell_probability(&config, 1.0) - 0.3).abs() < 1e-12);
        assert!(sell_probability(&config, -1.0) >= 1.0 - sell_probability(&config, -1.0));
    }

    #[test]
    fn same_seed_reproduces_ticks() {
        let mut a = PopulationSimulator::with_seed(small_config(100), 42);
        let mut b = PopulationSimulator::with_seed(small_config(100), 42);
        for _ in 0..3 {
            assert_eq!(a.generate_tick(ts()), b.generate_tick(ts()));
        }
        assert_eq!(a.personas(), b.personas());
    }

    #[test]
    fn records_carry_persona_data_and_timestamp() {
        let mut sim = PopulationSimulator::with_seed(small_config(100), 5);
        let log = sim.generate_tick(ts());
        assert!(!log.is_empty());
        for record in &log {
            assert_eq!(record.timestamp, ts());
            let persona = sim
                .personas()
                .iter()
                .find(|p| p.id == record.persona_id)
                .unwrap();
            assert_eq!(record.risk_profile, persona.risk_profile);
            assert!(record.amount >= Decimal::ZERO);
            if let Action::Securities { sector, .. } = record.action {
                assert!(persona.preferred_sectors.contains(&sector));
            }
            if record.category() == ActionCategory::Insurance {
                assert_eq!(record.amount, Decimal::ZERO);
            }
        }
    }

    fn pinned_sensitivity(sensitivity: f64) -> PopulationConfig {
        PopulationConfig {
            size: 1000,
            sensitivity: AmountRange::new(sensitivity, sensitivity),
            ..PopulationConfig::default()
        }
    }

    fn anxious(config: PopulationConfig, seed: u64) -> PopulationSimulator {
        let mut sim = PopulationSimulator::with_seed(config, seed);
        for _ in 0..80 {
            sim.update_sentiment(-1.0);
        }
        sim
    }

    fn collect_ticks(sim: &mut PopulationSimulator, ticks: usize) -> Vec<ActionRecord> {
        (0..ticks).flat_map(|_| sim.generate_tick(ts())).collect()
    }

    fn securities_share(log: &[ActionRecord]) -> f64 {
        let trades = log
            .iter()
            .filter(|r| r.category() == ActionCategory::Securities)
            .count();
        trades as f64 / log.len() as f64
    }

    fn withdrawal_share(log: &[ActionRecord]) -> f64 {
        let bank: Vec<_> = log
            .iter()
            .filter(|r| r.category() == ActionCategory::Bank)
            .collect();
        let withdrawals = bank.iter().filter(|r| r.is_withdrawal()).count();
        withdrawals as f64 / bank.len() as f64
    }

    #[test]
    fn mild_panic_favors_securities_but_not_withdrawals() {
        // adj is about -0.4: past the securities threshold only.
        let mut calm = PopulationSimulator::with_seed(pinned_sensitivity(0.4), 21);
        let mut worried = anxious(pinned_sensitivity(0.4), 21);
        let adjustment = worried.personas()[0].sentiment_adjustment(worried.sentiment());
        assert!(adjustment < -0.3 && adjustment > -0.5);

        let calm_log = collect_ticks(&mut calm, 20);
        let worried_log = collect_ticks(&mut worried, 20);

        // Expected shares: 1/4 neutral, 2/5 under panic.
        assert!(securities_share(&worried_log) > securities_share(&calm_log) + 0.08);
        // Bank sub-types stay uniform, about 1/3 withdrawals.
        assert!(withdrawal_share(&worried_log) < 0.45);
    }

    #[test]
    fn deep_panic_favors_withdrawals() {
        // adj is about -1.0: past both thresholds.
        let mut calm = PopulationSimulator::with_seed(pinned_sensitivity(1.0), 22);
        let mut worried = anxious(pinned_sensitivity(1.0), 22);
        let adjustment = worried.personas()[0].sentiment_adjustment(worried.sentiment());
        assert!(adjustment < -0.5);

        let calm_log = collect_ticks(&mut calm, 20);
        let worried_log = collect_ticks(&mut worried, 20);

        // Expected shares: 1/3 neutral, 3/5 under panic.
        assert!(withdrawal_share(&worried_log) > withdrawal_share(&calm_log) + 0.15);
        assert!(securities_share(&worried_log) > securities_share(&calm_log) + 0.08);
    }

    #[test]
    fn card_amounts_shrink_with_negative_adjustment() {
        let config = pinned_sensitivity(1.0);
        let card_max = config.card_amount.max;
        let mut calm = PopulationSimulator::with_seed(config.clone(), 23);
        let mut worried = anxious(config, 23);
        let adjustment = worried.personas()[0].sentiment_adjustment(worried.sentiment());
        let cap = Decimal::from_f64(card_max * (1.0 + adjustment * 0.2))
            .unwrap()
            .round();

        let card_amounts = |log: Vec<ActionRecord>| -> Vec<Decimal> {
            log.into_iter()
                .filter(|r| r.category() == ActionCategory::Card)
                .map(|r| r.amount)
                .collect()
        };
        let worried_cards = card_amounts(collect_ticks(&mut worried, 20));
        let calm_cards = card_amounts(collect_ticks(&mut calm, 20));

        assert!(!worried_cards.is_empty());
        assert!(worried_cards.iter().all(|amount| *amount <= cap));
        // Unscaled draws reach well past the scaled cap.
        assert!(calm_cards.iter().any(|amount| *amount > cap));
    }

    #[test]
    fn card_scale_floors_at_zero() {
        let config = PopulationConfig {
            card_sentiment_scale: 10.0,
            ..pinned_sensitivity(1.0)
        };
        let mut worried = anxious(config, 24);
        let log = collect_ticks(&mut worried, 5);
        let cards: Vec<_> = log
            .iter()
            .filter(|r| r.category() == ActionCategory::Card)
            .collect();
        assert!(!cards.is_empty());
        assert!(cards.iter().all(|r| r.amount == Decimal::ZERO));
    }

    #[test]
    fn empty_population_yields_empty_log() {
        let mut sim = PopulationSimulator::with_seed(small_config(0), 3);
        assert!(sim.generate_tick(ts()).is_empty());
    }
}
