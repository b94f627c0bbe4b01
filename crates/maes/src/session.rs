use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use maes_agents::{
    Allocator, BehaviorSource, Critic, Critique, PopulationSimulator, SectorScores, SimError,
};
use maes_models::action::ActionRecord;
use maes_models::config::{SessionConfig, SimConfig};
use maes_models::portfolio::{FeedbackPayload, Portfolio};
use maes_models::sector::SectorMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Batch lengths offered by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Span {
    Hour,
    Day,
    /// Thirty days.
    Month,
}

impl Span {
    /// Number of ticks covering this span, at least one.
    pub fn ticks(&self, tick_minutes: i64) -> u64 {
        let minutes: i64 = match self {
            Span::Hour => 60,
            Span::Day => 24 * 60,
            Span::Month => 30 * 24 * 60,
        };
        (minutes / tick_minutes.max(1)).max(1) as u64
    }
}

/// Archived state after one tick.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TickSnapshot {
    pub tick: u64,
    pub time: NaiveDateTime,
    pub portfolio: Portfolio,
    pub behaviors_count: usize,
    pub sentiment: f64,
    pub risk_sentiment: f64,
    pub cumulative_return: f64,
}

/// Everything one tick produced, for the display layer.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub run_id: Uuid,
    pub tick: u64,
    pub timestamp: NaiveDateTime,
    pub actions: usize,
    pub signals: SectorScores,
    pub portfolio: Portfolio,
    /// Sentiment the tick's behavior was generated under.
    pub sentiment_before: f64,
    /// Sentiment after folding in this tick's feedback; applies next tick.
    pub sentiment_after: f64,
    pub feedback: FeedbackPayload,
    pub critique: String,
    pub cumulative_return: f64,
}

/// End-of-run overview printed by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub ticks: u64,
    pub clock: NaiveDateTime,
    pub population: usize,
    pub sentiment: f64,
    pub cumulative_return: f64,
    pub portfolio: Option<Portfolio>,
    pub latest_critique: Option<Critique>,
    pub history: Vec<TickSnapshot>,
}

/// Illustrative cumulative-return random walk. Display only; nothing in the
/// loop reads it.
struct PerformanceTrack {
    rng: ChaCha8Rng,
    step: Normal<f64>,
    cumulative: f64,
}

impl PerformanceTrack {
    fn new(config: &SessionConfig, seed: Option<u64>) -> Result<Self, SimError> {
        let step = Normal::new(config.return_drift, config.return_volatility).map_err(|e| {
            SimError::Config(format!("session return distribution: {e}"))
        })?;
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            rng,
            step,
            cumulative: 0.0,
        })
    }

    fn advance(&mut self) -> f64 {
        self.cumulative += self.step.sample(&mut self.rng);
        self.cumulative
    }
}

/// Drives the loop one tick at a time: generate, extract, optimize,
/// critique, then hand the feedback to the next tick.
///
/// Feedback from tick `t` reaches the allocator and the population only at
/// tick `t + 1`.
pub struct Session<S = PopulationSimulator> {
    run_id: Uuid,
    population: S,
    allocator: Allocator,
    critic: Critic,
    config: SessionConfig,
    clock: NaiveDateTime,
    tick: u64,
    pending_feedback: Option<FeedbackPayload>,
    behavior_window: VecDeque<ActionRecord>,
    history: Vec<TickSnapshot>,
    performance: PerformanceTrack,
}

impl<S: BehaviorSource> Session<S> {
    /// Assemble a session around any behavior source. `seed` drives the
    /// performance track; `None` uses OS entropy.
    pub fn with_source(
        config: &SimConfig,
        population: S,
        seed: Option<u64>,
    ) -> Result<Self, SimError> {
        maes_agents::validate_config(config)?;
        let sectors = Arc::new(SectorMap::new(config.universe.clone()));
        let performance = PerformanceTrack::new(&config.session, seed)?;

        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            instruments = sectors.len(),
            population = population.population_size(),
            start = %config.session.start_time,
            "Session created"
        );

        Ok(Self {
            run_id,
            population,
            allocator: Allocator::new(config.allocator.clone(), Arc::clone(&sectors)),
            critic: Critic::new(config.critic.clone(), sectors),
            config: config.session.clone(),
            clock: config.session.start_time,
            tick: 0,
            pending_feedback: None,
            behavior_window: VecDeque::new(),
            history: Vec::new(),
            performance,
        })
    }

    /// Run one complete tick. Fails before touching any state when the
    /// clock cannot advance.
    pub fn step(&mut self) -> Result<TickReport, SimError> {
        let timestamp = self.clock;
        let next_clock = Duration::try_minutes(self.config.tick_minutes)
            .and_then(|tick| timestamp.checked_add_signed(tick))
            .ok_or_else(|| {
                SimError::Config(format!(
                    "session clock overflows advancing {} minutes past {timestamp}",
                    self.config.tick_minutes
                ))
            })?;
        let sentiment_before = self.population.sentiment();

        let log = self.population.generate_tick(timestamp);
        let signals = self.allocator.extract_signals(&log);
        let portfolio = self
            .allocator
            .rebalance(&signals, self.pending_feedback.as_ref())?
            .clone();
        let (critique, feedback) = self.critic.analyze(timestamp, &portfolio, &log);

        self.population.update_sentiment(feedback.risk_sentiment);
        let sentiment_after = self.population.sentiment();
        self.pending_feedback = Some(feedback.clone());

        let actions = log.len();
        self.behavior_window.extend(log);
        let overflow = self
            .behavior_window
            .len()
            .saturating_sub(self.config.behavior_window);
        self.behavior_window.drain(..overflow);

        let cumulative_return = self.performance.advance();
        self.tick += 1;
        self.history.push(TickSnapshot {
            tick: self.tick,
            time: timestamp,
            portfolio: portfolio.clone(),
            behaviors_count: actions,
            sentiment: sentiment_after,
            risk_sentiment: feedback.risk_sentiment,
            cumulative_return,
        });
        self.clock = next_clock;

        info!(
            tick = self.tick,
            %timestamp,
            actions,
            sentiment = sentiment_after,
            risk_sentiment = feedback.risk_sentiment,
            recommendations = feedback.sector_recs.len(),
            "Tick complete"
        );

        Ok(TickReport {
            run_id: self.run_id,
            tick: self.tick,
            timestamp,
            actions,
            signals,
            portfolio,
            sentiment_before,
            sentiment_after,
            feedback,
            critique,
            cumulative_return,
        })
    }

    /// Run `ticks` ticks, returning the last report.
    pub fn run(&mut self, ticks: u64) -> Result<Option<TickReport>, SimError> {
        let mut last = None;
        for _ in 0..ticks {
            last = Some(self.step()?);
        }
        Ok(last)
    }

    pub fn run_span(&mut self, span: Span) -> Result<Option<TickReport>, SimError> {
        self.run(span.ticks(self.config.tick_minutes))
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn clock(&self) -> NaiveDateTime {
        self.clock
    }

    pub fn ticks_run(&self) -> u64 {
        self.tick
    }

    pub fn population(&self) -> &S {
        &self.population
    }

    pub fn sentiment(&self) -> f64 {
        self.population.sentiment()
    }

    pub fn portfolio(&self) -> Option<&Portfolio> {
        self.allocator.portfolio()
    }

    /// Feedback waiting to be applied on the next tick.
    pub fn pending_feedback(&self) -> Option<&FeedbackPayload> {
        self.pending_feedback.as_ref()
    }

    pub fn critiques(&self) -> &[Critique] {
        self.critic.history()
    }

    pub fn latest_critique(&self) -> Option<&Critique> {
        self.critic.latest()
    }

    pub fn history(&self) -> &[TickSnapshot] {
        &self.history
    }

    pub fn window_len(&self) -> usize {
        self.behavior_window.len()
    }

    /// Up to `n` most recent action records, newest first.
    pub fn recent_actions(&self, n: usize) -> Vec<&ActionRecord> {
        self.behavior_window.iter().rev().take(n).collect()
    }

    pub fn cumulative_return(&self) -> f64 {
        self.performance.cumulative
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            ticks: self.tick,
            clock: self.clock,
            population: self.population.population_size(),
            sentiment: self.sentiment(),
            cumulative_return: self.cumulative_return(),
            portfolio: self.portfolio().cloned(),
            latest_critique: self.latest_critique().cloned(),
            history: self.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maes_agents::test_support::ScriptedBehaviorSource;

    #[test]
    fn span_ticks_follow_tick_length() {
        assert_eq!(Span::Hour.ticks(60), 1);
        assert_eq!(Span::Day.ticks(60), 24);
        assert_eq!(Span::Month.ticks(60), 720);
        assert_eq!(Span::Hour.ticks(15), 4);
        assert_eq!(Span::Hour.ticks(120), 1);
    }

    #[test]
    fn clock_advances_by_tick_length() {
        let config = SimConfig::default();
        let mut session =
            Session::with_source(&config, ScriptedBehaviorSource::new(vec![]), Some(1)).unwrap();
        let start = session.clock();
        session.run(3).unwrap();
        assert_eq!(session.clock(), start + Duration::hours(3));
        assert_eq!(session.ticks_run(), 3);
        assert_eq!(session.history()[2].time, start + Duration::hours(2));
    }

    #[test]
    fn performance_track_is_seeded() {
        let config = SimConfig::default();
        let mut a =
            Session::with_source(&config, ScriptedBehaviorSource::new(vec![]), Some(9)).unwrap();
        let mut b =
            Session::with_source(&config, ScriptedBehaviorSource::new(vec![]), Some(9)).unwrap();
        a.run(5).unwrap();
        b.run(5).unwrap();
        assert_eq!(a.cumulative_return(), b.cumulative_return());
        assert_ne!(a.cumulative_return(), 0.0);
    }

    #[test]
    fn negative_volatility_is_a_config_error() {
        let mut config = SimConfig::default();
        config.session.return_volatility = -1.0;
        let result = Session::with_source(&config, ScriptedBehaviorSource::new(vec![]), Some(1));
        assert!(matches!(result, Err(SimError::Config(_))));
    }
}
