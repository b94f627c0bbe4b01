//! MAES - Multi-Agent ETF Simulator
//!
//! A synthetic customer population, a sector-signal portfolio allocator and a
//! rule-based critic, wired into a feedback loop: each tick's critique steers
//! the next tick's allocation and crowd sentiment.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use maes::models::config::SimConfig;
//! use maes::{build_session, Span};
//!
//! let mut session = build_session(&SimConfig::default()).unwrap();
//! session.run_span(Span::Day).unwrap();
//! println!("{:?}", session.portfolio());
//! ```

pub use maes_agents as agents;
pub use maes_models as models;

pub mod runner;
pub mod session;

pub use runner::Runner;
pub use session::{RunSummary, Session, Span, TickReport, TickSnapshot};

use maes_agents::{PopulationSimulator, SimError};
use maes_models::config::SimConfig;

/// Build a session with a synthetic population from configuration.
///
/// A configured population seed also seeds the performance track, so a
/// seeded run is fully replayable.
pub fn build_session(config: &SimConfig) -> Result<Session, SimError> {
    maes_agents::validate_config(config)?;
    let seed = config.population.seed;
    let population = PopulationSimulator::new(config.population.clone());
    Session::with_source(config, population, seed.map(|s| s.wrapping_add(1)))
}
