pub mod allocator;
pub mod critic;
pub mod error;
pub mod population;

pub mod test_support;

pub use allocator::{Allocator, SectorScores};
pub use critic::{Critic, Critique, Finding, FindingSection};
pub use error::SimError;
pub use population::{BehaviorSource, PopulationSimulator};

use maes_models::SimConfig;

/// Validate a configuration, mapping failures to [`SimError::Config`].
pub fn validate_config(config: &SimConfig) -> Result<(), SimError> {
    config.validate().map_err(SimError::Config)
}
