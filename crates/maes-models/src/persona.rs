use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::sector::Sector;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Stable,
    Neutral,
    Aggressive,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [
        RiskProfile::Stable,
        RiskProfile::Neutral,
        RiskProfile::Aggressive,
    ];
}

/// One synthetic customer. Created once with the population and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub id: String,
    pub age: u32,
    pub risk_profile: RiskProfile,
    /// Starting asset value in KRW.
    pub base_asset: Decimal,
    /// One or two sectors the persona trades in.
    pub preferred_sectors: Vec<Sector>,
    /// Multiplier applied to global sentiment before it biases this persona.
    pub sensitivity: f64,
}

impl Persona {
    /// Sentiment as felt by this persona.
    pub fn sentiment_adjustment(&self, global_sentiment: f64) -> f64 {
        global_sentiment * self.sensitivity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sentiment_adjustment_scales_by_sensitivity() {
        let persona = Persona {
            id: "user_001".to_string(),
            age: 34,
            risk_profile: RiskProfile::Neutral,
            base_asset: dec!(120000000),
            preferred_sectors: vec![Sector::It, Sector::Bio],
            sensitivity: 1.5,
        };
        assert!((persona.sentiment_adjustment(-0.4) - (-0.6)).abs() < 1e-12);
        assert_eq!(persona.sentiment_adjustment(0.0), 0.0);
    }

    #[test]
    fn risk_profile_serialization() {
        assert_eq!(
            serde_json::to_string(&RiskProfile::Aggressive).unwrap(),
            "\"aggressive\""
        );
    }
}
