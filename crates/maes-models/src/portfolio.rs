use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sector::Sector;

/// Instrument id -> weight.
///
/// Portfolios produced by the allocator always cover the whole universe and
/// sum to 1.0. [`Portfolio::new`] accepts arbitrary weights so that other
/// snapshots (hand-built or loaded) can be audited as well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct Portfolio {
    weights: BTreeMap<String, f64>,
}

impl Portfolio {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self { weights }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            weights: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Weight of an instrument, 0.0 if it is not held.
    pub fn weight(&self, instrument_id: &str) -> f64 {
        self.weights.get(instrument_id).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }
}

/// Structured correction emitted by the critic and consumed one tick later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FeedbackPayload {
    /// Sector -> recommended weight bump.
    pub sector_recs: BTreeMap<Sector, f64>,
    /// Scalar fed to the population's sentiment smoothing, roughly [-1, 1].
    pub risk_sentiment: f64,
    /// Explanatory only; no component acts on these.
    pub instructions: Vec<String>,
}

impl FeedbackPayload {
    pub fn recommended_bump(&self, sector: Sector) -> f64 {
        self.sector_recs.get(&sector).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_instrument_weighs_zero() {
        let p = Portfolio::from_pairs([("a", 0.3), ("b", 0.7)]);
        assert_eq!(p.weight("c"), 0.0);
        assert_eq!(p.len(), 2);
        assert!((p.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn portfolio_serializes_as_plain_map() {
        let p = Portfolio::from_pairs([("naver", 0.5), ("kia", 0.5)]);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["naver"], 0.5);
        let back: Portfolio = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn feedback_bump_defaults_to_zero() {
        let mut feedback = FeedbackPayload::default();
        feedback.sector_recs.insert(Sector::Bio, 0.05);
        assert_eq!(feedback.recommended_bump(Sector::Bio), 0.05);
        assert_eq!(feedback.recommended_bump(Sector::It), 0.0);
        assert_eq!(feedback.risk_sentiment, 0.0);
    }

    #[test]
    fn feedback_sector_keys_serialize_as_strings() {
        let mut feedback = FeedbackPayload::default();
        feedback.sector_recs.insert(Sector::Platform, 0.05);
        let json = serde_json::to_string(&feedback).unwrap();
        assert!(json.contains("\"platform\":0.05"));
    }
}
