use std::collections::BTreeMap;
use std::sync::Arc;

use maes_models::action::{ActionRecord, SignalKind};
use maes_models::config::AllocatorConfig;
use maes_models::portfolio::{FeedbackPayload, Portfolio};
use maes_models::sector::{Sector, SectorMap};
use tracing::debug;

use crate::error::SimError;

/// Sector -> demand score. Sectors absent from the map score 0.
pub type SectorScores = BTreeMap<Sector, f64>;

/// Turns behavior logs into sector scores and rebalances the portfolio over
/// the fixed universe.
pub struct Allocator {
    config: AllocatorConfig,
    sectors: Arc<SectorMap>,
    current: Option<Portfolio>,
}

impl Allocator {
    pub fn new(config: AllocatorConfig, sectors: Arc<SectorMap>) -> Self {
        Self {
            config,
            sectors,
            current: None,
        }
    }

    pub fn sector_map(&self) -> &SectorMap {
        &self.sectors
    }

    /// Current portfolio; `None` until the first successful rebalance.
    pub fn portfolio(&self) -> Option<&Portfolio> {
        self.current.as_ref()
    }

    /// Score each sector from one pass over the log: spending +1, buys +2,
    /// sells -1. Records without a sector signal are skipped.
    pub fn extract_signals(&self, log: &[ActionRecord]) -> SectorScores {
        let mut scores = SectorScores::new();
        for signal in log.iter().filter_map(ActionRecord::sector_signal) {
            let delta = match signal.kind {
                SignalKind::DeliverySpend | SignalKind::ShoppingSpend => 1.0,
                SignalKind::Buy => 2.0,
                SignalKind::Sell => -1.0,
            };
            *scores.entry(signal.sector).or_insert(0.0) += delta;
        }
        debug!(?scores, records = log.len(), "Sector signals extracted");
        scores
    }

    /// Compute portfolio weights from the current signals and the critic's
    /// previous feedback.
    ///
    /// Each instrument gets `max(floor, base + score * scale + bump)` for its
    /// sector; weights are then normalized to sum to 1. Instruments that
    /// normalization would push below the floor are pinned at the floor and
    /// the remainder is shared proportionally among the rest.
    pub fn optimize(
        &self,
        signals: &SectorScores,
        feedback: Option<&FeedbackPayload>,
    ) -> Result<Portfolio, SimError> {
        if self.sectors.is_empty() {
            return Err(SimError::EmptyUniverse);
        }
        let floor = self.config.floor;
        let count = self.sectors.len() as f64;
        if floor * count > 1.0 + 1e-12 {
            return Err(SimError::Config(format!(
                "allocator.floor {floor} cannot hold for {} instruments",
                self.sectors.len()
            )));
        }

        let raw: Vec<(String, f64)> = self
            .sectors
            .instruments()
            .iter()
            .map(|instrument| {
                let score = signals.get(&instrument.sector).copied().unwrap_or(0.0);
                let bump = feedback
                    .map(|f| f.recommended_bump(instrument.sector))
                    .unwrap_or(0.0);
                let weight =
                    (self.config.base_weight + score * self.config.scale + bump).max(floor);
                (instrument.id.clone(), weight)
            })
            .collect();

        let portfolio = Portfolio::new(normalize_with_floor(raw, floor));
        debug!(
            instruments = portfolio.len(),
            total = portfolio.total(),
            with_feedback = feedback.is_some(),
            "Portfolio optimized"
        );
        Ok(portfolio)
    }

    /// Optimize and keep the result as the current portfolio.
    pub fn rebalance(
        &mut self,
        signals: &SectorScores,
        feedback: Option<&FeedbackPayload>,
    ) -> Result<&Portfolio, SimError> {
        let portfolio = self.optimize(signals, feedback)?;
        let stored: &Portfolio = self.current.insert(portfolio);
        Ok(stored)
    }
}

fn normalize_with_floor(raw: Vec<(String, f64)>, floor: f64) -> BTreeMap<String, f64> {
    let n = raw.len();
    let mut pinned = vec![false; n];

    loop {
        let pinned_count = pinned.iter().filter(|p| **p).count();
        if pinned_count == n {
            let uniform = 1.0 / n as f64;
            return raw.into_iter().map(|(id, _)| (id, uniform)).collect();
        }
        let budget = 1.0 - floor * pinned_count as f64;
        let free_total: f64 = raw
            .iter()
            .zip(&pinned)
            .filter(|(_, p)| !**p)
            .map(|((_, w), _)| *w)
            .sum();
        let free_count = (n - pinned_count) as f64;
        let scaled = |w: f64| {
            if free_total > 0.0 {
                w * budget / free_total
            } else {
                budget / free_count
            }
        };

        let mut changed = false;
        for (i, (_, w)) in raw.iter().enumerate() {
            if !pinned[i] && scaled(*w) < floor {
                pinned[i] = true;
                changed = true;
            }
        }

        if !changed {
            return raw
                .into_iter()
                .zip(pinned)
                .map(|((id, w), p)| (id, if p { floor } else { scaled(w) }))
                .collect();
        }
    }
}
