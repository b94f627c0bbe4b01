use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use maes_models::action::{ActionRecord, SignalKind};
use maes_models::config::CriticConfig;
use maes_models::portfolio::{FeedbackPayload, Portfolio};
use maes_models::sector::{Sector, SectorMap};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingSection {
    Health,
    Trends,
    Macro,
}

impl FindingSection {
    fn heading(&self) -> &'static str {
        match self {
            FindingSection::Health => "Portfolio Health",
            FindingSection::Trends => "Behavior & Trend Analysis",
            FindingSection::Macro => "Macro Risk & Other Suggestions",
        }
    }
}

/// A single observation from one audit pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    LowDiversification { count: usize, minimum: usize },
    Concentration { instrument: String, weight: f64, cap: f64 },
    PortfolioHealthy,
    Opportunity { sector: Sector, score: u32 },
    LowConfidence { log_size: usize },
    TrendsReflected,
    LiquidityRisk { withdrawals: usize },
    SystemicRisk { accidents: usize },
    NoMacroRisk,
}

impl Finding {
    pub fn section(&self) -> FindingSection {
        match self {
            Finding::LowDiversification { .. }
            | Finding::Concentration { .. }
            | Finding::PortfolioHealthy => FindingSection::Health,
            Finding::Opportunity { .. }
            | Finding::LowConfidence { .. }
            | Finding::TrendsReflected => FindingSection::Trends,
            Finding::LiquidityRisk { .. } | Finding::SystemicRisk { .. } | Finding::NoMacroRisk => {
                FindingSection::Macro
            }
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::LowDiversification { count, minimum } => write!(
                f,
                "ALERT: the portfolio holds only {count} instruments. Spread it over at least {minimum} to contain sector risk."
            ),
            Finding::Concentration {
                instrument,
                weight,
                cap,
            } => write!(
                f,
                "CAUTION: {instrument} weighs {:.1}%, above the {:.0}% single-instrument cap.",
                weight * 100.0,
                cap * 100.0
            ),
            Finding::PortfolioHealthy => write!(f, "Portfolio composition is stable."),
            Finding::Opportunity { sector, score } => write!(
                f,
                "OPPORTUNITY: customer behavior shows a strong {sector} signal (score {score}) that the portfolio does not reflect. Consider adding exposure."
            ),
            Finding::LowConfidence { log_size } => write!(
                f,
                "Only {log_size} behavior records this tick; signal confidence may be low."
            ),
            Finding::TrendsReflected => {
                write!(f, "Key customer trends are reflected in the portfolio.")
            }
            Finding::LiquidityRisk { withdrawals } => write!(
                f,
                "MACRO RISK: {withdrawals} deposit withdrawals detected. Watch for tightening liquidity or spreading anxiety."
            ),
            Finding::SystemicRisk { accidents } => write!(
                f,
                "SYSTEMIC RISK: {accidents} insurance accident claims filed. Prepare for volatility in insurance-related sectors."
            ),
            Finding::NoMacroRisk => write!(f, "No notable macro risk signals detected."),
        }
    }
}

/// One archived audit: structured findings, rendered text, and the feedback
/// handed to the next tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Critique {
    pub timestamp: NaiveDateTime,
    pub findings: Vec<Finding>,
    pub text: String,
    pub feedback: FeedbackPayload,
}

impl Critique {
    pub fn has_finding(&self, predicate: impl Fn(&Finding) -> bool) -> bool {
        self.findings.iter().any(predicate)
    }
}

/// Audits the portfolio against the behavior log and produces corrective
/// feedback. Keeps an append-only critique history for the display layer.
pub struct Critic {
    config: CriticConfig,
    sectors: Arc<SectorMap>,
    history: Vec<Critique>,
}

impl Critic {
    pub fn new(config: CriticConfig, sectors: Arc<SectorMap>) -> Self {
        Self {
            config,
            sectors,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Critique] {
        &self.history
    }

    pub fn latest(&self) -> Option<&Critique> {
        self.history.last()
    }

    /// Audit and return the critique text with the feedback payload.
    pub fn analyze(
        &mut self,
        timestamp: NaiveDateTime,
        portfolio: &Portfolio,
        log: &[ActionRecord],
    ) -> (String, FeedbackPayload) {
        let Critique { text, feedback, .. } = self.review(timestamp, portfolio, log);
        (text, feedback)
    }

    /// Audit and return the full structured critique. A copy is appended to
    /// the history.
    pub fn review(
        &mut self,
        timestamp: NaiveDateTime,
        portfolio: &Portfolio,
        log: &[ActionRecord],
    ) -> Critique {
        let mut findings = self.check_health(portfolio);

        let mut sector_recs = BTreeMap::new();
        findings.extend(self.analyze_trends(portfolio, log, &mut sector_recs));

        let (macro_findings, risk_sentiment) = self.check_macro(log);
        findings.extend(macro_findings);

        let instructions = self.instructions(risk_sentiment, &sector_recs);
        let feedback = FeedbackPayload {
            sector_recs,
            risk_sentiment,
            instructions,
        };
        let text = render(timestamp, &findings, &feedback.instructions);

        debug!(
            %timestamp,
            findings = findings.len(),
            risk_sentiment,
            recommendations = feedback.sector_recs.len(),
            "Critique produced"
        );

        let critique = Critique {
            timestamp,
            findings,
            text,
            feedback,
        };
        self.history.push(critique.clone());
        critique
    }

    fn check_health(&self, portfolio: &Portfolio) -> Vec<Finding> {
        let mut findings = Vec::new();
        if portfolio.len() < self.config.min_instruments {
            findings.push(Finding::LowDiversification {
                count: portfolio.len(),
                minimum: self.config.min_instruments,
            });
        }
        for (instrument, weight) in portfolio.iter() {
            if weight > self.config.concentration_cap {
                warn!(instrument, weight, "Concentration cap exceeded");
                findings.push(Finding::Concentration {
                    instrument: instrument.to_string(),
                    weight,
                    cap: self.config.concentration_cap,
                });
            }
        }
        if findings.is_empty() {
            findings.push(Finding::PortfolioHealthy);
        }
        findings
    }

    /// Count positive demand per sector (delivery spending and buys) and flag
    /// strong sectors the portfolio holds nothing of.
    fn analyze_trends(
        &self,
        portfolio: &Portfolio,
        log: &[ActionRecord],
        sector_recs: &mut BTreeMap<Sector, f64>,
    ) -> Vec<Finding> {
        let mut counts: BTreeMap<Sector, u32> = BTreeMap::new();
        for signal in log.iter().filter_map(ActionRecord::sector_signal) {
            if matches!(signal.kind, SignalKind::DeliverySpend | SignalKind::Buy) {
                *counts.entry(signal.sector).or_insert(0) += 1;
            }
        }

        let active: BTreeSet<Sector> = portfolio
            .iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(id, _)| self.sectors.sector_of(id))
            .collect();

        let mut findings = Vec::new();
        for (sector, score) in counts {
            if score >= self.config.strong_signal_threshold && !active.contains(&sector) {
                sector_recs.insert(sector, self.config.recommended_bump);
                findings.push(Finding::Opportunity { sector, score });
            }
        }

        if log.len() < self.config.min_log_size {
            findings.push(Finding::LowConfidence {
                log_size: log.len(),
            });
        } else if findings.is_empty() {
            findings.push(Finding::TrendsReflected);
        }
        findings
    }

    fn check_macro(&self, log: &[ActionRecord]) -> (Vec<Finding>, f64) {
        let withdrawals = log.iter().filter(|r| r.is_withdrawal()).count();
        let accidents = log.iter().filter(|r| r.is_accident_claim()).count();

        let mut findings = Vec::new();
        let mut risk_sentiment = 0.0;
        if withdrawals > self.config.withdrawal_alert_count {
            warn!(withdrawals, "Withdrawal surge detected");
            risk_sentiment -= self.config.withdrawal_penalty;
            findings.push(Finding::LiquidityRisk { withdrawals });
        }
        if accidents > self.config.accident_alert_count {
            warn!(accidents, "Accident claim surge detected");
            risk_sentiment -= self.config.accident_penalty;
            findings.push(Finding::SystemicRisk { accidents });
        }
        if findings.is_empty() {
            findings.push(Finding::NoMacroRisk);
        }
        (findings, f64::clamp(risk_sentiment, -1.0, 1.0))
    }

    fn instructions(
        &self,
        risk_sentiment: f64,
        sector_recs: &BTreeMap<Sector, f64>,
    ) -> Vec<String> {
        let mut instructions = Vec::new();
        if risk_sentiment < self.config.contraction_threshold {
            instructions.push(
                "Apply consumption contraction: expect more defensive spending across the population."
                    .to_string(),
            );
        }
        for (sector, bump) in sector_recs {
            if *bump != 0.0 {
                instructions.push(format!("Raise interest in sector {sector}."));
            }
        }
        instructions
    }
}

fn render(timestamp: NaiveDateTime, findings: &[Finding], instructions: &[String]) -> String {
    let mut text = format!("### Debater Critique ({})\n", timestamp.format("%Y-%m-%d %H:%M"));
    for section in [
        FindingSection::Health,
        FindingSection::Trends,
        FindingSection::Macro,
    ] {
        text.push_str(&format!("\n#### {}\n", section.heading()));
        for finding in findings.iter().filter(|f| f.section() == section) {
            text.push_str(&format!("- {finding}\n"));
        }
    }
    if !instructions.is_empty() {
        text.push_str("\n#### Instructions\n");
        for instruction in instructions {
            text.push_str(&format!("- {instruction}\n"));
        }
    }
    text
}
