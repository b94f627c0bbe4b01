use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::persona::RiskProfile;
use crate::sector::Sector;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Bank,
    Card,
    Securities,
    Insurance,
}

impl ActionCategory {
    pub const ALL: [ActionCategory; 4] = [
        ActionCategory::Bank,
        ActionCategory::Card,
        ActionCategory::Securities,
        ActionCategory::Insurance,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BankAction {
    Deposit,
    Withdrawal,
    LoanRepayment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardCategory {
    Food,
    Transport,
    Shopping,
    OnlineDelivery,
    Medical,
}

impl CardCategory {
    pub const ALL: [CardCategory; 5] = [
        CardCategory::Food,
        CardCategory::Transport,
        CardCategory::Shopping,
        CardCategory::OnlineDelivery,
        CardCategory::Medical,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceAction {
    PremiumPayment,
    AccidentClaim,
    CancellationInquiry,
}

impl InsuranceAction {
    pub const ALL: [InsuranceAction; 3] = [
        InsuranceAction::PremiumPayment,
        InsuranceAction::AccidentClaim,
        InsuranceAction::CancellationInquiry,
    ];
}

/// What a persona did, with category, sector and polarity fixed at generation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Action {
    Bank { kind: BankAction },
    Card { kind: CardCategory },
    Securities { side: TradeSide, sector: Sector },
    Insurance { kind: InsuranceAction },
}

impl Action {
    pub fn category(&self) -> ActionCategory {
        match self {
            Action::Bank { .. } => ActionCategory::Bank,
            Action::Card { .. } => ActionCategory::Card,
            Action::Securities { .. } => ActionCategory::Securities,
            Action::Insurance { .. } => ActionCategory::Insurance,
        }
    }

    /// Human-readable detail line for logs and the display layer.
    pub fn describe(&self, amount: Decimal) -> String {
        let won = amount.round();
        match self {
            Action::Bank { kind } => {
                let label = match kind {
                    BankAction::Deposit => "Deposit",
                    BankAction::Withdrawal => "Withdrawal",
                    BankAction::LoanRepayment => "Loan repayment",
                };
                format!("{label}: {won} KRW")
            }
            Action::Card { kind } => {
                let label = match kind {
                    CardCategory::Food => "Food",
                    CardCategory::Transport => "Transport",
                    CardCategory::Shopping => "Shopping",
                    CardCategory::OnlineDelivery => "Online delivery",
                    CardCategory::Medical => "Medical",
                };
                format!("{label} payment: {won} KRW")
            }
            Action::Securities { side, sector } => {
                let verb = match side {
                    TradeSide::Buy => "buy",
                    TradeSide::Sell => "sell",
                };
                format!("{sector} sector {verb}: {won} KRW")
            }
            Action::Insurance { kind } => match kind {
                InsuranceAction::PremiumPayment => "Insurance premium payment".to_string(),
                InsuranceAction::AccidentClaim => "Insurance accident claim".to_string(),
                InsuranceAction::CancellationInquiry => {
                    "Insurance cancellation inquiry".to_string()
                }
            },
        }
    }
}

/// How a record moves demand for a sector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    DeliverySpend,
    ShoppingSpend,
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SectorSignal {
    pub sector: Sector,
    pub kind: SignalKind,
}

/// One synthetic financial event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    pub timestamp: NaiveDateTime,
    pub persona_id: String,
    pub action: Action,
    pub detail: String,
    /// Non-negative KRW amount; zero for insurance events.
    pub amount: Decimal,
    pub risk_profile: RiskProfile,
}

impl ActionRecord {
    pub fn new(
        timestamp: NaiveDateTime,
        persona_id: &str,
        action: Action,
        amount: Decimal,
        risk_profile: RiskProfile,
    ) -> Self {
        let amount = amount.max(Decimal::ZERO);
        Self {
            timestamp,
            persona_id: persona_id.to_string(),
            detail: action.describe(amount),
            action,
            amount,
            risk_profile,
        }
    }

    pub fn category(&self) -> ActionCategory {
        self.action.category()
    }

    pub fn is_withdrawal(&self) -> bool {
        matches!(
            self.action,
            Action::Bank {
                kind: BankAction::Withdrawal
            }
        )
    }

    pub fn is_accident_claim(&self) -> bool {
        matches!(
            self.action,
            Action::Insurance {
                kind: InsuranceAction::AccidentClaim
            }
        )
    }

    /// Sector demand carried by this record, if any.
    ///
    /// Online delivery payments count toward platforms and shopping toward
    /// consumer goods; securities trades count toward the traded sector.
    /// Everything else carries no sector signal.
    pub fn sector_signal(&self) -> Option<SectorSignal> {
        match self.action {
            Action::Card {
                kind: CardCategory::OnlineDelivery,
            } => Some(SectorSignal {
                sector: Sector::Platform,
                kind: SignalKind::DeliverySpend,
            }),
            Action::Card {
                kind: CardCategory::Shopping,
            } => Some(SectorSignal {
                sector: Sector::ConsumerGoods,
                kind: SignalKind::ShoppingSpend,
            }),
            Action::Securities { side, sector } => Some(SectorSignal {
                sector,
                kind: match side {
                    TradeSide::Buy => SignalKind::Buy,
                    TradeSide::Sell => SignalKind::Sell,
                },
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 23)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn record(action: Action, amount: Decimal) -> ActionRecord {
        ActionRecord::new(ts(), "user_007", action, amount, RiskProfile::Stable)
    }

    #[test]
    fn delivery_and_shopping_map_to_spend_signals() {
        let delivery = record(
            Action::Card {
                kind: CardCategory::OnlineDelivery,
            },
            dec!(25000),
        );
        let shopping = record(
            Action::Card {
                kind: CardCategory::Shopping,
            },
            dec!(80000),
        );
        assert_eq!(
            delivery.sector_signal(),
            Some(SectorSignal {
                sector: Sector::Platform,
                kind: SignalKind::DeliverySpend
            })
        );
        assert_eq!(
            shopping.sector_signal().map(|s| s.sector),
            Some(Sector::ConsumerGoods)
        );
    }

    #[test]
    fn securities_signal_carries_side_and_sector() {
        let sell = record(
            Action::Securities {
                side: TradeSide::Sell,
                sector: Sector::Energy,
            },
            dec!(1500000),
        );
        assert_eq!(
            sell.sector_signal(),
            Some(SectorSignal {
                sector: Sector::Energy,
                kind: SignalKind::Sell
            })
        );
        assert_eq!(sell.detail, "Energy sector sell: 1500000 KRW");
    }

    #[test]
    fn unmatched_records_carry_no_signal() {
        let food = record(
            Action::Card {
                kind: CardCategory::Food,
            },
            dec!(12000),
        );
        let deposit = record(
            Action::Bank {
                kind: BankAction::Deposit,
            },
            dec!(300000),
        );
        assert!(food.sector_signal().is_none());
        assert!(deposit.sector_signal().is_none());
    }

    #[test]
    fn withdrawal_and_accident_predicates() {
        let withdrawal = record(
            Action::Bank {
                kind: BankAction::Withdrawal,
            },
            dec!(500000),
        );
        let claim = record(
            Action::Insurance {
                kind: InsuranceAction::AccidentClaim,
            },
            Decimal::ZERO,
        );
        assert!(withdrawal.is_withdrawal());
        assert!(!withdrawal.is_accident_claim());
        assert!(claim.is_accident_claim());
        assert_eq!(claim.category(), ActionCategory::Insurance);
        assert_eq!(claim.detail, "Insurance accident claim");
    }

    #[test]
    fn negative_amount_is_clamped_to_zero() {
        let r = record(
            Action::Card {
                kind: CardCategory::Medical,
            },
            dec!(-5),
        );
        assert_eq!(r.amount, Decimal::ZERO);
    }

    #[test]
    fn action_is_tagged_by_category() {
        let action = Action::Securities {
            side: TradeSide::Buy,
            sector: Sector::It,
        };
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(json["category"], "securities");
        assert_eq!(json["side"], "buy");
        assert_eq!(json["sector"], "it");
    }
}
