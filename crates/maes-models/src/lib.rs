pub mod action;
pub mod config;
pub mod persona;
pub mod portfolio;
pub mod sector;

pub use action::{
    Action, ActionCategory, ActionRecord, BankAction, CardCategory, InsuranceAction, SectorSignal,
    SignalKind, TradeSide,
};
pub use config::{
    AllocatorConfig, AmountRange, CriticConfig, PopulationConfig, SessionConfig, SimConfig,
};
pub use persona::{Persona, RiskProfile};
pub use portfolio::{FeedbackPayload, Portfolio};
pub use sector::{Instrument, Sector, SectorMap};
