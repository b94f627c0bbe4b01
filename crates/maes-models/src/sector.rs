use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse industry grouping shared by instruments and behavioral signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    It,
    Finance,
    Bio,
    Manufacturing,
    Energy,
    ConsumerGoods,
    Platform,
    /// Fallback bucket for instruments missing from the sector map.
    Other,
}

impl Sector {
    /// Sectors a persona can list as preferred.
    pub const PERSONA_SECTORS: [Sector; 6] = [
        Sector::It,
        Sector::Finance,
        Sector::Bio,
        Sector::Manufacturing,
        Sector::Energy,
        Sector::ConsumerGoods,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Sector::It => "IT",
            Sector::Finance => "Finance",
            Sector::Bio => "Bio",
            Sector::Manufacturing => "Manufacturing",
            Sector::Energy => "Energy",
            Sector::ConsumerGoods => "Consumer Goods",
            Sector::Platform => "Platform",
            Sector::Other => "Other",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tradable instrument in the fixed universe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub id: String,
    pub name: String,
    /// Market-data ticker. Carried for the display layer; the loop never reads prices.
    pub ticker: String,
    pub sector: Sector,
}

impl Instrument {
    pub fn new(id: &str, name: &str, ticker: &str, sector: Sector) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ticker: ticker.to_string(),
            sector,
        }
    }
}

/// The instrument universe together with its instrument -> sector lookup.
///
/// Both the allocator and the critic hold the same `Arc<SectorMap>`, so the
/// sector assignment of an instrument is defined in exactly one place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectorMap {
    instruments: Vec<Instrument>,
}

impl SectorMap {
    /// Build from an instrument list. Later duplicates of an id are dropped.
    pub fn new(instruments: Vec<Instrument>) -> Self {
        let mut unique: Vec<Instrument> = Vec::with_capacity(instruments.len());
        for instrument in instruments {
            if !unique.iter().any(|i| i.id == instrument.id) {
                unique.push(instrument);
            }
        }
        Self {
            instruments: unique,
        }
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument_ids(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|i| i.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Sector of an instrument; unknown ids land in [`Sector::Other`].
    pub fn sector_of(&self, instrument_id: &str) -> Sector {
        self.instruments
            .iter()
            .find(|i| i.id == instrument_id)
            .map(|i| i.sector)
            .unwrap_or(Sector::Other)
    }

    pub fn ticker_of(&self, instrument_id: &str) -> Option<&str> {
        self.instruments
            .iter()
            .find(|i| i.id == instrument_id)
            .map(|i| i.ticker.as_str())
    }

    /// The default ten-instrument KOSPI universe.
    pub fn default_instruments() -> Vec<Instrument> {
        vec![
            Instrument::new("samsung_electronics", "Samsung Electronics", "005930.KS", Sector::It),
            Instrument::new("sk_hynix", "SK hynix", "000660.KS", Sector::It),
            Instrument::new(
                "lg_energy_solution",
                "LG Energy Solution",
                "373220.KS",
                Sector::Energy,
            ),
            Instrument::new("samsung_biologics", "Samsung Biologics", "207940.KS", Sector::Bio),
            Instrument::new("hyundai_motor", "Hyundai Motor", "005380.KS", Sector::Manufacturing),
            Instrument::new("naver", "NAVER", "035420.KS", Sector::Platform),
            Instrument::new("kakao", "Kakao", "035720.KS", Sector::Platform),
            Instrument::new("posco_holdings", "POSCO Holdings", "005490.KS", Sector::Manufacturing),
            Instrument::new("kia", "Kia", "000270.KS", Sector::Manufacturing),
            Instrument::new("celltrion", "Celltrion", "068270.KS", Sector::Bio),
        ]
    }
}
