//! Fixed search radii.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::strategy::SearchStrategy;

/// One of the supported search radii.
///
/// Cache keys, metadata keys and invalidation all iterate this set, so it is
/// the only place the band values are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DistanceBand {
    M300,
    M500,
    M700,
    M1000,
    M2000,
}

impl DistanceBand {
    /// Every band, ascending.
    pub const ALL: [DistanceBand; 5] = [
        DistanceBand::M300,
        DistanceBand::M500,
        DistanceBand::M700,
        DistanceBand::M1000,
        DistanceBand::M2000,
    ];

    /// The widest band. Nearest-POI search gives up beyond it.
    pub const MAX: DistanceBand = DistanceBand::M2000;

    /// Radius in meters.
    pub const fn meters(self) -> u32 {
        match self {
            DistanceBand::M300 => 300,
            DistanceBand::M500 => 500,
            DistanceBand::M700 => 700,
            DistanceBand::M1000 => 1000,
            DistanceBand::M2000 => 2000,
        }
    }

    /// Candidate strategy for this band's radius.
    pub fn strategy(self) -> SearchStrategy {
        SearchStrategy::for_radius(self.meters())
    }
}

/// A radius that is not one of the supported bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported distance band: {0} m (supported: 300, 500, 700, 1000, 2000)")]
pub struct InvalidBand(pub u32);

impl TryFrom<u32> for DistanceBand {
    type Error = InvalidBand;

    fn try_from(meters: u32) -> Result<Self, Self::Error> {
        DistanceBand::ALL
            .into_iter()
            .find(|band| band.meters() == meters)
            .ok_or(InvalidBand(meters))
    }
}

impl From<DistanceBand> for u32 {
    fn from(band: DistanceBand) -> Self {
        band.meters()
    }
}

impl FromStr for DistanceBand {
    type Err = InvalidBand;

    /// Accepts `"500"` and `"500m"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches('m');
        let meters: u32 = digits.parse().map_err(|_| InvalidBand(0))?;
        DistanceBand::try_from(meters)
    }
}

impl fmt::Display for DistanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.meters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GridResolution;

    #[test]
    fn test_all_is_ascending() {
        let meters: Vec<u32> = DistanceBand::ALL.iter().map(|b| b.meters()).collect();
        assert_eq!(meters, vec![300, 500, 700, 1000, 2000]);
    }

    #[test]
    fn test_try_from_accepts_only_listed_values() {
        assert_eq!(DistanceBand::try_from(700).unwrap(), DistanceBand::M700);
        assert_eq!(DistanceBand::try_from(850), Err(InvalidBand(850)));
        assert_eq!(DistanceBand::try_from(0), Err(InvalidBand(0)));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("500".parse::<DistanceBand>().unwrap(), DistanceBand::M500);
        assert_eq!("2000m".parse::<DistanceBand>().unwrap(), DistanceBand::M2000);
        assert!("abc".parse::<DistanceBand>().is_err());
        assert!("450".parse::<DistanceBand>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DistanceBand::M1000.to_string(), "1000m");
    }

    #[test]
    fn test_strategy_follows_table() {
        assert_eq!(DistanceBand::M300.strategy().resolution, GridResolution::Res10);
        assert_eq!(DistanceBand::M2000.strategy().resolution, GridResolution::Res7);
        assert_eq!(DistanceBand::M2000.strategy().k, 2);
    }

    #[test]
    fn test_serde_as_meters() {
        let json = serde_json::to_string(&DistanceBand::M700).unwrap();
        assert_eq!(json, "700");
        let band: DistanceBand = serde_json::from_str("300").unwrap();
        assert_eq!(band, DistanceBand::M300);
        assert!(serde_json::from_str::<DistanceBand>("123").is_err());
    }
}
