//! Ship roles and their fixed stat tables.
//!
//! Stats live in code, not data files: every balance number the resolvers
//! consume is a constant here, so two builds of the same version can never
//! disagree about a hull.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Accuracy bonus granted per point of experience, and its cap.
pub const EXPERIENCE_ACCURACY_STEP: f64 = 0.001;
pub const EXPERIENCE_ACCURACY_CAP: f64 = 0.10;

/// How a ship delivers its damage. Missiles can be intercepted by point
/// defense; beams cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolleyKind {
    Beam,
    Missile,
}

/// Fixed per-hull stats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipStats {
    pub max_hp: i32,
    pub fuel_capacity: f64,
    pub fuel_per_ly: f64,
    pub speed_ly_per_turn: f64,
    pub damage: i32,
    pub accuracy: f64,
    pub volley: VolleyKind,
    pub point_defense: f64,
    /// Armies this hull can carry. Zero for everything but transports.
    pub army_berths: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipType {
    Capital,
    Escort,
    Fighter,
    Bomber,
    Transport,
    Tanker,
    Extractor,
}

impl ShipType {
    pub const ALL: [Self; 7] = [
        Self::Capital,
        Self::Escort,
        Self::Fighter,
        Self::Bomber,
        Self::Transport,
        Self::Tanker,
        Self::Extractor,
    ];

    #[must_use]
    pub const fn stats(self) -> ShipStats {
        match self {
            Self::Capital => ShipStats {
                max_hp: 400,
                fuel_capacity: 400.0,
                fuel_per_ly: 4.0,
                speed_ly_per_turn: 4.0,
                damage: 40,
                accuracy: 0.65,
                volley: VolleyKind::Beam,
                point_defense: 6.0,
                army_berths: 0,
            },
            Self::Escort => ShipStats {
                max_hp: 150,
                fuel_capacity: 160.0,
                fuel_per_ly: 1.6,
                speed_ly_per_turn: 5.0,
                damage: 15,
                accuracy: 0.75,
                volley: VolleyKind::Beam,
                point_defense: 10.0,
                army_berths: 0,
            },
            Self::Fighter => ShipStats {
                max_hp: 30,
                fuel_capacity: 40.0,
                fuel_per_ly: 0.4,
                speed_ly_per_turn: 6.0,
                damage: 8,
                accuracy: 0.80,
                volley: VolleyKind::Beam,
                point_defense: 1.0,
                army_berths: 0,
            },
            Self::Bomber => ShipStats {
                max_hp: 45,
                fuel_capacity: 60.0,
                fuel_per_ly: 0.6,
                speed_ly_per_turn: 5.5,
                damage: 30,
                accuracy: 0.60,
                volley: VolleyKind::Missile,
                point_defense: 0.0,
                army_berths: 0,
            },
            Self::Transport => ShipStats {
                max_hp: 80,
                fuel_capacity: 100.0,
                fuel_per_ly: 2.0,
                speed_ly_per_turn: 3.5,
                damage: 0,
                accuracy: 0.0,
                volley: VolleyKind::Beam,
                point_defense: 0.0,
                army_berths: 1,
            },
            Self::Tanker => ShipStats {
                max_hp: 90,
                fuel_capacity: 600.0,
                fuel_per_ly: 1.2,
                speed_ly_per_turn: 3.5,
                damage: 0,
                accuracy: 0.0,
                volley: VolleyKind::Beam,
                point_defense: 0.0,
                army_berths: 0,
            },
            Self::Extractor => ShipStats {
                max_hp: 70,
                fuel_capacity: 120.0,
                fuel_per_ly: 1.0,
                speed_ly_per_turn: 3.0,
                damage: 0,
                accuracy: 0.0,
                volley: VolleyKind::Beam,
                point_defense: 0.0,
                army_berths: 0,
            },
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Capital => "capital",
            Self::Escort => "escort",
            Self::Fighter => "fighter",
            Self::Bomber => "bomber",
            Self::Transport => "transport",
            Self::Tanker => "tanker",
            Self::Extractor => "extractor",
        }
    }

    #[must_use]
    pub const fn is_strike_craft(self) -> bool {
        matches!(self, Self::Fighter | Self::Bomber)
    }

    /// Hulls that fire in fleet combat. Support hulls still soak damage but
    /// never acquire targets.
    #[must_use]
    pub const fn is_combatant(self) -> bool {
        self.stats().damage > 0
    }
}

impl fmt::Display for ShipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "capital" => Ok(Self::Capital),
            "escort" => Ok(Self::Escort),
            "fighter" => Ok(Self::Fighter),
            "bomber" => Ok(Self::Bomber),
            "transport" => Ok(Self::Transport),
            "tanker" => Ok(Self::Tanker),
            "extractor" => Ok(Self::Extractor),
            _ => Err(()),
        }
    }
}

impl From<ShipType> for String {
    fn from(value: ShipType) -> Self {
        value.as_str().to_string()
    }
}
