//! Gameplay rule flags carried inside the world state.
//!
//! Rules deserialize leniently (`sanitize`) and validate strictly
//! (`validate`); scenario setups layer partial changes over defaults with
//! [`GameRules::with_overlay`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MIN_COMBAT_ROUNDS: u32 = 1;
pub const MAX_COMBAT_ROUNDS: u32 = 200;
pub const DEFAULT_COMBAT_ROUNDS: u32 = 20;
pub const DEFAULT_RETREAT_HULL_FRACTION: f32 = 0.25;

/// How invasion landings behave when the destination orbit is contested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingRiskPolicy {
    /// Land regardless; contested drops cost each army part of its strength.
    #[default]
    AlwaysLand,
    /// Abort the whole landing while any hostile fleet holds the orbit.
    AbortOnContest,
}

impl LandingRiskPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlwaysLand => "always_land",
            Self::AbortOnContest => "abort_on_contest",
        }
    }
}

impl fmt::Display for LandingRiskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LandingRiskPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always_land" => Ok(Self::AlwaysLand),
            "abort_on_contest" => Ok(Self::AbortOnContest),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RulesError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

/// World-level gameplay switches. Defaults describe the standard campaign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub fog_of_war: bool,
    pub unlimited_fuel: bool,
    pub landing_risk: LandingRiskPolicy,
    pub max_combat_rounds: u32,
    pub retreat_hull_fraction: f32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            fog_of_war: true,
            unlimited_fuel: false,
            landing_risk: LandingRiskPolicy::default(),
            max_combat_rounds: DEFAULT_COMBAT_ROUNDS,
            retreat_hull_fraction: DEFAULT_RETREAT_HULL_FRACTION,
        }
    }
}

impl GameRules {
    /// Strict validation for rule sets supplied by external callers.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range field.
    pub fn validate(&self) -> Result<(), RulesError> {
        if !(MIN_COMBAT_ROUNDS..=MAX_COMBAT_ROUNDS).contains(&self.max_combat_rounds) {
            return Err(RulesError::RangeViolation {
                field: "max_combat_rounds",
                min: f64::from(MIN_COMBAT_ROUNDS),
                max: f64::from(MAX_COMBAT_ROUNDS),
                value: f64::from(self.max_combat_rounds),
            });
        }
        if !self.retreat_hull_fraction.is_finite()
            || !(0.0..=1.0).contains(&self.retreat_hull_fraction)
        {
            return Err(RulesError::RangeViolation {
                field: "retreat_hull_fraction",
                min: 0.0,
                max: 1.0,
                value: f64::from(self.retreat_hull_fraction),
            });
        }
        Ok(())
    }

    /// Lenient repair for rule sets pulled from saves.
    pub fn sanitize(&mut self) {
        self.max_combat_rounds = self
            .max_combat_rounds
            .clamp(MIN_COMBAT_ROUNDS, MAX_COMBAT_ROUNDS);
        if !self.retreat_hull_fraction.is_finite() {
            self.retreat_hull_fraction = DEFAULT_RETREAT_HULL_FRACTION;
        }
        self.retreat_hull_fraction = self.retreat_hull_fraction.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn with_overlay(mut self, overlay: &RulesOverlay) -> Self {
        if let Some(fog_of_war) = overlay.fog_of_war {
            self.fog_of_war = fog_of_war;
        }
        if let Some(unlimited_fuel) = overlay.unlimited_fuel {
            self.unlimited_fuel = unlimited_fuel;
        }
        if let Some(landing_risk) = overlay.landing_risk {
            self.landing_risk = landing_risk;
        }
        if let Some(max_combat_rounds) = overlay.max_combat_rounds {
            self.max_combat_rounds = max_combat_rounds;
        }
        if let Some(retreat_hull_fraction) = overlay.retreat_hull_fraction {
            self.retreat_hull_fraction = retreat_hull_fraction;
        }
        self
    }
}

/// Partial rule overrides, usually parsed from scenario definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesOverlay {
    pub fog_of_war: Option<bool>,
    pub unlimited_fuel: Option<bool>,
    pub landing_risk: Option<LandingRiskPolicy>,
    pub max_combat_rounds: Option<u32>,
    pub retreat_hull_fraction: Option<f32>,
}
