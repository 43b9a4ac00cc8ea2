//! Versioned save envelope and load-time repair.
//!
//! Saves are a plain JSON envelope around [`WorldState`]. The format is
//! forward-gated: a payload declaring a newer version than this build
//! supports is refused outright rather than half-read. Everything else is
//! loaded permissively and then run through [`sanitize_state`], which
//! clamps out-of-range numbers and drops entities whose references no
//! longer resolve. A hand-edited or truncated save degrades; it never
//! panics a running game.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fleets::FleetState;
use crate::geom::Vec3;
use crate::ids::{FactionId, SystemId};
use crate::rng::SimRng;
use crate::world::{MAX_LOG_ENTRIES, MAX_MESSAGES, WorldState, truncate_front};

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save version {found} is newer than this build supports ({supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("malformed save payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    #[serde(default = "earliest_version")]
    pub version: u32,
    /// Caller-supplied timestamp label. The core never reads a clock.
    #[serde(default)]
    pub created_at: String,
    pub state: WorldState,
}

/// Saves written before the envelope carried a version field count as v1.
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default = "earliest_version")]
    version: u32,
}

const fn earliest_version() -> u32 {
    1
}

impl SaveGame {
    #[must_use]
    pub fn wrap(state: WorldState, created_at: impl Into<String>) -> Self {
        Self {
            version: SAVE_VERSION,
            created_at: created_at.into(),
            state,
        }
    }

    /// Serialize the envelope to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Malformed`] if the state cannot be serialized.
    pub fn encode(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse, version-gate, and sanitize a raw save payload.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::UnsupportedVersion`] for payloads from a newer
    /// build and [`SaveError::Malformed`] for undecodable JSON.
    pub fn decode(raw: &str) -> Result<Self, SaveError> {
        let probe: VersionProbe = serde_json::from_str(raw)?;
        if probe.version > SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion {
                found: probe.version,
                supported: SAVE_VERSION,
            });
        }
        let mut save: Self = serde_json::from_str(raw)?;
        sanitize_state(&mut save.state);
        Ok(save)
    }
}

/// Force a loaded world back inside the invariants the turn phases rely
/// on. Applied to every decoded save before anyone can act on it.
pub fn sanitize_state(world: &mut WorldState) {
    world.rules.sanitize();

    for system in &mut world.systems {
        if !system.position.is_finite() {
            system.position = Vec3::ZERO;
        }
    }
    // A fleet with no finite position cannot be placed anywhere sensible.
    world.fleets.retain(|fleet| fleet.position.is_finite());

    for fleet in &mut world.fleets {
        for ship in &mut fleet.ships {
            ship.clamp_vitals();
        }
    }
    for army in &mut world.armies {
        army.clamp_vitals();
    }

    repair_references(world);

    // A battle whose survivor list names hulls absent from its opening
    // roster is internally inconsistent and gets dropped.
    world.battles.retain(|battle| {
        battle
            .survivors
            .iter()
            .all(|id| battle.opening.iter().any(|snap| &snap.ship == id))
    });

    let _ = world.purge_destroyed();

    truncate_front(&mut world.logs, MAX_LOG_ENTRIES);
    truncate_front(&mut world.messages, MAX_MESSAGES);

    // Old saves carry only the scalar seed; rebuild the stream from it.
    if world.rng.is_unseeded() && world.seed != 0 {
        world.rng = SimRng::new(world.seed);
    }
}

fn repair_references(world: &mut WorldState) {
    let faction_ids: Vec<FactionId> = world
        .factions
        .iter()
        .map(|faction| faction.id.clone())
        .collect();
    for system in &mut world.systems {
        for planet in &mut system.planets {
            if planet
                .owner
                .as_ref()
                .is_some_and(|owner| !faction_ids.contains(owner))
            {
                planet.owner = None;
            }
        }
        system.refresh_ownership();
    }

    let system_ids: Vec<SystemId> = world
        .systems
        .iter()
        .map(|system| system.id.clone())
        .collect();
    let day = world.day;
    for fleet in &mut world.fleets {
        if fleet
            .orbit_system
            .as_ref()
            .is_some_and(|id| !system_ids.contains(id))
        {
            fleet.orbit_system = None;
        }
        let flight_plan_broken = fleet
            .target_system
            .as_ref()
            .is_some_and(|id| !system_ids.contains(id))
            || (fleet.state == FleetState::Moving
                && fleet
                    .target_position
                    .as_ref()
                    .is_none_or(|position| !position.is_finite()));
        if flight_plan_broken {
            fleet.clear_movement();
            fleet.set_state(FleetState::Orbit, day);
        }
        // Battles resolve inside a single turn, so a persisted Combat
        // state is always stale.
        if fleet.state == FleetState::Combat {
            fleet.set_state(FleetState::Orbit, day);
        }
    }
}
