//! Farhold Game Engine
//!
//! Platform-agnostic core for the Farhold turn-based space strategy game.
//! This crate holds the complete simulation — movement, fog-of-war, combat,
//! conquest, and turn orchestration — with no IO, no wall clock, and no
//! rendering; everything random flows through the serialized in-state RNG.

pub mod combat;
pub mod commands;
pub mod conquest;
pub mod fleets;
pub mod galaxy;
pub mod geom;
pub mod ids;
pub mod movement;
pub mod numbers;
pub mod rng;
pub mod rules;
pub mod save;
pub mod seed;
pub mod ships;
pub mod turn;
pub mod visibility;
pub mod world;
pub mod worldgen;

// Re-export commonly used types
pub use combat::{Battle, BattleStatus, ShipSnapshot, run_combat_phase};
pub use commands::{Command, CommandError, CommandReceipt, dispatch_command};
pub use conquest::{ConquestOutcome, GroundResolution, run_conquest_phase};
pub use fleets::{Army, ArmyContainer, Fleet, FleetState, Ship};
pub use galaxy::{Planet, PlanetKind, StarSystem};
pub use geom::Vec3;
pub use ids::{ArmyId, BattleId, FactionId, FleetId, PlanetId, ShipId, SystemId};
pub use movement::{
    ArrivalOps, FuelShortage, JumpReceipt, MovementError, advance_fleets, can_pay_jump,
    compute_jump_cost, process_arrivals, validate_and_debit_jump,
};
pub use rng::{RngState, SimRng, pick_index, sample_ratio};
pub use rules::{GameRules, LandingRiskPolicy, RulesError, RulesOverlay};
pub use save::{SAVE_VERSION, SaveError, SaveGame, sanitize_state};
pub use seed::{decode_to_seed, encode_friendly, generate_code_from_entropy};
pub use ships::{ShipStats, ShipType, VolleyKind};
pub use turn::{
    OwnershipChange, TURN_REPORT_MARKER, TurnError, TurnReport, advance_turn, check_integrity,
};
pub use visibility::{WorldView, apply_fog, observed_systems, territory_owner};
pub use world::{Faction, PurgeSummary, VictoryState, WorldState};
pub use worldgen::{GalaxyConfig, WorldGenError};

/// Trait for abstracting save/load plumbing.
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist an encoded save payload under `save_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn write_save(&self, save_name: &str, payload: &str) -> Result<(), Self::Error>;

    /// Fetch the payload stored under `save_name`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn read_save(&self, save_name: &str) -> Result<Option<String>, Self::Error>;

    /// Delete the save stored under `save_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Main game engine for managing game instances
pub struct GameEngine<S>
where
    S: GameStorage,
{
    storage: S,
}

impl<S> GameEngine<S>
where
    S: GameStorage,
{
    /// Create a new game engine over the provided storage backend
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Generate a fresh world from the config and seed
    ///
    /// # Errors
    ///
    /// Returns an error if the galaxy config fails validation.
    pub fn create_game(
        &self,
        config: &GalaxyConfig,
        seed: u64,
    ) -> Result<WorldState, WorldGenError> {
        worldgen::generate(config, seed)
    }

    /// Wrap the state in a versioned envelope and persist it
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the storage write fails.
    pub fn save_game(
        &self,
        save_name: &str,
        state: &WorldState,
        created_at: &str,
    ) -> Result<(), anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let payload = SaveGame::wrap(state.clone(), created_at).encode()?;
        self.storage
            .write_save(save_name, &payload)
            .map_err(Into::into)
    }

    /// Load, version-gate, and sanitize a stored world
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails or the payload is
    /// malformed or from a newer build.
    pub fn load_game(&self, save_name: &str) -> Result<Option<WorldState>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        match self.storage.read_save(save_name).map_err(Into::into)? {
            Some(payload) => Ok(Some(SaveGame::decode(&payload)?.state)),
            None => Ok(None),
        }
    }

    /// Delete a stored save
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_save(&self, save_name: &str) -> Result<(), S::Error> {
        self.storage.delete_save(save_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, String>>>,
    }

    impl GameStorage for MemoryStorage {
        type Error = Infallible;

        fn write_save(&self, save_name: &str, payload: &str) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(save_name.to_string(), payload.to_string());
            Ok(())
        }

        fn read_save(&self, save_name: &str) -> Result<Option<String>, Self::Error> {
            Ok(self.saves.borrow().get(save_name).cloned())
        }

        fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(save_name);
            Ok(())
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_state() {
        let engine = GameEngine::new(MemoryStorage::default());
        let mut world = engine
            .create_game(&GalaxyConfig::default(), 0xABCD)
            .unwrap();
        let _ = turn::advance_turn(&mut world, &[]).unwrap();
        let digest = world.state_digest();
        engine.save_game("slot-one", &world, "2380-01-01").unwrap();

        let loaded = engine.load_game("slot-one").unwrap().expect("save exists");
        assert_eq!(loaded.day, 1);
        assert_eq!(loaded.state_digest(), digest);
        assert!(engine.load_game("missing-slot").unwrap().is_none());
    }

    #[test]
    fn delete_removes_the_save() {
        let engine = GameEngine::new(MemoryStorage::default());
        let world = engine.create_game(&GalaxyConfig::default(), 3).unwrap();
        engine.save_game("slot", &world, "").unwrap();
        engine.delete_save("slot").unwrap();
        assert!(engine.load_game("slot").unwrap().is_none());
    }
}
