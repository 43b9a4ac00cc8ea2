pub mod report;
pub mod scenarios;
pub mod seeds;

pub use scenarios::{ScenarioOutcome, get_scenario, list_scenarios};
pub use seeds::{SeedInfo, resolve_seed_inputs};
