//! Shared fixtures for integration tests.

use mes_sim::config::ScenarioConfig;

/// Baseline scenario shortened to the given horizon.
pub fn short_scenario(horizon_s: u64, voltage_control_enabled: bool) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.horizon_s = horizon_s;
    cfg.simulation.voltage_control_enabled = voltage_control_enabled;
    cfg
}
