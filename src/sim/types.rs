//! Core simulation types: configuration, attribute access, and step records.

use std::fmt;

use crate::error::SimError;

/// Centralized simulation configuration.
///
/// All components and the engine reference this struct for timing
/// parameters; the step duration is fixed for the whole run.
///
/// # Examples
///
/// ```
/// use mes_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(60.0, 24 * 60 * 60, 42);
/// assert_eq!(cfg.total_steps(), 1440);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Duration of one step (s).
    pub step_size_s: f64,
    /// Simulated horizon (s).
    pub horizon_s: u64,
    /// Master random seed for the synthetic profiles.
    pub seed: u64,
}

impl SimConfig {
    /// Creates a new simulation configuration.
    ///
    /// # Panics
    ///
    /// Panics if the step size is not positive or the horizon is shorter
    /// than one step.
    pub fn new(step_size_s: f64, horizon_s: u64, seed: u64) -> Self {
        assert!(step_size_s > 0.0, "step_size_s must be > 0");
        assert!(
            horizon_s as f64 >= step_size_s,
            "horizon must cover at least one step"
        );
        Self {
            step_size_s,
            horizon_s,
            seed,
        }
    }

    /// Number of whole steps in the horizon.
    pub fn total_steps(&self) -> usize {
        (self.horizon_s as f64 / self.step_size_s) as usize
    }
}

/// Pull-style attribute access, the uniform read surface every component
/// exposes to the driver and the results collector.
///
/// Unknown attribute names are a contract violation, not a soft miss.
pub trait ReadAttribute {
    /// Stable component name used in error messages and CSV headers.
    fn component_name(&self) -> &'static str;

    /// Reads one named input or output attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownAttribute`] for names the component does
    /// not expose.
    fn read(&self, attribute: &str) -> Result<f64, SimError>;

    /// Builds the error for an attribute this component does not expose.
    fn unknown_attribute(&self, attribute: &str) -> SimError {
        SimError::UnknownAttribute {
            component: self.component_name(),
            attribute: attribute.to_string(),
        }
    }
}

/// Complete record of one simulation step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Step index.
    pub step: usize,
    /// Simulation time (s).
    pub time_s: f64,
    /// Tank top-layer temperature (°C).
    pub t_tank_hot: f64,
    /// Tank bottom-layer temperature (°C).
    pub t_tank_cold: f64,
    /// Tank mean temperature (°C).
    pub t_tank_avg: f64,
    /// Tank charge inlet flow (kg/s, >= 0).
    pub mdot_tank_ch_in: f64,
    /// Tank discharge outlet flow (kg/s, <= 0).
    pub mdot_tank_dis_out: f64,
    /// Heat pump condenser heat flow (kW).
    pub qdot_cond_kw: f64,
    /// Heat pump evaporator heat flow (kW).
    pub qdot_evap_kw: f64,
    /// Heat pump electrical power (kW).
    pub p_hp_effective_kw: f64,
    /// Heat pump electrical setpoint from the voltage controller (kW).
    pub p_hp_setpoint_kw: f64,
    /// Heat pump condenser outlet temperature (°C).
    pub t_cond_out: f64,
    /// Consumer 1 inlet flow (kg/s).
    pub mdot_cons1: f64,
    /// Consumer 2 inlet flow (kg/s).
    pub mdot_cons2: f64,
    /// Consumer 1 heat demand (kW).
    pub p_heat_cons1_kw: f64,
    /// Consumer 2 heat demand (kW).
    pub p_heat_cons2_kw: f64,
    /// Voltage at the heat-pump bus (p.u.).
    pub vm_pu: f64,
    /// Flex-heat controller state number (1..6).
    pub controller_state: u8,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>6} ({:>8.0}s) | tank hot={:>5.2}°C cold={:>5.2}°C | \
             hp P={:>6.2} kW set={:>6.2} kW Qc={:>6.2} kW | \
             cons=({:.2}, {:.2}) kg/s | v={:.4} pu | state={}",
            self.step,
            self.time_s,
            self.t_tank_hot,
            self.t_tank_cold,
            self.p_hp_effective_kw,
            self.p_hp_setpoint_kw,
            self.qdot_cond_kw,
            self.mdot_cons1,
            self.mdot_cons2,
            self.vm_pu,
            self.controller_state,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_config_basic() {
        let cfg = SimConfig::new(60.0, 3600, 7);
        assert_eq!(cfg.total_steps(), 60);
        assert_eq!(cfg.seed, 7);
    }

    #[test]
    fn sim_config_truncates_partial_steps() {
        let cfg = SimConfig::new(60.0, 3599, 0);
        assert_eq!(cfg.total_steps(), 59);
    }

    #[test]
    #[should_panic]
    fn sim_config_zero_step_panics() {
        SimConfig::new(0.0, 3600, 0);
    }

    #[test]
    fn step_record_display_does_not_panic() {
        let r = StepRecord {
            step: 0,
            time_s: 0.0,
            t_tank_hot: 70.0,
            t_tank_cold: 69.5,
            t_tank_avg: 69.8,
            mdot_tank_ch_in: 3.5,
            mdot_tank_dis_out: -0.11,
            qdot_cond_kw: 120.0,
            qdot_evap_kw: 85.0,
            p_hp_effective_kw: 42.0,
            p_hp_setpoint_kw: 40.0,
            t_cond_out: 75.0,
            mdot_cons1: 3.2,
            mdot_cons2: 2.9,
            p_heat_cons1_kw: 400.0,
            p_heat_cons2_kw: 380.0,
            vm_pu: 0.987,
            controller_state: 2,
        };
        assert!(!format!("{r}").is_empty());
    }
}
