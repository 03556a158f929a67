//! TOML-based scenario configuration.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Scenario loading or validation failure.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The scenario file could not be read.
    #[error("failed to read scenario file: {0}")]
    Io(String),
    /// The scenario file is not valid TOML for this schema.
    #[error("invalid scenario TOML: {0}")]
    Parse(String),
    /// A parameter violates a model precondition.
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// Top-level scenario configuration parsed from TOML.
///
/// All fields default to the demonstrator benchmark values, so an empty
/// TOML document is a valid scenario. Load with
/// [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global switches.
    pub simulation: SimulationConfig,
    /// Storage tank geometry and insulation.
    pub tank: TankConfig,
    /// Heat pump ratings and efficiencies.
    pub heat_pump: HeatPumpConfig,
    /// Consumer 1 heat exchanger.
    pub consumer1: ConsumerConfig,
    /// Consumer 2 heat exchanger.
    pub consumer2: ConsumerConfig,
    /// Flex-heat controller bounds and flow constants.
    pub flex_heat: FlexHeatConfig,
    /// Voltage controller thresholds and gains.
    pub voltage_control: VoltageControlConfig,
    /// Electrical feeder stand-in.
    pub grid: GridConfig,
    /// District-heating network stand-in.
    pub dh_network: DhNetworkConfig,
    /// Synthetic demand and generation profiles.
    pub profiles: ProfilesConfig,
}

/// Simulation timing and global switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Duration of one step (s).
    pub step_size_s: f64,
    /// Simulated horizon (s).
    pub horizon_s: u64,
    /// Master random seed.
    pub seed: u64,
    /// Whether the feeder-voltage control loop is active.
    pub voltage_control_enabled: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_size_s: 60.0,
            horizon_s: 24 * 60 * 60,
            seed: 42,
            voltage_control_enabled: true,
        }
    }
}

/// Storage tank geometry and insulation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TankConfig {
    /// Inner height of the water volume (m).
    pub inner_height_m: f64,
    /// Inner diameter of the water volume (m).
    pub inner_diameter_m: f64,
    /// Insulation thickness (m).
    pub insulation_thickness_m: f64,
    /// Steel shell thickness (m).
    pub steel_thickness_m: f64,
    /// Insulation thermal conductivity (W/(m·K)).
    pub lambda_insulation: f64,
    /// Steel thermal conductivity (W/(m·K)).
    pub lambda_steel: f64,
    /// Number of layers.
    pub n_layers: usize,
    /// Initial uniform temperature (°C).
    pub t_initial_c: f64,
    /// Ambient temperature (°C).
    pub t_ambient_c: f64,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            inner_height_m: 7.9,
            inner_diameter_m: 3.72,
            insulation_thickness_m: 0.1,
            steel_thickness_m: 0.02,
            lambda_insulation: 0.03,
            lambda_steel: 60.0,
            n_layers: 10,
            t_initial_c: 70.0,
            t_ambient_c: 8.0,
        }
    }
}

/// Heat pump ratings and efficiencies.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeatPumpConfig {
    /// System efficiency against the Lorenz cycle.
    pub eta_sys: f64,
    /// Compressor efficiency.
    pub eta_comp: f64,
    /// Actuation rate (1/s).
    pub lambda_comp: f64,
    /// Rated electrical power (kW).
    pub p_rated_kw: f64,
    /// Standby electrical consumption (kW).
    pub p_standby_kw: f64,
    /// Minimum evaporator outlet temperature (°C).
    pub t_evap_out_min_c: f64,
    /// Maximum condenser outlet temperature (°C).
    pub t_cond_out_max_c: f64,
    /// Condenser outlet temperature target (°C).
    pub t_cond_out_target_c: f64,
}

impl Default for HeatPumpConfig {
    fn default() -> Self {
        Self {
            eta_sys: 0.5,
            eta_comp: 0.7,
            lambda_comp: 0.2,
            p_rated_kw: 100.0,
            p_standby_kw: 0.3,
            t_evap_out_min_c: 20.0,
            t_cond_out_max_c: 85.0,
            t_cond_out_target_c: 75.0,
        }
    }
}

/// Consumer heat-exchanger parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerConfig {
    /// Return temperature set-point (°C).
    pub t_return_target_c: f64,
    /// Lowest physically sane return temperature (°C).
    pub t_return_min_c: f64,
    /// Minimum inlet flow (kg/s).
    pub mdot_min: f64,
    /// Maximum inlet flow (kg/s).
    pub mdot_max: f64,
    /// Valve relaxation constant (steps).
    pub relax_steps: f64,
    /// Largest per-step flow adjustment (kg/s).
    pub max_change_rate: f64,
    /// Initial inlet flow (kg/s).
    pub mdot_init: f64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            t_return_target_c: 40.0,
            t_return_min_c: 15.0,
            mdot_min: 0.01,
            mdot_max: 15.0,
            relax_steps: 10.0,
            max_change_rate: 1.0,
            mdot_init: 3.5,
        }
    }
}

/// Flex-heat controller bounds and flow constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlexHeatConfig {
    /// Tank temperature upper bound (°C).
    pub t_tank_max_c: f64,
    /// Tank temperature lower bound (°C).
    pub t_tank_min_c: f64,
    /// Fraction of rated power separating on- from off-requests.
    pub hp_threshold_frac: f64,
    /// Constant network bypass flow (kg/s).
    pub mdot_bypass: f64,
    /// Minimum forward flow through the tank branch (kg/s).
    pub mdot_forward_min: f64,
    /// Fixed tank-support discharge flow (kg/s).
    pub mdot_tank_support: f64,
    /// Magnitude cap on the heat-pump flow command (kg/s).
    pub mdot_hp_max: f64,
    /// Fixed condenser flow magnitude without voltage control (kg/s).
    pub mdot_hp_fixed: f64,
}

impl Default for FlexHeatConfig {
    fn default() -> Self {
        Self {
            t_tank_max_c: 72.0,
            t_tank_min_c: 65.0,
            hp_threshold_frac: 0.35,
            mdot_bypass: 0.5,
            mdot_forward_min: 0.11,
            mdot_tank_support: 2.0,
            mdot_hp_max: 10.0,
            mdot_hp_fixed: 3.5,
        }
    }
}

/// Voltage controller thresholds and gains.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VoltageControlConfig {
    /// Upper voltage-deviation threshold (p.u.).
    pub delta_vm_upper_pu: f64,
    /// Lower threshold while the pump runs (p.u.).
    pub delta_vm_lower_pu_hp_on: f64,
    /// Lower threshold while the pump is off (p.u.).
    pub delta_vm_lower_pu_hp_off: f64,
    /// Deadband width (p.u.).
    pub delta_vm_deadband: f64,
    /// Heat-pump rating seen by this controller (MW).
    pub p_rated_mw: f64,
    /// Minimum operating point as a fraction of the rating.
    pub p_min_frac: f64,
    /// Setpoint discretization step (MW).
    pub p_step_mw: f64,
    /// Minimum dwell between on/off switches (s); converted to steps with
    /// the simulation step size.
    pub min_dwell_s: u64,
    /// Proportional gain.
    pub k_p: f64,
}

impl Default for VoltageControlConfig {
    fn default() -> Self {
        Self {
            delta_vm_upper_pu: 0.1,
            delta_vm_lower_pu_hp_on: -0.1,
            delta_vm_lower_pu_hp_off: -0.08,
            delta_vm_deadband: 0.03,
            p_rated_mw: 0.1,
            p_min_frac: 0.4,
            p_step_mw: 0.005,
            min_dwell_s: 30 * 60,
            k_p: 0.15,
        }
    }
}

/// One feeder bus.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Bus name.
    pub name: String,
    /// Voltage sensitivity (p.u. per MW of aggregate net load).
    pub v_sensitivity_pu_per_mw: f64,
}

/// Electrical feeder stand-in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Slack voltage (p.u.).
    pub vm_slack_pu: f64,
    /// Buses, heat-pump bus first.
    pub buses: Vec<BusConfig>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            vm_slack_pu: 1.0,
            buses: vec![
                BusConfig {
                    name: "bus_1".to_string(),
                    v_sensitivity_pu_per_mw: 0.05,
                },
                BusConfig {
                    name: "bus_2".to_string(),
                    v_sensitivity_pu_per_mw: 0.03,
                },
            ],
        }
    }
}

/// District-heating network stand-in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DhNetworkConfig {
    /// External grid supply temperature (°C).
    pub t_supply_grid_c: f64,
    /// Constant bypass flow (kg/s).
    pub mdot_bypass: f64,
    /// Return temperature floor (°C).
    pub t_return_min_c: f64,
}

impl Default for DhNetworkConfig {
    fn default() -> Self {
        Self {
            t_supply_grid_c: 75.0,
            mdot_bypass: 0.5,
            t_return_min_c: 5.0,
        }
    }
}

/// A daily sinusoid profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SineProfileConfig {
    /// Baseline value.
    pub base: f64,
    /// Daily amplitude.
    pub amp: f64,
    /// Phase offset (radians).
    pub phase_rad: f64,
    /// Gaussian noise standard deviation.
    pub noise_std: f64,
}

/// A PV daylight-window profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PvProfileConfig {
    /// Peak generation (MW).
    pub peak: f64,
    /// Sunrise hour (0..24).
    pub sunrise_hour: u32,
    /// Sunset hour (0..24).
    pub sunset_hour: u32,
    /// Gaussian noise standard deviation.
    pub noise_std: f64,
}

/// Synthetic demand and generation profiles.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilesConfig {
    /// Consumer 1 heat demand (kW).
    pub heat_demand1: SineProfileConfig,
    /// Consumer 2 heat demand (kW).
    pub heat_demand2: SineProfileConfig,
    /// Electrical load at the heat-pump bus (MW).
    pub load1: SineProfileConfig,
    /// Electrical load at the far bus (MW).
    pub load2: SineProfileConfig,
    /// PV generation at the heat-pump bus (MW).
    pub pv1: PvProfileConfig,
    /// PV generation at the far bus (MW).
    pub pv2: PvProfileConfig,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            heat_demand1: SineProfileConfig {
                base: 450.0,
                amp: 150.0,
                phase_rad: 1.2,
                noise_std: 5.0,
            },
            heat_demand2: SineProfileConfig {
                base: 400.0,
                amp: 120.0,
                phase_rad: 0.8,
                noise_std: 5.0,
            },
            load1: SineProfileConfig {
                base: 0.4,
                amp: 0.2,
                phase_rad: 1.2,
                noise_std: 0.01,
            },
            load2: SineProfileConfig {
                base: 0.3,
                amp: 0.15,
                phase_rad: 0.9,
                noise_std: 0.01,
            },
            pv1: PvProfileConfig {
                peak: 0.5,
                sunrise_hour: 6,
                sunset_hour: 18,
                noise_std: 0.01,
            },
            pv2: PvProfileConfig {
                peak: 0.4,
                sunrise_hour: 6,
                sunset_hour: 18,
                noise_std: 0.01,
            },
        }
    }
}

impl ScenarioConfig {
    /// The built-in benchmark scenario.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Loads a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or the TOML is
    /// invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the TOML is invalid or contains unknown
    /// fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks every model precondition and returns all violations.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut invalid = |msg: String| errors.push(ConfigError::Invalid(msg));

        let s = &self.simulation;
        if s.step_size_s <= 0.0 {
            invalid(format!("step_size_s must be > 0, got {}", s.step_size_s));
        } else if (s.horizon_s as f64) < s.step_size_s {
            invalid(format!(
                "horizon_s {} is shorter than one step of {} s",
                s.horizon_s, s.step_size_s
            ));
        }

        if self.tank.n_layers < 2 {
            invalid(format!(
                "tank.n_layers must be >= 2, got {}",
                self.tank.n_layers
            ));
        }
        if self.tank.inner_height_m <= 0.0 || self.tank.inner_diameter_m <= 0.0 {
            invalid("tank geometry must be positive".to_string());
        }

        let hp = &self.heat_pump;
        if !(0.0..=1.0).contains(&hp.eta_sys) || hp.eta_sys == 0.0 {
            invalid(format!("heat_pump.eta_sys must be in (0, 1], got {}", hp.eta_sys));
        }
        if !(0.0..=1.0).contains(&hp.eta_comp) || hp.eta_comp == 0.0 {
            invalid(format!(
                "heat_pump.eta_comp must be in (0, 1], got {}",
                hp.eta_comp
            ));
        }
        if hp.p_rated_kw <= 0.0 {
            invalid(format!(
                "heat_pump.p_rated_kw must be > 0, got {}",
                hp.p_rated_kw
            ));
        }

        for (name, c) in [("consumer1", &self.consumer1), ("consumer2", &self.consumer2)] {
            if c.mdot_min <= 0.0 || c.mdot_min > c.mdot_max {
                invalid(format!(
                    "{name}: flow bounds [{}, {}] are not a valid range",
                    c.mdot_min, c.mdot_max
                ));
            }
            if c.relax_steps <= 0.0 {
                invalid(format!("{name}: relax_steps must be > 0"));
            }
        }

        if self.flex_heat.t_tank_min_c >= self.flex_heat.t_tank_max_c {
            invalid(format!(
                "flex_heat tank band [{}, {}] is inverted",
                self.flex_heat.t_tank_min_c, self.flex_heat.t_tank_max_c
            ));
        }

        let vc = &self.voltage_control;
        if vc.p_step_mw <= 0.0 {
            invalid(format!(
                "voltage_control.p_step_mw must be > 0, got {}",
                vc.p_step_mw
            ));
        }
        if vc.p_min_frac <= 0.0 || vc.p_min_frac > 1.0 {
            invalid(format!(
                "voltage_control.p_min_frac must be in (0, 1], got {}",
                vc.p_min_frac
            ));
        }
        if s.step_size_s > 0.0 && (vc.min_dwell_s as f64) < s.step_size_s {
            invalid(format!(
                "voltage_control.min_dwell_s {} is shorter than one step",
                vc.min_dwell_s
            ));
        }

        if self.grid.buses.len() < 2 {
            invalid(format!(
                "grid needs the heat-pump bus and at least one more, got {}",
                self.grid.buses.len()
            ));
        }

        for (name, pv) in [("pv1", &self.profiles.pv1), ("pv2", &self.profiles.pv2)] {
            if pv.sunrise_hour >= pv.sunset_hour || pv.sunset_hour > 24 {
                invalid(format!(
                    "profiles.{name}: daylight window {}..{} is invalid",
                    pv.sunrise_hour, pv.sunset_hour
                ));
            }
        }

        errors
    }
}
