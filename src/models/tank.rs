//! Stratified water storage tank: N-layer finite-volume thermal model.

use std::f64::consts::PI;

use crate::error::SimError;
use crate::sim::types::ReadAttribute;
use crate::util::{CP_WATER_J, RHO_WATER};

/// Construction parameters for [`StratifiedTank`].
///
/// Defaults describe the demonstrator tank: 7.9 m inner height, 3.72 m
/// inner diameter, 10 control volumes, initially uniform at 70 °C.
#[derive(Debug, Clone)]
pub struct TankParams {
    /// Inner height of the water volume (m).
    pub inner_height_m: f64,
    /// Inner diameter of the water volume (m).
    pub inner_diameter_m: f64,
    /// Insulation layer thickness (m).
    pub insulation_thickness_m: f64,
    /// Structural steel shell thickness (m).
    pub steel_thickness_m: f64,
    /// Thermal conductivity of the insulation (W/(m·K)).
    pub lambda_insulation: f64,
    /// Thermal conductivity of the steel shell (W/(m·K)).
    pub lambda_steel: f64,
    /// Number of layers (control volumes) dividing the tank volume.
    pub n_layers: usize,
    /// Initial uniform water temperature (°C).
    pub t_initial_c: f64,
    /// Ambient temperature around the tank shell (°C).
    pub t_ambient_c: f64,
}

impl Default for TankParams {
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

/// Stratified water storage tank.
///
/// The water volume is divided into `n_layers` control volumes of equal
/// mass, indexed top to bottom (layer 0 is the hottest under normal
/// stratification). Each [`step`](StratifiedTank::step) integrates every
/// layer once with an explicit Euler update: axial conduction through the
/// water and wall, heat loss to ambient, and advective exchange with the
/// neighbouring layer in the direction of the active transport mode.
///
/// # Flow Convention
/// - `mdot_ch_in >= 0`: charge flow entering at the top
/// - `mdot_dis_out <= 0`: discharge flow leaving at the top
///
/// Charging and discharging may be active in the same step; the sweeps are
/// applied in that order. Violating either sign bound is a contract breach
/// and fails the step.
#[derive(Debug, Clone)]
pub struct StratifiedTank {
    params: TankParams,

    // Derived geometry and wall properties, fixed at construction.
    layer_water_mass_kg: f64,
    layer_length_m: f64,
    layer_wall_area_m2: f64,
    cross_water_area_m2: f64,
    u_wall: f64,
    lambda_eff: f64,

    /// Layer temperatures (°C), index 0 = top.
    layers: Vec<f64>,

    // Last applied inputs.
    mdot_ch_in: f64,
    mdot_dis_out: f64,
    t_ch_in: f64,
    t_dis_in: f64,

    // Outputs.
    t_hot: f64,
    t_cold: f64,
    t_out: f64,
    mdot_ch_out: f64,
    mdot_dis_in: f64,
}

impl StratifiedTank {
    /// Creates a tank with uniform initial temperature and derives all
    /// geometric and wall-transmittance terms.
    ///
    /// # Panics
    ///
    /// Panics if the geometry is non-positive or `n_layers < 2` (the layer
    /// update needs distinct top and bottom boundary volumes).
    pub fn new(params: TankParams) -> Self {
        assert!(params.inner_height_m > 0.0);
        assert!(params.inner_diameter_m > 0.0);
        assert!(params.insulation_thickness_m > 0.0);
        assert!(params.steel_thickness_m > 0.0);
        assert!(params.n_layers >= 2, "tank needs at least 2 layers");

        let r = params.inner_diameter_m / 2.0;
        let water_volume = PI * r * r * params.inner_height_m;
        let water_mass = RHO_WATER * water_volume;

        let cross_water_area = 2.0 * PI * r * r;
        let t_ins = params.insulation_thickness_m;
        let t_steel = params.steel_thickness_m;
        let cross_insulation_area = 4.0 * PI * PI * (r + t_ins / 2.0) * (t_ins / 2.0);
        let cross_steel_area = 4.0 * PI * PI * (r + t_steel / 2.0) * (t_steel / 2.0);

        // Series wall resistance: insulation + steel shell.
        let r_wall = t_ins / params.lambda_insulation + t_steel / params.lambda_steel;
        let u_wall = 1.0 / r_wall;
        let lambda_wall = u_wall * (t_ins + t_steel);
        // Axial conduction through the wall cross-section augments the
        // water-to-water conduction between layers.
        let delta_lambda =
            lambda_wall * (cross_steel_area + cross_insulation_area) / cross_water_area;

        let n = params.n_layers;
        let layer_length = params.inner_height_m / n as f64;
        let layer_water_mass = water_mass / n as f64;
        let layer_wall_area = 2.0 * PI * r * r + 2.0 * PI * r * layer_length;

        let t0 = params.t_initial_c;
        Self {
            layer_water_mass_kg: layer_water_mass,
            layer_length_m: layer_length,
            layer_wall_area_m2: layer_wall_area,
            cross_water_area_m2: cross_water_area,
            u_wall,
            lambda_eff: lambda_wall + delta_lambda,
            layers: vec![t0; n],
            mdot_ch_in: 0.0,
            mdot_dis_out: 0.0,
            t_ch_in: t0,
            t_dis_in: t0,
            t_hot: t0,
            t_cold: t0,
            t_out: t0,
            mdot_ch_out: 0.0,
            mdot_dis_in: 0.0,
            params,
        }
    }

    /// Integrates all layer temperatures over one step of `dt` seconds.
    ///
    /// # Arguments
    ///
    /// * `mdot_ch_in` - Charge mass flow entering the top (kg/s, >= 0)
    /// * `t_ch_in` - Charge inlet temperature (°C)
    /// * `mdot_dis_out` - Discharge mass flow leaving the top (kg/s, <= 0)
    /// * `t_dis_in` - Discharge inlet temperature at the bottom (°C)
    /// * `dt` - Step duration (s)
    ///
    /// # Errors
    ///
    /// Returns [`SimError::FlowSignConvention`] when a charge flow is
    /// negative or a discharge flow positive; the tank state is untouched
    /// in that case.
    pub fn step(
        &mut self,
        mdot_ch_in: f64,
        t_ch_in: f64,
        mdot_dis_out: f64,
        t_dis_in: f64,
        dt: f64,
    ) -> Result<(), SimError> {
        if mdot_ch_in < 0.0 || mdot_dis_out > 0.0 {
            return Err(SimError::FlowSignConvention {
                mdot_ch_in,
                mdot_dis_out,
            });
        }

        self.mdot_ch_in = mdot_ch_in;
        self.t_ch_in = t_ch_in;
        self.mdot_dis_out = mdot_dis_out;
        self.t_dis_in = t_dis_in;

        let n = self.layers.len();
        let bottom = n - 1;

        if mdot_ch_in > 0.0 {
            // Charging: water advects downward, top layer receives the
            // inlet. The sweep runs top to bottom in place, so each layer
            // sees the already-updated temperature above it.
            let mdot_down = mdot_ch_in;
            for i in 0..n {
                let rate = if i == 0 {
                    self.conduction(i, i + 1)
                        + self.ambient_loss(i)
                        - mdot_down * CP_WATER_J * self.layers[i]
                        + mdot_ch_in * CP_WATER_J * t_ch_in
                } else if i < bottom {
                    self.conduction(i, i + 1)
                        + self.conduction(i, i - 1)
                        + self.ambient_loss(i)
                        + mdot_down * CP_WATER_J * self.layers[i - 1]
                        - mdot_down * CP_WATER_J * self.layers[i]
                } else {
                    // Bottom boundary discharges the charge flow at the
                    // cold outlet.
                    self.conduction(i, i - 1)
                        + self.ambient_loss(i)
                        + mdot_down * CP_WATER_J * self.layers[i - 1]
                        - mdot_ch_in * CP_WATER_J * self.layers[i]
                };
                self.layers[i] += rate / (self.layer_water_mass_kg * CP_WATER_J) * dt;
            }
            self.t_out = self.layers[bottom];
        }

        if mdot_dis_out < 0.0 {
            // Discharging: water advects upward, inlet at the bottom,
            // outlet at the top. Sweep runs bottom to top in place.
            let mdot_up = -mdot_dis_out;
            for i in (0..n).rev() {
                let rate = if i == bottom {
                    self.conduction(i, i - 1)
                        + self.ambient_loss(i)
                        - mdot_up * CP_WATER_J * self.layers[i]
                        + mdot_up * CP_WATER_J * t_dis_in
                } else if i > 0 {
                    self.conduction(i, i + 1)
                        + self.conduction(i, i - 1)
                        + self.ambient_loss(i)
                        + mdot_up * CP_WATER_J * self.layers[i + 1]
                        - mdot_up * CP_WATER_J * self.layers[i]
                } else {
                    self.conduction(i, i + 1)
                        + self.ambient_loss(i)
                        + mdot_up * CP_WATER_J * self.layers[i + 1]
                        - mdot_up * CP_WATER_J * self.layers[i]
                };
                self.layers[i] += rate / (self.layer_water_mass_kg * CP_WATER_J) * dt;
            }
            self.t_out = self.layers[bottom];
        }

        if mdot_ch_in == 0.0 && mdot_dis_out == 0.0 {
            // Standby: conduction and ambient loss only.
            for i in 0..n {
                let rate = if i == 0 {
                    self.conduction(i, i + 1) + self.ambient_loss(i)
                } else if i < bottom {
                    self.conduction(i, i + 1) + self.conduction(i, i - 1) + self.ambient_loss(i)
                } else {
                    self.conduction(i, i - 1) + self.ambient_loss(i)
                };
                self.layers[i] += rate / (self.layer_water_mass_kg * CP_WATER_J) * dt;
            }
            self.t_out = self.layers[bottom];
        }

        // What enters must leave: refresh the echo flows every step so the
        // balance holds on standby ticks as well.
        self.mdot_ch_out = -mdot_ch_in;
        self.mdot_dis_in = -mdot_dis_out;

        self.t_hot = self.layers[0];
        self.t_cold = self.layers[bottom];
        Ok(())
    }

    /// Axial conduction heat-flow rate (W) into layer `i` from layer `j`.
    fn conduction(&self, i: usize, j: usize) -> f64 {
        self.lambda_eff * self.cross_water_area_m2 / self.layer_length_m
            * (self.layers[j] - self.layers[i])
    }

    /// Wall heat-loss rate (W) into layer `i` from ambient.
    fn ambient_loss(&self, i: usize) -> f64 {
        self.u_wall * self.layer_wall_area_m2 * (self.params.t_ambient_c - self.layers[i])
    }

    /// Temperature at the top of the tank (°C).
    pub fn t_hot(&self) -> f64 {
        self.t_hot
    }

    /// Temperature at the bottom of the tank (°C).
    pub fn t_cold(&self) -> f64 {
        self.t_cold
    }

    /// Mean layer temperature (°C).
    pub fn t_avg(&self) -> f64 {
        self.layers.iter().sum::<f64>() / self.layers.len() as f64
    }

    /// Layer temperatures (°C), top first.
    pub fn layer_temperatures(&self) -> &[f64] {
        &self.layers
    }

    /// Total water mass in the tank (kg).
    pub fn water_mass_kg(&self) -> f64 {
        self.layer_water_mass_kg * self.layers.len() as f64
    }

    /// Charge outlet flow at the bottom (kg/s, negation of the charge inlet).
    pub fn mdot_ch_out(&self) -> f64 {
        self.mdot_ch_out
    }

    /// Discharge inlet flow at the bottom (kg/s, negation of the discharge outlet).
    pub fn mdot_dis_in(&self) -> f64 {
        self.mdot_dis_in
    }
}

impl ReadAttribute for StratifiedTank {
    fn component_name(&self) -> &'static str {
        "storage_tank"
    }

    fn read(&self, attribute: &str) -> Result<f64, SimError> {
        match attribute {
            "t_hot" => Ok(self.t_hot),
            "t_cold" => Ok(self.t_cold),
            "t_avg" => Ok(self.t_avg()),
            "t_out" => Ok(self.t_out),
            "t_ch_in" => Ok(self.t_ch_in),
            "t_dis_in" => Ok(self.t_dis_in),
            "mdot_ch_in" => Ok(self.mdot_ch_in),
            "mdot_ch_out" => Ok(self.mdot_ch_out),
            "mdot_dis_in" => Ok(self.mdot_dis_in),
            "mdot_dis_out" => Ok(self.mdot_dis_out),
            _ => Err(self.unknown_attribute(attribute)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_tank() -> StratifiedTank {
        StratifiedTank::new(TankParams {
            inner_height_m: 2.0,
            inner_diameter_m: 1.0,
            insulation_thickness_m: 0.1,
            steel_thickness_m: 0.01,
            n_layers: 10,
            t_initial_c: 50.0,
            t_ambient_c: 15.0,
            ..TankParams::default()
        })
    }

    #[test]
    fn layer_masses_sum_to_water_mass() {
        let tank = small_tank();
        // 2 m tall, 0.5 m radius cylinder of water.
        let expected = 1000.0 * std::f64::consts::PI * 0.25 * 2.0;
        assert_relative_eq!(tank.water_mass_kg(), expected, max_relative = 1e-12);
        assert_eq!(tank.layer_temperatures().len(), 10);
    }

    #[test]
    #[should_panic]
    fn single_layer_tank_is_rejected() {
        StratifiedTank::new(TankParams {
            n_layers: 1,
            ..TankParams::default()
        });
    }

    #[test]
    fn sign_convention_violation_is_an_error() {
        let mut tank = small_tank();
        let before = tank.layer_temperatures().to_vec();

        let err = tank.step(-1.0, 60.0, 0.0, 40.0, 1.0).unwrap_err();
        assert!(matches!(err, SimError::FlowSignConvention { .. }));
        // State untouched after a rejected step.
        assert_eq!(tank.layer_temperatures(), before.as_slice());

        assert!(tank.step(0.0, 60.0, 0.5, 40.0, 1.0).is_err());
    }

    #[test]
    fn standby_cools_toward_ambient() {
        let mut tank = small_tank();
        for _ in 0..3600 {
            tank.step(0.0, 50.0, 0.0, 50.0, 1.0).unwrap();
        }
        for &t in tank.layer_temperatures() {
            assert!(t < 50.0);
            assert!(t > 15.0);
        }
    }

    #[test]
    fn charging_warms_top_layer_first() {
        let mut tank = small_tank();
        tank.step(0.5, 80.0, 0.0, 40.0, 1.0).unwrap();
        let layers = tank.layer_temperatures();
        assert!(layers[0] > 50.0);
        // The charge front has not reached the bottom after one second.
        assert!(layers[9] <= 50.0);
        assert_eq!(tank.mdot_ch_out(), -0.5);
    }

    #[test]
    fn charge_front_propagates_monotonically() {
        let mut tank = small_tank();
        let mut prev_top = tank.t_hot();
        for _ in 0..1800 {
            tank.step(0.5, 80.0, 0.0, 40.0, 1.0).unwrap();
            assert!(tank.t_hot() >= prev_top - 1e-9);
            assert!(tank.t_hot() < 80.0);
            prev_top = tank.t_hot();
        }
        // Stratification: temperatures decrease from top to bottom.
        let layers = tank.layer_temperatures();
        for pair in layers.windows(2) {
            assert!(pair[0] >= pair[1] - 1e-9);
        }
    }

    #[test]
    fn discharging_draws_cold_water_in_at_the_bottom() {
        let mut tank = small_tank();
        for _ in 0..600 {
            tank.step(0.0, 50.0, -0.5, 30.0, 1.0).unwrap();
        }
        let layers = tank.layer_temperatures();
        // Cold inlet water pools at the bottom.
        assert!(layers[9] < layers[0]);
        assert!(layers[9] < 50.0);
        assert_eq!(tank.mdot_dis_in(), 0.5);
    }

    #[test]
    fn simultaneous_charge_and_discharge_applies_both_advection_terms() {
        let mut a = small_tank();
        let mut b = small_tank();

        a.step(0.5, 80.0, -0.3, 30.0, 1.0).unwrap();
        // Charging alone warms the top more than the combined mode, which
        // also pulls the profile upward from the cold bottom inlet.
        b.step(0.5, 80.0, 0.0, 30.0, 1.0).unwrap();
        assert!(a.t_hot() <= b.t_hot() + 1e-9);
        assert_eq!(a.mdot_ch_out(), -0.5);
        assert_eq!(a.mdot_dis_in(), 0.3);
    }

    #[test]
    fn read_exposes_collector_attributes() {
        let mut tank = small_tank();
        tank.step(0.5, 80.0, 0.0, 40.0, 1.0).unwrap();
        assert_eq!(tank.read("t_hot").unwrap(), tank.t_hot());
        assert_eq!(tank.read("mdot_ch_out").unwrap(), -0.5);
        assert!(matches!(
            tank.read("t_bogus"),
            Err(SimError::UnknownAttribute { .. })
        ));
    }
}
