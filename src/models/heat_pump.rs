//! Heat pump with a constant condenser-outlet temperature target.

use crate::error::SimError;
use crate::sim::types::ReadAttribute;
use crate::util::{CP_WATER_KJ, KELVIN_OFFSET, clamp, log_mean};

/// Construction parameters for [`HeatPump`].
///
/// Defaults describe the demonstrator unit: 100 kW electrical rating,
/// Lorenz-cycle efficiency 0.5, compressor efficiency 0.7, condenser
/// target 75 °C.
#[derive(Debug, Clone)]
pub struct HeatPumpParams {
    /// Fraction of the thermodynamically available work the pump delivers.
    pub eta_sys: f64,
    /// Compressor efficiency: mechanical work per electrical power.
    pub eta_comp: f64,
    /// Actuation rate of the compressor (1/s); the pump responds within
    /// roughly `1 / lambda_comp` seconds.
    pub lambda_comp: f64,
    /// Rated electrical power (kW).
    pub p_rated_kw: f64,
    /// Standby electrical consumption (kW).
    pub p_standby_kw: f64,
    /// Minimum allowed evaporator outlet temperature (°C).
    pub t_evap_out_min_c: f64,
    /// Maximum allowed condenser outlet temperature (°C).
    pub t_cond_out_max_c: f64,
    /// Initial estimate of the evaporator outlet temperature (°C), used to
    /// seed the log-mean iteration before the first step.
    pub t_evap_out_init_c: f64,
    /// Condenser outlet temperature target (°C).
    pub t_cond_out_target_c: f64,
}

impl Default for HeatPumpParams {
    fn default() -> Self {
        Self {
            eta_sys: 0.5,
            eta_comp: 0.7,
            lambda_comp: 0.2,
            p_rated_kw: 100.0,
            p_standby_kw: 0.3,
            t_evap_out_min_c: 20.0,
            t_cond_out_max_c: 85.0,
            t_evap_out_init_c: 30.0,
            t_cond_out_target_c: 75.0,
        }
    }
}

/// Heat pump that tries to hold its condenser outlet at a fixed target
/// temperature.
///
/// Each step derives a Lorenz-cycle work-to-heat ratio from log-mean
/// temperatures on both sides, bounds the mechanical work by the condenser,
/// evaporator and rated ceilings, and applies a first-order lag toward the
/// requested work to model actuator inertia. All quantities are analytically
/// defined and clamped; there is no error path. The caller must guarantee a
/// nonzero evaporator flow; zero condenser flow is handled by forcing the
/// outlet to the target.
#[derive(Debug, Clone)]
pub struct HeatPump {
    params: HeatPumpParams,
    /// Rated mechanical work (kW), `p_rated_kw * eta_comp`.
    w_rated_kw: f64,

    // Last applied inputs.
    t_cond_in: f64,
    t_evap_in: f64,
    mdot_cond_in: f64,
    mdot_evap_in: f64,

    // Work pipeline. `w_effective_kw` persists across steps for the lag.
    w_requested_kw: f64,
    w_cond_max_kw: f64,
    w_evap_max_kw: f64,
    w_max_kw: f64,
    w_effective_kw: f64,

    // Outputs.
    qdot_cond_kw: f64,
    qdot_evap_kw: f64,
    p_requested_kw: f64,
    p_effective_kw: f64,
    t_cond_out: f64,
    t_evap_out: f64,
    mdot_cond_out: f64,
    mdot_evap_out: f64,
}

impl HeatPump {
    /// Creates a heat pump at rest (no work, no flows).
    ///
    /// # Panics
    ///
    /// Panics if an efficiency is outside `(0, 1]` or the rating is not
    /// positive.
    pub fn new(params: HeatPumpParams) -> Self {
        assert!(params.eta_sys > 0.0 && params.eta_sys <= 1.0);
        assert!(params.eta_comp > 0.0 && params.eta_comp <= 1.0);
        assert!(params.p_rated_kw > 0.0);
        assert!(params.lambda_comp > 0.0);

        let w_rated_kw = params.p_rated_kw * params.eta_comp;
        let t_cond_out = params.t_cond_out_target_c;
        let t_evap_out = params.t_evap_out_init_c;
        Self {
            w_rated_kw,
            t_cond_in: t_cond_out,
            t_evap_in: t_evap_out,
            mdot_cond_in: 0.0,
            mdot_evap_in: 0.0,
            w_requested_kw: 0.0,
            w_cond_max_kw: 0.0,
            w_evap_max_kw: 0.0,
            w_max_kw: 0.0,
            w_effective_kw: 0.0,
            qdot_cond_kw: 0.0,
            qdot_evap_kw: 0.0,
            p_requested_kw: 0.0,
            p_effective_kw: params.p_standby_kw,
            t_cond_out,
            t_evap_out,
            mdot_cond_out: 0.0,
            mdot_evap_out: 0.0,
            params,
        }
    }

    /// Advances the pump by one step of `dt` seconds.
    ///
    /// # Arguments
    ///
    /// * `t_cond_in` - Condenser inlet temperature (°C)
    /// * `t_evap_in` - Evaporator inlet temperature (°C)
    /// * `mdot_cond_in` - Condenser mass flow (kg/s, >= 0)
    /// * `mdot_evap_in` - Evaporator mass flow (kg/s, > 0; caller guards)
    /// * `t_cond_out_target` - Condenser outlet temperature target (°C)
    /// * `dt` - Step duration (s)
    pub fn step(
        &mut self,
        t_cond_in: f64,
        t_evap_in: f64,
        mdot_cond_in: f64,
        mdot_evap_in: f64,
        t_cond_out_target: f64,
        dt: f64,
    ) {
        self.t_cond_in = t_cond_in;
        self.t_evap_in = t_evap_in;
        self.mdot_cond_in = mdot_cond_in;
        self.mdot_evap_in = mdot_evap_in;

        // Log-mean driving temperatures, evaluated in kelvin against the
        // previous outlet estimates.
        let t_cond_l = log_mean(t_cond_in + KELVIN_OFFSET, self.t_cond_out + KELVIN_OFFSET);
        let t_evap_l = log_mean(t_evap_in + KELVIN_OFFSET, self.t_evap_out + KELVIN_OFFSET);

        // Lorenz-cycle work-to-heat ratio, derated by the system efficiency.
        let eta_lorenz = 1.0 / (1.0 - t_evap_l / t_cond_l);
        let eta_hp_work = self.params.eta_sys * eta_lorenz;

        // Three ceilings on mechanical work. A negative ceiling means the
        // corresponding side is already past its temperature bound.
        self.w_cond_max_kw = (self.params.t_cond_out_max_c - t_cond_in)
            * (CP_WATER_KJ * mdot_cond_in)
            / eta_hp_work;
        self.w_evap_max_kw = (t_evap_in - self.params.t_evap_out_min_c)
            * (CP_WATER_KJ * mdot_evap_in)
            / (eta_hp_work - 1.0);
        self.w_max_kw = 0.0_f64.max(
            self.w_evap_max_kw
                .min(self.w_cond_max_kw)
                .min(self.w_rated_kw),
        );

        // Work needed to lift the condenser stream to the target, bounded
        // by the smallest ceiling.
        let q_for_target = (t_cond_out_target - t_cond_in) * CP_WATER_KJ * mdot_cond_in;
        self.w_requested_kw = clamp(0.0, q_for_target / eta_hp_work, self.w_max_kw);

        // First-order actuation lag toward the requested work.
        let decay = (-self.params.lambda_comp * dt).exp();
        self.w_effective_kw = (1.0 - decay) * self.w_requested_kw + decay * self.w_effective_kw;

        self.qdot_cond_kw = eta_hp_work * self.w_effective_kw;
        self.qdot_evap_kw = self.qdot_cond_kw - self.w_effective_kw;

        self.t_cond_out = if mdot_cond_in == 0.0 {
            // No condenser flow: the energy balance is degenerate, hold the
            // target instead of dividing by zero.
            t_cond_out_target
        } else {
            t_cond_in + self.qdot_cond_kw / (CP_WATER_KJ * mdot_cond_in)
        };
        self.t_evap_out = t_evap_in - self.qdot_evap_kw / (mdot_evap_in * CP_WATER_KJ);

        self.p_requested_kw = self.w_requested_kw / self.params.eta_comp;
        self.p_effective_kw =
            self.params.p_standby_kw + self.w_effective_kw / self.params.eta_comp;

        self.mdot_cond_out = -mdot_cond_in;
        self.mdot_evap_out = -mdot_evap_in;
    }

    /// Effective mechanical work (kW) after the actuation lag.
    pub fn w_effective_kw(&self) -> f64 {
        self.w_effective_kw
    }

    /// Smallest of the condenser, evaporator and rated work ceilings (kW).
    pub fn w_max_kw(&self) -> f64 {
        self.w_max_kw
    }

    /// Condenser heat flow (kW).
    pub fn qdot_cond_kw(&self) -> f64 {
        self.qdot_cond_kw
    }

    /// Evaporator heat flow (kW).
    pub fn qdot_evap_kw(&self) -> f64 {
        self.qdot_evap_kw
    }

    /// Electrical power drawn (kW), standby consumption included.
    pub fn p_effective_kw(&self) -> f64 {
        self.p_effective_kw
    }

    /// Electrical power drawn (MW).
    pub fn p_effective_mw(&self) -> f64 {
        1e-3 * self.p_effective_kw
    }

    /// Instantaneous coefficient of performance.
    pub fn cop(&self) -> f64 {
        self.qdot_cond_kw / self.p_effective_kw
    }

    /// Condenser outlet temperature (°C).
    pub fn t_cond_out(&self) -> f64 {
        self.t_cond_out
    }

    /// Evaporator outlet temperature (°C).
    pub fn t_evap_out(&self) -> f64 {
        self.t_evap_out
    }

    /// Condenser inlet temperature of the last step (°C).
    pub fn t_cond_in(&self) -> f64 {
        self.t_cond_in
    }

    /// Evaporator inlet temperature of the last step (°C).
    pub fn t_evap_in(&self) -> f64 {
        self.t_evap_in
    }

    /// Condenser outlet flow (kg/s, negation of the inlet flow).
    pub fn mdot_cond_out(&self) -> f64 {
        self.mdot_cond_out
    }

    /// Evaporator outlet flow (kg/s, negation of the inlet flow).
    pub fn mdot_evap_out(&self) -> f64 {
        self.mdot_evap_out
    }

    /// Condenser outlet temperature target (°C).
    pub fn t_cond_out_target(&self) -> f64 {
        self.params.t_cond_out_target_c
    }
}

impl ReadAttribute for HeatPump {
    fn component_name(&self) -> &'static str {
        "heat_pump"
    }

    fn read(&self, attribute: &str) -> Result<f64, SimError> {
        match attribute {
            "t_cond_in" => Ok(self.t_cond_in),
            "t_cond_out" => Ok(self.t_cond_out),
            "t_evap_in" => Ok(self.t_evap_in),
            "t_evap_out" => Ok(self.t_evap_out),
            "mdot_cond_in" => Ok(self.mdot_cond_in),
            "mdot_cond_out" => Ok(self.mdot_cond_out),
            "mdot_evap_in" => Ok(self.mdot_evap_in),
            "mdot_evap_out" => Ok(self.mdot_evap_out),
            "qdot_cond" => Ok(self.qdot_cond_kw),
            "qdot_evap" => Ok(self.qdot_evap_kw),
            "w_requested" => Ok(self.w_requested_kw),
            "w_effective" => Ok(self.w_effective_kw),
            "w_max" => Ok(self.w_max_kw),
            "w_cond_max" => Ok(self.w_cond_max_kw),
            "w_evap_max" => Ok(self.w_evap_max_kw),
            "w_rated" => Ok(self.w_rated_kw),
            "p_requested" => Ok(self.p_requested_kw),
            "p_effective" => Ok(self.p_effective_kw),
            "p_effective_mw" => Ok(self.p_effective_mw()),
            "p_rated" => Ok(self.params.p_rated_kw),
            "cop" => Ok(self.cop()),
            _ => Err(self.unknown_attribute(attribute)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pump() -> HeatPump {
        HeatPump::new(HeatPumpParams::default())
    }

    #[test]
    fn rest_state_draws_standby_power_only() {
        let hp = pump();
        assert_eq!(hp.w_effective_kw(), 0.0);
        assert_relative_eq!(hp.p_effective_kw(), 0.3);
    }

    #[test]
    fn requested_work_stays_within_all_ceilings() {
        // Sweep a grid of boundary conditions, including ones that push a
        // ceiling negative. The request is ceiling-bounded every step; the
        // effective work lags the request but can never pass the rating.
        for &t_cond_in in &[20.0, 60.0, 84.0, 90.0] {
            for &t_evap_in in &[10.0, 25.0, 45.0] {
                for &mdot_cond in &[0.0, 1.0, 5.0] {
                    let mut hp = pump();
                    for _ in 0..50 {
                        hp.step(t_cond_in, t_evap_in, mdot_cond, 2.0, 75.0, 1.0);
                        let w_max = hp.w_max_kw();
                        let w_req = hp.read("w_requested").unwrap();
                        let w_eff = hp.w_effective_kw();
                        assert!(w_max >= 0.0, "negative ceiling at {t_cond_in}/{t_evap_in}");
                        assert!(w_max <= hp.read("w_rated").unwrap());
                        assert!((0.0..=w_max + 1e-9).contains(&w_req));
                        assert!(w_eff >= 0.0, "negative work at {t_cond_in}/{t_evap_in}");
                        assert!(w_eff <= hp.read("w_rated").unwrap() + 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn effective_work_respects_the_ceiling_under_feasible_conditions() {
        // Held feasible boundary conditions from rest: the lag approaches
        // the request from below, so the smallest ceiling bounds both.
        let mut hp = pump();
        for _ in 0..200 {
            hp.step(45.0, 40.0, 3.5, 2.0, 75.0, 1.0);
            assert!(hp.w_effective_kw() <= hp.w_max_kw() + 1e-6);
        }
    }

    #[test]
    fn negative_ceilings_clamp_work_to_zero() {
        let mut hp = pump();
        // Condenser inlet above the maximum outlet makes the condenser
        // ceiling negative; evaporator inlet below the minimum outlet makes
        // the evaporator ceiling negative.
        hp.step(90.0, 10.0, 2.0, 2.0, 75.0, 1.0);
        assert_eq!(hp.w_max_kw(), 0.0);
        assert_eq!(hp.read("w_requested").unwrap(), 0.0);
    }

    #[test]
    fn lag_converges_toward_the_request() {
        let mut hp = pump();
        for _ in 0..300 {
            hp.step(45.0, 40.0, 3.5, 2.0, 75.0, 1.0);
            assert!(hp.w_effective_kw() >= 0.0);
            assert!(hp.w_effective_kw() <= hp.read("w_rated").unwrap());
        }
        // After many time constants under held boundary conditions the
        // effective work has settled onto the request.
        assert_relative_eq!(
            hp.w_effective_kw(),
            hp.read("w_requested").unwrap(),
            max_relative = 1e-3
        );
    }

    #[test]
    fn long_step_makes_the_lag_effectively_instant() {
        // At the demonstrator's 60 s step the 0.2 1/s actuation rate means
        // the effective work lands on the request within one step.
        let mut hp = pump();
        hp.step(45.0, 40.0, 3.5, 2.0, 75.0, 60.0);
        assert_relative_eq!(
            hp.w_effective_kw(),
            hp.read("w_requested").unwrap(),
            max_relative = 1e-4
        );
    }

    #[test]
    fn zero_condenser_flow_holds_outlet_at_target() {
        let mut hp = pump();
        hp.step(40.0, 40.0, 0.0, 2.0, 75.0, 1.0);
        assert_eq!(hp.t_cond_out(), 75.0);
        // No condenser flow means no heat request either.
        assert_eq!(hp.read("w_requested").unwrap(), 0.0);
    }

    #[test]
    fn energy_balance_between_sides() {
        let mut hp = pump();
        for _ in 0..30 {
            hp.step(45.0, 40.0, 3.5, 2.0, 75.0, 1.0);
        }
        // Condenser heat = evaporator heat + mechanical work.
        assert_relative_eq!(
            hp.qdot_cond_kw(),
            hp.qdot_evap_kw() + hp.w_effective_kw(),
            max_relative = 1e-12
        );
        // Outlet temperatures move in opposite directions.
        assert!(hp.t_cond_out() > 45.0);
        assert!(hp.t_evap_out() < 40.0);
    }

    #[test]
    fn cop_is_heat_over_electrical_power() {
        let mut hp = pump();
        for _ in 0..30 {
            hp.step(45.0, 40.0, 3.5, 2.0, 75.0, 1.0);
        }
        assert_relative_eq!(
            hp.cop(),
            hp.qdot_cond_kw() / hp.p_effective_kw(),
            max_relative = 1e-12
        );
        assert!(hp.cop() > 1.0);
    }
}
