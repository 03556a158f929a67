//! Scenario runner: builds the coupling network from a scenario
//! configuration and executes it.

use crate::config::ScenarioConfig;
use crate::control::flex_heat::{FlexHeatController, FlexHeatParams};
use crate::control::voltage::{VoltageController, VoltageControllerParams};
use crate::error::SimError;
use crate::io::export::Collector;
use crate::kpi::KpiReport;
use crate::models::heat_pump::{HeatPump, HeatPumpParams};
use crate::models::hex_consumer::{HexConsumer, HexConsumerParams};
use crate::models::tank::{StratifiedTank, TankParams};
use crate::network::dh::{DhNetwork, DhParams};
use crate::network::grid::{BusParams, FeederGrid};
use crate::profiles::{DemandProfile, PvProfile};
use crate::sim::engine::{CouplingSeeds, Engine, ProfileSet};
use crate::sim::types::{SimConfig, StepRecord};

/// Seed offsets so each profile draws an independent noise stream.
const HEAT2_SEED_OFFSET: u64 = 1;
const LOAD1_SEED_OFFSET: u64 = 2;
const LOAD2_SEED_OFFSET: u64 = 3;
const PV1_SEED_OFFSET: u64 = 4;
const PV2_SEED_OFFSET: u64 = 5;

/// Everything a finished run produces.
pub struct SimulationResult {
    /// One record per executed step.
    pub records: Vec<StepRecord>,
    /// Aggregate indicators derived from the records.
    pub kpi: KpiReport,
    /// The columnar results table.
    pub collector: Collector,
}

/// Builds the full coupling network from a validated scenario.
pub fn build_engine(cfg: &ScenarioConfig) -> Engine {
    let s = &cfg.simulation;
    let sim_config = SimConfig::new(s.step_size_s, s.horizon_s, s.seed);
    let steps_per_day = ((24 * 60 * 60) as f64 / s.step_size_s).max(1.0) as usize;
    let steps_per_hour = (steps_per_day as f64 / 24.0).max(1.0) as usize;

    let grid = FeederGrid::new(
        cfg.grid.vm_slack_pu,
        cfg.grid
            .buses
            .iter()
            .map(|b| BusParams {
                name: b.name.clone(),
                v_sensitivity_pu_per_mw: b.v_sensitivity_pu_per_mw,
            })
            .collect(),
    );

    let dh = DhNetwork::new(DhParams {
        t_supply_grid_c: cfg.dh_network.t_supply_grid_c,
        mdot_bypass: cfg.dh_network.mdot_bypass,
        t_return_min_c: cfg.dh_network.t_return_min_c,
    });

    let voltage_ctrl = s.voltage_control_enabled.then(|| {
        let vc = &cfg.voltage_control;
        VoltageController::new(VoltageControllerParams {
            delta_vm_upper_pu: vc.delta_vm_upper_pu,
            delta_vm_lower_pu_hp_on: vc.delta_vm_lower_pu_hp_on,
            delta_vm_lower_pu_hp_off: vc.delta_vm_lower_pu_hp_off,
            delta_vm_deadband: vc.delta_vm_deadband,
            p_rated_mw: vc.p_rated_mw,
            p_min_mw: vc.p_min_frac * vc.p_rated_mw,
            p_step_mw: vc.p_step_mw,
            min_dwell_steps: (vc.min_dwell_s as f64 / s.step_size_s).max(1.0) as u64,
            k_p: vc.k_p,
        })
    });

    let fh = &cfg.flex_heat;
    let flex_ctrl = FlexHeatController::new(FlexHeatParams {
        t_tank_max_c: fh.t_tank_max_c,
        t_tank_min_c: fh.t_tank_min_c,
        voltage_control_enabled: s.voltage_control_enabled,
        p_hp_rated_kw: cfg.heat_pump.p_rated_kw,
        hp_threshold_frac: fh.hp_threshold_frac,
        mdot_bypass: fh.mdot_bypass,
        mdot_forward_min: fh.mdot_forward_min,
        mdot_tank_support: fh.mdot_tank_support,
        mdot_hp_max: fh.mdot_hp_max,
        mdot_hp_fixed: fh.mdot_hp_fixed,
    });

    let hp = &cfg.heat_pump;
    let heat_pump = HeatPump::new(HeatPumpParams {
        eta_sys: hp.eta_sys,
        eta_comp: hp.eta_comp,
        lambda_comp: hp.lambda_comp,
        p_rated_kw: hp.p_rated_kw,
        p_standby_kw: hp.p_standby_kw,
        t_evap_out_min_c: hp.t_evap_out_min_c,
        t_cond_out_max_c: hp.t_cond_out_max_c,
        t_cond_out_target_c: hp.t_cond_out_target_c,
        ..HeatPumpParams::default()
    });

    let t = &cfg.tank;
    let tank = StratifiedTank::new(TankParams {
        inner_height_m: t.inner_height_m,
        inner_diameter_m: t.inner_diameter_m,
        insulation_thickness_m: t.insulation_thickness_m,
        steel_thickness_m: t.steel_thickness_m,
        lambda_insulation: t.lambda_insulation,
        lambda_steel: t.lambda_steel,
        n_layers: t.n_layers,
        t_initial_c: t.t_initial_c,
        t_ambient_c: t.t_ambient_c,
    });

    let hex = |c: &crate::config::ConsumerConfig| {
        HexConsumer::new(HexConsumerParams {
            t_return_target_c: c.t_return_target_c,
            t_return_min_c: c.t_return_min_c,
            mdot_min: c.mdot_min,
            mdot_max: c.mdot_max,
            relax_steps: c.relax_steps,
            max_change_rate: c.max_change_rate,
            mdot_init: c.mdot_init,
        })
    };
    let hex1 = hex(&cfg.consumer1);
    let hex2 = hex(&cfg.consumer2);

    let p = &cfg.profiles;
    let sine = |c: &crate::config::SineProfileConfig, seed: u64| {
        DemandProfile::new(c.base, c.amp, c.phase_rad, c.noise_std, steps_per_day, seed)
    };
    let pv = |c: &crate::config::PvProfileConfig, seed: u64| {
        PvProfile::new(
            c.peak,
            c.sunrise_hour as usize * steps_per_hour,
            c.sunset_hour as usize * steps_per_hour,
            c.noise_std,
            steps_per_day,
            seed,
        )
    };
    let profiles = ProfileSet {
        heat_demand1: sine(&p.heat_demand1, s.seed),
        heat_demand2: sine(&p.heat_demand2, s.seed.wrapping_add(HEAT2_SEED_OFFSET)),
        load1: sine(&p.load1, s.seed.wrapping_add(LOAD1_SEED_OFFSET)),
        load2: sine(&p.load2, s.seed.wrapping_add(LOAD2_SEED_OFFSET)),
        pv1: pv(&p.pv1, s.seed.wrapping_add(PV1_SEED_OFFSET)),
        pv2: pv(&p.pv2, s.seed.wrapping_add(PV2_SEED_OFFSET)),
    };

    Engine::new(
        sim_config,
        grid,
        dh,
        voltage_ctrl,
        flex_ctrl,
        heat_pump,
        tank,
        hex1,
        hex2,
        profiles,
        CouplingSeeds {
            t_supply_cons_c: cfg.dh_network.t_supply_grid_c - 5.0,
            t_evap_in_c: cfg.consumer1.t_return_target_c,
        },
    )
}

/// Runs a scenario to completion: engine steps, results collection, KPIs.
///
/// # Errors
///
/// Aborts at the first component contract violation.
pub fn run_scenario(cfg: &ScenarioConfig) -> Result<SimulationResult, SimError> {
    let mut engine = build_engine(cfg);
    let mut collector =
        Collector::with_default_columns(cfg.simulation.voltage_control_enabled);

    let total = engine.config().total_steps();
    let mut records = Vec::with_capacity(total);
    for t in 0..total {
        let record = engine.step(t)?;
        collector.sample(t, &engine)?;
        records.push(record);
    }

    let kpi = KpiReport::from_records(&records, cfg.simulation.step_size_s);
    Ok(SimulationResult {
        records,
        kpi,
        collector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_scenario() -> ScenarioConfig {
        ScenarioConfig::from_toml_str(
            r#"
            [simulation]
            horizon_s = 1800
            "#,
        )
        .unwrap()
    }

    #[test]
    fn runs_the_configured_horizon() {
        let result = run_scenario(&short_scenario()).unwrap();
        assert_eq!(result.records.len(), 30);
        assert_eq!(result.collector.len(), 30);
    }

    #[test]
    fn kpi_agrees_with_records() {
        let result = run_scenario(&short_scenario()).unwrap();
        let recomputed = KpiReport::from_records(&result.records, 60.0);
        assert_eq!(
            result.kpi.controller_state_changes,
            recomputed.controller_state_changes
        );
        assert_eq!(result.kpi.hp_electrical_kwh, recomputed.hp_electrical_kwh);
    }

    #[test]
    fn voltage_control_disabled_runs_without_the_controller() {
        let cfg = ScenarioConfig::from_toml_str(
            r#"
            [simulation]
            horizon_s = 600
            voltage_control_enabled = false
            "#,
        )
        .unwrap();
        let mut engine = build_engine(&cfg);
        assert!(engine.voltage_ctrl().is_none());
        let records = engine.run().unwrap();
        // Without voltage control the setpoint signal stays at zero.
        assert!(records.iter().all(|r| r.p_hp_setpoint_kw == 0.0));
    }
}
