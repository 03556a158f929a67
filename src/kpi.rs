//! Post-hoc KPI computation from simulation records.

use std::fmt;

use crate::sim::types::StepRecord;

/// Aggregate key performance indicators of a complete run.
///
/// Computed post-hoc from the step records so reported metrics always
/// agree with the persisted data.
#[derive(Debug, Clone)]
pub struct KpiReport {
    /// Electrical energy drawn by the heat pump (kWh).
    pub hp_electrical_kwh: f64,
    /// Heat delivered by the condenser (kWh).
    pub hp_condenser_heat_kwh: f64,
    /// Energy-weighted coefficient of performance over the run.
    pub hp_mean_cop: f64,
    /// Heat demand of both consumers (kWh).
    pub consumer_heat_kwh: f64,
    /// Lowest tank top-layer temperature seen (°C).
    pub tank_t_hot_min: f64,
    /// Highest tank top-layer temperature seen (°C).
    pub tank_t_hot_max: f64,
    /// Steps with the voltage outside ±0.1 p.u. of nominal.
    pub voltage_violation_steps: usize,
    /// Number of flex-heat controller state changes.
    pub controller_state_changes: usize,
}

impl KpiReport {
    /// Computes all KPIs from the complete record vector.
    pub fn from_records(records: &[StepRecord], step_size_s: f64) -> Self {
        if records.is_empty() {
            return Self {
                hp_electrical_kwh: 0.0,
                hp_condenser_heat_kwh: 0.0,
                hp_mean_cop: 0.0,
                consumer_heat_kwh: 0.0,
                tank_t_hot_min: 0.0,
                tank_t_hot_max: 0.0,
                voltage_violation_steps: 0,
                controller_state_changes: 0,
            };
        }

        let dt_h = step_size_s / 3600.0;
        let mut electrical_kwh = 0.0;
        let mut heat_kwh = 0.0;
        let mut consumer_kwh = 0.0;
        let mut t_hot_min = f64::INFINITY;
        let mut t_hot_max = f64::NEG_INFINITY;
        let mut violations = 0;
        let mut state_changes = 0;
        let mut last_state = records[0].controller_state;

        for r in records {
            electrical_kwh += r.p_hp_effective_kw * dt_h;
            heat_kwh += r.qdot_cond_kw * dt_h;
            consumer_kwh += (r.p_heat_cons1_kw + r.p_heat_cons2_kw) * dt_h;
            t_hot_min = t_hot_min.min(r.t_tank_hot);
            t_hot_max = t_hot_max.max(r.t_tank_hot);
            if (r.vm_pu - 1.0).abs() > 0.1 {
                violations += 1;
            }
            if r.controller_state != last_state {
                state_changes += 1;
                last_state = r.controller_state;
            }
        }

        Self {
            hp_electrical_kwh: electrical_kwh,
            hp_condenser_heat_kwh: heat_kwh,
            hp_mean_cop: if electrical_kwh > 0.0 {
                heat_kwh / electrical_kwh
            } else {
                0.0
            },
            consumer_heat_kwh: consumer_kwh,
            tank_t_hot_min: t_hot_min,
            tank_t_hot_max: t_hot_max,
            voltage_violation_steps: violations,
            controller_state_changes: state_changes,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "KPI report")?;
        writeln!(
            f,
            "  heat pump:   {:.1} kWh el, {:.1} kWh heat, COP {:.2}",
            self.hp_electrical_kwh, self.hp_condenser_heat_kwh, self.hp_mean_cop
        )?;
        writeln!(f, "  consumers:   {:.1} kWh heat demand", self.consumer_heat_kwh)?;
        writeln!(
            f,
            "  tank top:    {:.2} .. {:.2} °C",
            self.tank_t_hot_min, self.tank_t_hot_max
        )?;
        writeln!(
            f,
            "  voltage:     {} steps outside ±0.1 p.u.",
            self.voltage_violation_steps
        )?;
        write!(
            f,
            "  controller:  {} state changes",
            self.controller_state_changes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(step: usize, state: u8, p_kw: f64, q_kw: f64, vm: f64) -> StepRecord {
        StepRecord {
            step,
            time_s: step as f64 * 60.0,
            t_tank_hot: 70.0,
            t_tank_cold: 68.0,
            t_tank_avg: 69.0,
            mdot_tank_ch_in: 3.5,
            mdot_tank_dis_out: -0.11,
            qdot_cond_kw: q_kw,
            qdot_evap_kw: q_kw * 0.7,
            p_hp_effective_kw: p_kw,
            p_hp_setpoint_kw: p_kw,
            t_cond_out: 75.0,
            mdot_cons1: 3.0,
            mdot_cons2: 2.5,
            p_heat_cons1_kw: 400.0,
            p_heat_cons2_kw: 350.0,
            vm_pu: vm,
            controller_state: state,
        }
    }

    #[test]
    fn empty_run_yields_zeroed_report() {
        let kpi = KpiReport::from_records(&[], 60.0);
        assert_eq!(kpi.hp_electrical_kwh, 0.0);
        assert_eq!(kpi.hp_mean_cop, 0.0);
    }

    #[test]
    fn energy_totals_integrate_over_steps() {
        // Two one-hour steps at 50 kW electrical / 150 kW heat.
        let records = vec![
            record(0, 2, 50.0, 150.0, 1.0),
            record(1, 2, 50.0, 150.0, 1.0),
        ];
        let kpi = KpiReport::from_records(&records, 3600.0);
        assert!((kpi.hp_electrical_kwh - 100.0).abs() < 1e-9);
        assert!((kpi.hp_condenser_heat_kwh - 300.0).abs() < 1e-9);
        assert!((kpi.hp_mean_cop - 3.0).abs() < 1e-9);
        assert!((kpi.consumer_heat_kwh - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn counts_state_changes_and_voltage_violations() {
        let records = vec![
            record(0, 1, 0.3, 0.0, 1.0),
            record(1, 2, 40.0, 120.0, 1.12),
            record(2, 2, 40.0, 120.0, 0.88),
            record(3, 5, 0.3, 0.0, 1.0),
        ];
        let kpi = KpiReport::from_records(&records, 60.0);
        assert_eq!(kpi.controller_state_changes, 2);
        assert_eq!(kpi.voltage_violation_steps, 2);
    }

    #[test]
    fn display_does_not_panic() {
        let kpi = KpiReport::from_records(&[record(0, 2, 40.0, 120.0, 1.0)], 60.0);
        assert!(!format!("{kpi}").is_empty());
    }
}
