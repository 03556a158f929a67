//! Simulation error taxonomy.
//!
//! Contract violations and unsupported controller states abort a run;
//! numeric edge cases are handled locally by the models and never surface
//! here.

use thiserror::Error;

/// Unrecoverable simulation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A mass flow arrived with the wrong sign for its port: charge flows
    /// must be >= 0 and discharge flows <= 0. Signals a contract breach in
    /// the upstream coupling, not a numeric condition.
    #[error(
        "mass-flow sign convention violated: mdot_ch_in = {mdot_ch_in}, mdot_dis_out = {mdot_dis_out}"
    )]
    FlowSignConvention { mdot_ch_in: f64, mdot_dis_out: f64 },

    /// A controller selected a state that this variant does not implement.
    #[error("controller state {0} is not supported")]
    UnsupportedState(u8),

    /// A driver or collector asked a component for an attribute it does not
    /// expose.
    #[error("component `{component}` has no attribute `{attribute}`")]
    UnknownAttribute {
        component: &'static str,
        attribute: String,
    },

    /// A collector column referenced a component the engine does not own.
    #[error("no component named `{0}` in the coupling network")]
    UnknownComponent(String),
}

#[cfg(test)]
mod tests {
    use super::SimError;

    #[test]
    fn messages_name_the_offending_values() {
        let e = SimError::FlowSignConvention {
            mdot_ch_in: -1.0,
            mdot_dis_out: 0.5,
        };
        let msg = e.to_string();
        assert!(msg.contains("-1"));
        assert!(msg.contains("0.5"));

        let e = SimError::UnknownAttribute {
            component: "storage_tank",
            attribute: "t_bogus".to_string(),
        };
        assert!(e.to_string().contains("t_bogus"));
    }
}
