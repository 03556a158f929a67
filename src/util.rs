//! Shared numeric helpers used by all physical models.

/// Offset between degrees Celsius and kelvin.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Specific heat capacity of water in J/(kg·K).
pub const CP_WATER_J: f64 = 4180.0;

/// Specific heat capacity of water in kJ/(kg·K).
pub const CP_WATER_KJ: f64 = 4.180;

/// Density of water in kg/m³.
pub const RHO_WATER: f64 = 1000.0;

/// Restricts `x` to the closed interval `[lo, hi]`.
///
/// Matches `f64::clamp` for well-formed bounds but never panics on an
/// inverted interval: the lower bound wins.
pub fn clamp(lo: f64, x: f64, hi: f64) -> f64 {
    if x > lo { if x < hi { x } else { hi } } else { lo }
}

/// Logarithmic mean of two temperatures (kelvin).
///
/// Uses a third-order Taylor expansion around `t_hi`, which is smooth at
/// `t_hi == t_lo` where the exact form `(t_hi - t_lo) / ln(t_hi / t_lo)`
/// is singular.
pub fn log_mean(t_hi: f64, t_lo: f64) -> f64 {
    let d = t_hi - t_lo;
    t_hi - d / 2.0 * (1.0 + d / 6.0 / t_hi * (1.0 + d / 2.0 / t_hi))
}

/// Division with a defined fallback: returns 0 when the denominator is 0.
pub fn safediv(a: f64, b: f64) -> f64 {
    if b == 0.0 { 0.0 } else { a / b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clamp_inside_and_outside() {
        assert_eq!(clamp(0.0, 0.5, 1.0), 0.5);
        assert_eq!(clamp(0.0, -0.5, 1.0), 0.0);
        assert_eq!(clamp(0.0, 1.5, 1.0), 1.0);
    }

    #[test]
    fn log_mean_equal_temperatures_is_identity() {
        assert_relative_eq!(log_mean(350.0, 350.0), 350.0);
    }

    #[test]
    fn log_mean_close_to_exact_form() {
        let (hi, lo): (f64, f64) = (353.15, 313.15);
        let exact = (hi - lo) / (hi / lo).ln();
        assert_relative_eq!(log_mean(hi, lo), exact, max_relative = 1e-4);
    }

    #[test]
    fn log_mean_lies_between_inputs() {
        let m = log_mean(360.0, 290.0);
        assert!(m > 290.0 && m < 360.0);
    }

    #[test]
    fn safediv_zero_denominator() {
        assert_eq!(safediv(5.0, 0.0), 0.0);
        assert_eq!(safediv(5.0, 2.0), 2.5);
    }
}
