//! Seeded synthetic demand and generation profiles.
//!
//! Stand-ins for the measured time series the demonstrator replays:
//! deterministic for a fixed seed, one independent RNG per profile.

use rand::{Rng, SeedableRng, rngs::StdRng};

/// A daily sinusoidal demand profile with Gaussian noise.
///
/// Used for consumer heat demand (kW) and electrical load (MW); the unit
/// is whatever the amplitude parameters are given in.
#[derive(Debug, Clone)]
pub struct DemandProfile {
    /// Baseline demand.
    pub base: f64,
    /// Amplitude of the daily variation.
    pub amp: f64,
    /// Phase offset (radians).
    pub phase_rad: f64,
    /// Standard deviation of the Gaussian noise.
    pub noise_std: f64,
    /// Steps per simulated day.
    pub steps_per_day: usize,
    rng: StdRng,
}

impl DemandProfile {
    /// Creates a profile with its own seeded RNG.
    pub fn new(
        base: f64,
        amp: f64,
        phase_rad: f64,
        noise_std: f64,
        steps_per_day: usize,
        seed: u64,
    ) -> Self {
        Self {
            base,
            amp,
            phase_rad,
            noise_std,
            steps_per_day: steps_per_day.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Demand at a step, never negative.
    pub fn value(&mut self, step: usize) -> f64 {
        let day_pos = (step % self.steps_per_day) as f64 / self.steps_per_day as f64; // [0,1)
        let angle = 2.0 * std::f64::consts::PI * day_pos + self.phase_rad;
        (self.base + self.amp * angle.sin() + gaussian(&mut self.rng, self.noise_std)).max(0.0)
    }
}

/// Photovoltaic generation: a half-sine across the daylight window with
/// Gaussian noise, zero at night.
#[derive(Debug, Clone)]
pub struct PvProfile {
    /// Peak generation at solar noon.
    pub peak: f64,
    /// First daylight step of the day (inclusive).
    pub sunrise_idx: usize,
    /// First dark step after daylight (exclusive).
    pub sunset_idx: usize,
    /// Standard deviation of the Gaussian noise.
    pub noise_std: f64,
    /// Steps per simulated day.
    pub steps_per_day: usize,
    rng: StdRng,
}

impl PvProfile {
    /// Creates a profile with its own seeded RNG.
    ///
    /// # Panics
    ///
    /// Panics if the daylight window is empty or exceeds the day.
    pub fn new(
        peak: f64,
        sunrise_idx: usize,
        sunset_idx: usize,
        noise_std: f64,
        steps_per_day: usize,
        seed: u64,
    ) -> Self {
        assert!(sunrise_idx < sunset_idx);
        assert!(sunset_idx <= steps_per_day);
        Self {
            peak,
            sunrise_idx,
            sunset_idx,
            noise_std,
            steps_per_day,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generation at a step (same sign convention as the caller chooses;
    /// here positive), zero outside the daylight window.
    pub fn value(&mut self, step: usize) -> f64 {
        let day_step = step % self.steps_per_day;
        if day_step < self.sunrise_idx || day_step >= self.sunset_idx {
            return 0.0;
        }
        let window = (self.sunset_idx - self.sunrise_idx) as f64;
        let pos = (day_step - self.sunrise_idx) as f64 / window; // [0,1)
        let shape = (std::f64::consts::PI * pos).sin();
        (self.peak * shape + gaussian(&mut self.rng, self.noise_std)).max(0.0)
    }
}

/// Gaussian sample via Box-Muller; zero when the deviation is zero.
fn gaussian(rng: &mut StdRng, std: f64) -> f64 {
    if std <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demand_is_never_negative() {
        let mut p = DemandProfile::new(0.1, 1.0, 0.0, 0.5, 24, 1);
        for t in 0..240 {
            assert!(p.value(t) >= 0.0);
        }
    }

    #[test]
    fn demand_is_deterministic_for_a_fixed_seed() {
        let mut a = DemandProfile::new(0.5, 0.3, 1.2, 0.05, 24, 42);
        let mut b = DemandProfile::new(0.5, 0.3, 1.2, 0.05, 24, 42);
        for t in 0..48 {
            assert_eq!(a.value(t), b.value(t));
        }
    }

    #[test]
    fn noiseless_demand_follows_the_sinusoid() {
        let mut p = DemandProfile::new(1.0, 0.5, 0.0, 0.0, 24, 0);
        // Quarter of the day: sine at its maximum.
        assert!((p.value(6) - 1.5).abs() < 1e-12);
        assert!((p.value(18) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn pv_is_dark_outside_the_daylight_window() {
        let mut pv = PvProfile::new(0.6, 6, 18, 0.0, 24, 3);
        assert_eq!(pv.value(0), 0.0);
        assert_eq!(pv.value(5), 0.0);
        assert_eq!(pv.value(18), 0.0);
        assert_eq!(pv.value(23), 0.0);
        assert!(pv.value(12) > 0.5);
    }

    #[test]
    fn pv_peaks_around_solar_noon() {
        let mut pv = PvProfile::new(1.0, 6, 18, 0.0, 24, 3);
        let morning = pv.value(7);
        let noon = pv.value(12);
        assert!(noon > morning);
        assert!(noon <= 1.0);
    }
}
