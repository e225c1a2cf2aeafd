//! Tunable simulation constants
//!
//! These are configuration inputs rather than parts of the algorithms:
//! lane geometry, battery thresholds, charge rate and dwell bounds.

use super::types::px;

/// Tunable parameters for the simulation
///
/// Lane offsets are measured in meters from a road module's top edge.
/// Battery values are percentages in 0..100.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Lateral offset of the "up" lane (leftward traffic)
    pub lane_offset_up: f32,
    /// Lateral offset of the "down" lane (rightward traffic)
    pub lane_offset_down: f32,
    /// Below this battery level an electric car always seeks a charger
    pub battery_low: f32,
    /// Above this battery level an electric car never seeks a charger
    pub battery_high: f32,
    /// Charging cars may start leaving once the battery reaches this level
    pub battery_exit_min: f32,
    /// Charging cars leave unconditionally at this level
    pub battery_force_exit: f32,
    /// Battery percentage gained per second on a charging spot
    pub charge_rate: f32,
    /// Bounds of the randomized parking dwell duration in seconds
    pub dwell_min: f32,
    pub dwell_max: f32,
    /// Speed given to freshly spawned cars in m/s
    pub spawn_speed: f32,
    /// Price ranges used when populating facility spots
    pub parking_price_range: (f32, f32),
    pub charging_price_range: (f32, f32),
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            lane_offset_up: px(61.0),
            lane_offset_down: px(94.0),
            battery_low: 30.0,
            battery_high: 70.0,
            battery_exit_min: 80.0,
            battery_force_exit: 95.0,
            charge_rate: 5.0,
            dwell_min: 10.0,
            dwell_max: 30.0,
            spawn_speed: 15.0,
            parking_price_range: (1.0, 5.0),
            charging_price_range: (3.0, 8.0),
        }
    }
}

impl SimConfig {
    /// Probability that an electric car at `battery` seeks a charger:
    /// 1.0 below the low threshold, 0.0 above the high one, linear between.
    pub fn charging_probability(&self, battery: f32) -> f32 {
        if battery < self.battery_low {
            1.0
        } else if battery > self.battery_high {
            0.0
        } else {
            (self.battery_high - battery) / (self.battery_high - self.battery_low)
        }
    }

    /// Per-tick probability that a charging car at `battery` decides to
    /// leave: 0.0 below `battery_exit_min`, 1.0 at `battery_force_exit`.
    pub fn charged_exit_probability(&self, battery: f32) -> f32 {
        if battery >= self.battery_force_exit {
            1.0
        } else if battery < self.battery_exit_min {
            0.0
        } else {
            (battery - self.battery_exit_min) / (self.battery_force_exit - self.battery_exit_min)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charging_probability_is_saturated_at_thresholds() {
        let config = SimConfig::default();
        assert_eq!(config.charging_probability(25.0), 1.0);
        assert_eq!(config.charging_probability(75.0), 0.0);
        let mid = config.charging_probability(50.0);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn charged_exit_probability_ramps_to_force_threshold() {
        let config = SimConfig::default();
        assert_eq!(config.charged_exit_probability(50.0), 0.0);
        assert_eq!(config.charged_exit_probability(95.0), 1.0);
        let lower = config.charged_exit_probability(85.0);
        let higher = config.charged_exit_probability(92.0);
        assert!(lower < higher);
    }
}
