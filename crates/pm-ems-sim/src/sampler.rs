//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Per-record sensor and environment sampling."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use pm_ems_common::{ClosedRange, ConfigError, EquipmentType, MeasurementRanges};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Raw measurements for one piece of equipment, before any labeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub equipment_id: String,
    pub equipment_type: EquipmentType,
    pub temperature_avg: f64,
    pub humidity_avg: f64,
    pub last_maintenance_days: u32,
    pub uptime_hours: u32,
    pub sensor_1: f64,
    pub sensor_2: f64,
    pub vibration: f64,
    pub voltage_fluctuation: f64,
    pub pressure: f64,
}

/// Draws independent readings from the configured ranges.
///
/// Sensor channels get additive zero-mean Gaussian noise after the uniform
/// draw. No correlation between fields is introduced here.
#[derive(Debug, Clone)]
pub struct MeasurementSampler {
    ranges: MeasurementRanges,
    noise: Normal<f64>,
}

impl MeasurementSampler {
    pub fn new(ranges: MeasurementRanges, noise_sigma: f64) -> Result<Self, ConfigError> {
        let noise = Normal::new(0.0, noise_sigma)
            .map_err(|_| ConfigError::InvalidNoiseSigma(noise_sigma))?;
        Ok(Self { ranges, noise })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SensorReading {
        let ranges = &self.ranges;
        let equipment_id = format!(
            "EQ-{}",
            rng.gen_range(ranges.equipment_id.min..=ranges.equipment_id.max)
        );
        let equipment_type = EquipmentType::ALL[rng.gen_range(0..EquipmentType::ALL.len())];
        let temperature_avg = round_dp(uniform(rng, &ranges.temperature_avg), 1);
        let humidity_avg = round_dp(uniform(rng, &ranges.humidity_avg), 1);
        let last_maintenance_days =
            rng.gen_range(ranges.last_maintenance_days.min..=ranges.last_maintenance_days.max);
        let uptime_hours = rng.gen_range(ranges.uptime_hours.min..=ranges.uptime_hours.max);

        SensorReading {
            equipment_id,
            equipment_type,
            temperature_avg,
            humidity_avg,
            last_maintenance_days,
            uptime_hours,
            sensor_1: round_dp(self.noisy(rng, &ranges.sensor), 2),
            sensor_2: round_dp(self.noisy(rng, &ranges.sensor), 2),
            vibration: round_dp(self.noisy(rng, &ranges.vibration), 2),
            voltage_fluctuation: round_dp(self.noisy(rng, &ranges.voltage_fluctuation), 2),
            pressure: round_dp(self.noisy(rng, &ranges.pressure), 1),
        }
    }

    fn noisy<R: Rng + ?Sized>(&self, rng: &mut R, range: &ClosedRange<f64>) -> f64 {
        uniform(rng, range) + self.noise.sample(rng)
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, range: &ClosedRange<f64>) -> f64 {
    rng.gen_range(range.min..=range.max)
}

/// Round half away from zero to `decimals` places.
pub(crate) fn round_dp(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn sampler() -> MeasurementSampler {
        MeasurementSampler::new(MeasurementRanges::default(), 0.05).unwrap()
    }

    fn decimals_at_most(value: f64, decimals: i32) -> bool {
        (round_dp(value, decimals) - value).abs() < 1e-9
    }

    #[test]
    fn readings_stay_within_ranges_plus_noise() {
        let sampler = sampler();
        let mut rng = StdRng::seed_from_u64(42);
        // Noise is N(0, 0.05); 0.5 is ten sigma.
        let slack = 0.5;
        for _ in 0..5_000 {
            let reading = sampler.sample(&mut rng);
            assert!((18.0..=40.0).contains(&reading.temperature_avg));
            assert!((20.0..=80.0).contains(&reading.humidity_avg));
            assert!(reading.last_maintenance_days <= 730);
            assert!((100..=5000).contains(&reading.uptime_hours));
            assert!(reading.sensor_1 > -slack && reading.sensor_1 < 1.0 + slack);
            assert!(reading.sensor_2 > -slack && reading.sensor_2 < 1.0 + slack);
            assert!(reading.vibration > -slack && reading.vibration < 6.0 + slack);
            assert!(reading.voltage_fluctuation > -slack && reading.voltage_fluctuation < 1.5 + slack);
            assert!(reading.pressure > 80.0 - slack && reading.pressure < 130.0 + slack);
        }
    }

    #[test]
    fn readings_are_rounded_per_column() {
        let sampler = sampler();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let reading = sampler.sample(&mut rng);
            assert!(decimals_at_most(reading.temperature_avg, 1));
            assert!(decimals_at_most(reading.humidity_avg, 1));
            assert!(decimals_at_most(reading.pressure, 1));
            assert!(decimals_at_most(reading.sensor_1, 2));
            assert!(decimals_at_most(reading.vibration, 2));
            assert!(decimals_at_most(reading.voltage_fluctuation, 2));
        }
    }

    #[test]
    fn equipment_ids_and_types_follow_catalogue() {
        let sampler = sampler();
        let mut rng = StdRng::seed_from_u64(11);
        let mut kinds = HashSet::new();
        for _ in 0..1_000 {
            let reading = sampler.sample(&mut rng);
            let digits = reading.equipment_id.strip_prefix("EQ-").unwrap();
            assert_eq!(digits.len(), 4);
            let id: u32 = digits.parse().unwrap();
            assert!((1000..=9999).contains(&id));
            kinds.insert(reading.equipment_type);
        }
        assert_eq!(kinds.len(), EquipmentType::ALL.len());
    }

    #[test]
    fn same_seed_produces_same_readings() {
        let sampler = sampler();
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            assert_eq!(sampler.sample(&mut a), sampler.sample(&mut b));
        }
    }

    #[test]
    fn rejects_invalid_sigma() {
        assert!(MeasurementSampler::new(MeasurementRanges::default(), f64::NAN).is_err());
    }

    #[test]
    fn round_dp_rounds_half_away_from_zero() {
        assert_eq!(round_dp(0.125, 2), 0.13);
        assert_eq!(round_dp(1.649999, 2), 1.65);
        assert_eq!(round_dp(-0.04, 1), -0.0);
    }
}
