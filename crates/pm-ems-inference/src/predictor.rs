//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Predictor seam and rule-based reference predictors."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use pm_ems_common::{EquipmentHealth, SimulatorConfig};
use pm_ems_sim::{FailureCascade, LabelRules, SimulationError};

use crate::error::{InferenceError, Result};
use crate::features::FeatureRow;
use crate::training::{ReasonEncoder, TargetColumn};

/// A fitted model for one target column.
///
/// Regression targets return the predicted value; the `failure_reason`
/// target returns the encoded class index (see [`ReasonEncoder`]).
pub trait Predictor: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> Result<f64>;
}

impl<F> Predictor for F
where
    F: Fn(&FeatureRow) -> Result<f64> + Send + Sync,
{
    fn predict(&self, row: &FeatureRow) -> Result<f64> {
        self(row)
    }
}

/// Predicts a fixed value regardless of input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPredictor(pub f64);

impl Predictor for ConstantPredictor {
    fn predict(&self, _row: &FeatureRow) -> Result<f64> {
        Ok(self.0)
    }
}

/// Scores rows with the generator's own rules.
///
/// Probability and reason follow the cascade and reason priority exactly.
/// Residual reasons resolve to the first residual class, and cost and uptime
/// predict the midpoint of the tier's range, since those columns are drawn
/// at random during generation.
#[derive(Debug, Clone)]
pub struct RulePredictor {
    target: TargetColumn,
    cascade: FailureCascade,
    labels: LabelRules,
    encoder: ReasonEncoder,
}

impl RulePredictor {
    pub fn new(
        config: &SimulatorConfig,
        target: TargetColumn,
    ) -> std::result::Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            target,
            cascade: FailureCascade::from_config(config)?,
            labels: LabelRules::new(config.labels.clone()),
            encoder: ReasonEncoder::all(),
        })
    }

    pub fn target(&self) -> TargetColumn {
        self.target
    }

    fn health(&self, row: &FeatureRow) -> EquipmentHealth {
        self.cascade.assess(&row.to_reading()).health()
    }
}

impl Predictor for RulePredictor {
    fn predict(&self, row: &FeatureRow) -> Result<f64> {
        let reading = row.to_reading();
        match self.target {
            TargetColumn::FailureProbability => Ok(self.cascade.assess(&reading).probability),
            TargetColumn::FailureReason => {
                let reason = self
                    .labels
                    .deterministic_reason(&reading)
                    .unwrap_or(pm_ems_common::FailureReason::RESIDUAL[0]);
                self.encoder
                    .encode(reason)
                    .map(|code| code as f64)
                    .ok_or_else(|| InferenceError::PredictorFailed {
                        target: self.target.name(),
                        message: format!("reason '{reason}' is not an encoded class"),
                    })
            }
            TargetColumn::CostImplications => {
                let range = self.labels.cost_range(self.health(row));
                Ok(midpoint(range.min, range.max))
            }
            TargetColumn::UpdatedUptime => {
                let range = self.labels.uptime_increment_range(self.health(row));
                Ok(row.uptime_hours + midpoint(range.min, range.max))
            }
        }
    }
}

fn midpoint(min: u32, max: u32) -> f64 {
    (f64::from(min) + f64::from(max)) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_ems_common::EquipmentType;

    fn row(temperature_avg: f64, vibration: f64) -> FeatureRow {
        FeatureRow {
            equipment_type: EquipmentType::CtScanner,
            temperature_avg,
            humidity_avg: 40.0,
            last_maintenance_days: 100.0,
            uptime_hours: 1000.0,
            sensor_1: 0.5,
            sensor_2: 0.5,
            vibration,
            voltage_fluctuation: 0.2,
            pressure: 90.0,
        }
    }

    fn predictor(target: TargetColumn) -> RulePredictor {
        RulePredictor::new(&SimulatorConfig::default(), target).unwrap()
    }

    #[test]
    fn rule_probability_matches_cascade() {
        let p = predictor(TargetColumn::FailureProbability);
        assert_eq!(p.predict(&row(35.0, 1.0)).unwrap(), 0.40);
        assert_eq!(p.predict(&row(20.0, 1.0)).unwrap(), 0.05);
    }

    #[test]
    fn rule_reason_is_encoded() {
        let p = predictor(TargetColumn::FailureReason);
        let encoder = ReasonEncoder::all();
        let code = p.predict(&row(37.0, 1.0)).unwrap();
        assert_eq!(
            encoder.decode(code).unwrap(),
            pm_ems_common::FailureReason::Overheating
        );
        let code = p.predict(&row(20.0, 1.0)).unwrap();
        assert!(encoder.decode(code).unwrap().is_residual());
    }

    #[test]
    fn rule_cost_and_uptime_use_tier_midpoints() {
        let cost = predictor(TargetColumn::CostImplications);
        assert_eq!(cost.predict(&row(35.0, 1.0)).unwrap(), 6000.0);
        let uptime = predictor(TargetColumn::UpdatedUptime);
        assert_eq!(uptime.predict(&row(20.0, 1.0)).unwrap(), 1900.0);
    }

    #[test]
    fn closures_are_predictors() {
        let p = |row: &FeatureRow| -> Result<f64> { Ok(row.vibration * 2.0) };
        assert_eq!(p.predict(&row(20.0, 1.5)).unwrap(), 3.0);
        assert_eq!(ConstantPredictor(0.7).predict(&row(20.0, 0.0)).unwrap(), 0.7);
    }
}
