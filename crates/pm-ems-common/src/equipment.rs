//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Equipment catalogue shared by the simulator and inference contract."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// Closed set of medical equipment kinds covered by the simulator.
///
/// The string form (`Display`/`FromStr`/serde) is the exact label written to
/// the dataset's `equipment_type` column.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    AsRefStr,
)]
pub enum EquipmentType {
    #[serde(rename = "MRI Scanner")]
    #[strum(serialize = "MRI Scanner")]
    MriScanner,
    #[serde(rename = "Ventilator")]
    #[strum(serialize = "Ventilator")]
    Ventilator,
    #[serde(rename = "CT Scanner")]
    #[strum(serialize = "CT Scanner")]
    CtScanner,
    #[serde(rename = "X-ray Machine")]
    #[strum(serialize = "X-ray Machine")]
    XRayMachine,
    #[serde(rename = "Blood Analyzer")]
    #[strum(serialize = "Blood Analyzer")]
    BloodAnalyzer,
}

impl EquipmentType {
    /// All equipment kinds in catalogue order.
    pub const ALL: [EquipmentType; 5] = [
        EquipmentType::MriScanner,
        EquipmentType::Ventilator,
        EquipmentType::CtScanner,
        EquipmentType::XRayMachine,
        EquipmentType::BloodAnalyzer,
    ];

    /// Position of this kind within [`EquipmentType::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn labels_round_trip_through_strings() {
        for kind in EquipmentType::iter() {
            let label = kind.to_string();
            assert_eq!(EquipmentType::from_str(&label).unwrap(), kind);
        }
        assert_eq!(EquipmentType::XRayMachine.as_ref(), "X-ray Machine");
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert!(EquipmentType::from_str("Dialysis Machine").is_err());
        assert!(EquipmentType::from_str("ct scanner").is_err());
    }

    #[test]
    fn serde_uses_dataset_labels() {
        let json = serde_json::to_string(&EquipmentType::CtScanner).unwrap();
        assert_eq!(json, "\"CT Scanner\"");
        let parsed: EquipmentType = serde_json::from_str("\"Blood Analyzer\"").unwrap();
        assert_eq!(parsed, EquipmentType::BloodAnalyzer);
        assert_eq!(EquipmentType::COUNT, EquipmentType::ALL.len());
    }

    #[test]
    fn index_matches_catalogue_position() {
        for (position, kind) in EquipmentType::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }
}
