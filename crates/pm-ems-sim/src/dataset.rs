//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dataset container, summary statistics, and CSV/JSON persistence."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use pm_ems_common::{EquipmentHealth, EquipmentType, FailureReason};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::record::{EquipmentRecord, COLUMNS};

/// On-disk encoding of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    #[default]
    Csv,
    Json,
}

impl DatasetFormat {
    /// Infer the format from a file extension, if it names one.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    pub fn extension(self) -> &'static str {
        match self {
            DatasetFormat::Csv => "csv",
            DatasetFormat::Json => "json",
        }
    }
}

impl FromStr for DatasetFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(DatasetFormat::Csv),
            "json" => Ok(DatasetFormat::Json),
            other => Err(format!("unsupported dataset format '{other}'")),
        }
    }
}

/// Aggregate counts over a dataset. Keys are the dataset labels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub records: usize,
    pub health: IndexMap<String, usize>,
    pub reasons: IndexMap<String, usize>,
    pub equipment: IndexMap<String, usize>,
    pub mean_failure_probability: f64,
}

impl DatasetSummary {
    pub fn from_records(records: &[EquipmentRecord]) -> Self {
        let mut health: IndexMap<String, usize> = [
            EquipmentHealth::Good,
            EquipmentHealth::Moderate,
            EquipmentHealth::Critical,
        ]
        .iter()
        .map(|tier| (tier.to_string(), 0))
        .collect();
        let mut reasons: IndexMap<String, usize> = IndexMap::new();
        let mut equipment: IndexMap<String, usize> = EquipmentType::ALL
            .iter()
            .map(|kind| (kind.to_string(), 0))
            .collect();
        let mut probability_sum = 0.0;

        for record in records {
            *health.entry(record.equipment_health.to_string()).or_default() += 1;
            *reasons.entry(record.failure_reason.to_string()).or_default() += 1;
            *equipment.entry(record.equipment_type.to_string()).or_default() += 1;
            probability_sum += record.failure_probability;
        }
        reasons.sort_keys();

        let mean_failure_probability = if records.is_empty() {
            0.0
        } else {
            probability_sum / records.len() as f64
        };

        Self {
            records: records.len(),
            health,
            reasons,
            equipment,
            mean_failure_probability,
        }
    }

    pub fn health_count(&self, health: EquipmentHealth) -> usize {
        self.health.get(health.as_ref()).copied().unwrap_or(0)
    }

    pub fn reason_count(&self, reason: FailureReason) -> usize {
        self.reasons.get(reason.as_ref()).copied().unwrap_or(0)
    }

    pub fn equipment_count(&self, equipment: EquipmentType) -> usize {
        self.equipment.get(equipment.as_ref()).copied().unwrap_or(0)
    }
}

/// Ordered collection of labeled equipment records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    records: Vec<EquipmentRecord>,
}

impl Dataset {
    pub fn new(records: Vec<EquipmentRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EquipmentRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EquipmentRecord> {
        self.records
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::from_records(&self.records)
    }

    /// Write the dataset with a header row and one line per record.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        if self.records.is_empty() {
            csv.write_record(COLUMNS)?;
        }
        for record in &self.records {
            csv.serialize(record)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write the dataset as a pretty-printed JSON array of records.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.records)?;
        Ok(())
    }

    pub fn write<W: Write>(&self, writer: W, format: DatasetFormat) -> Result<()> {
        match format {
            DatasetFormat::Csv => self.write_csv(writer),
            DatasetFormat::Json => self.write_json(writer),
        }
    }

    pub fn write_path(&self, path: &Path, format: DatasetFormat) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer, format)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a CSV dataset. The header must list every column in order.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv.headers()?.clone();
        if !headers.iter().eq(COLUMNS.iter().copied()) {
            return Err(SimulationError::HeaderMismatch {
                expected: COLUMNS.join(","),
                found: headers.iter().collect::<Vec<_>>().join(","),
            });
        }
        let records = csv
            .deserialize()
            .collect::<std::result::Result<Vec<EquipmentRecord>, _>>()?;
        Ok(Self::new(records))
    }

    pub fn read_json<R: Read>(reader: R) -> Result<Self> {
        let records: Vec<EquipmentRecord> = serde_json::from_reader(reader)?;
        Ok(Self::new(records))
    }

    pub fn read<R: Read>(reader: R, format: DatasetFormat) -> Result<Self> {
        match format {
            DatasetFormat::Csv => Self::read_csv(reader),
            DatasetFormat::Json => Self::read_json(reader),
        }
    }

    pub fn read_path(path: &Path, format: DatasetFormat) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?), format)
    }
}
