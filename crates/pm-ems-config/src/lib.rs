//! ---
//! ems_section: "04-configuration-orchestration"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dataset manifest persistence and configuration hashing."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Manifests record how a dataset was produced so it can be regenerated or
//! audited later. A manifest sits next to its dataset as
//! `<output>.manifest.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pm_ems_common::SimulatorConfig;
use pm_ems_sim::{DatasetFormat, DatasetSummary};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Suffix appended to the dataset file name.
pub const MANIFEST_SUFFIX: &str = ".manifest.toml";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to serialise manifest: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("manifest I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest seed '{0}' is not a valid u64")]
    InvalidSeed(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;

/// Provenance of a generated dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetMetadata {
    /// Timestamp (UTC) when the dataset was generated.
    pub generated_at: DateTime<Utc>,
    /// RNG seed, kept as a string since TOML integers are signed 64-bit.
    pub seed: String,
    pub samples: usize,
    pub format: DatasetFormat,
    /// Dataset location as given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// SHA-256 of the effective simulator configuration, seed excluded.
    pub config_hash: String,
    /// Version of the tooling that produced the dataset.
    pub source_version: String,
}

/// Manifest written next to a generated dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetManifest {
    pub dataset: DatasetMetadata,
    pub simulator: SimulatorConfig,
    pub summary: DatasetSummary,
}

impl DatasetManifest {
    /// Describe a dataset generated from `config` with `seed`.
    pub fn new(
        config: &SimulatorConfig,
        seed: u64,
        format: DatasetFormat,
        output: Option<&Path>,
        summary: DatasetSummary,
    ) -> Result<Self> {
        let simulator = without_seed(config);
        let config_hash = hash_simulator_config(&simulator)?;
        Ok(Self {
            dataset: DatasetMetadata {
                generated_at: Utc::now(),
                seed: seed.to_string(),
                samples: summary.records,
                format,
                output: output.map(|path| path.display().to_string()),
                config_hash,
                source_version: pm_ems_common::VERSION.to_owned(),
            },
            simulator,
            summary,
        })
    }

    pub fn seed(&self) -> Result<u64> {
        self.dataset
            .seed
            .parse()
            .map_err(|_| ManifestError::InvalidSeed(self.dataset.seed.clone()))
    }

    /// Simulator configuration that reproduces the dataset.
    pub fn reproduction_config(&self) -> Result<SimulatorConfig> {
        let mut config = self.simulator.clone();
        config.seed = Some(self.seed()?);
        config.samples = self.dataset.samples;
        Ok(config)
    }

    /// Whether the embedded configuration still matches the recorded hash.
    pub fn is_consistent(&self) -> Result<bool> {
        Ok(hash_simulator_config(&self.simulator)? == self.dataset.config_hash)
    }

    /// Write the manifest to `path`, replacing any previous file.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(path.to_path_buf())
    }

    /// Write the manifest next to the dataset at `output`.
    pub fn persist_alongside(&self, output: impl AsRef<Path>) -> Result<PathBuf> {
        self.persist(manifest_path_for(output))
    }
}

/// `<output>.manifest.toml` for a dataset path.
pub fn manifest_path_for(output: impl AsRef<Path>) -> PathBuf {
    let mut name = output.as_ref().as_os_str().to_owned();
    name.push(MANIFEST_SUFFIX);
    PathBuf::from(name)
}

pub fn load_manifest(path: impl AsRef<Path>) -> Result<DatasetManifest> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the manifest stored next to `output`, if there is one.
pub fn load_manifest_for(output: impl AsRef<Path>) -> Result<Option<DatasetManifest>> {
    let path = manifest_path_for(output);
    if !path.exists() {
        return Ok(None);
    }
    load_manifest(&path).map(Some)
}

/// SHA-256 over the TOML rendering of `config`, ignoring its seed.
pub fn hash_simulator_config(config: &SimulatorConfig) -> Result<String> {
    let serialised = toml::to_string(&without_seed(config))?;
    let mut hasher = Sha256::new();
    hasher.update(serialised.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn without_seed(config: &SimulatorConfig) -> SimulatorConfig {
    SimulatorConfig {
        seed: None,
        ..config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_ems_sim::DatasetGenerator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn summary() -> DatasetSummary {
        let generator = DatasetGenerator::new(SimulatorConfig::default()).unwrap();
        generator
            .generate(50, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .summary()
    }

    #[test]
    fn manifest_path_appends_suffix() {
        assert_eq!(
            manifest_path_for("out/equipment.csv"),
            PathBuf::from("out/equipment.csv.manifest.toml")
        );
    }

    #[test]
    fn hash_is_stable_and_ignores_seed() {
        let mut config = SimulatorConfig::default();
        let first = hash_simulator_config(&config).unwrap();
        config.seed = Some(99);
        assert_eq!(hash_simulator_config(&config).unwrap(), first);
        assert_eq!(first.len(), 64);

        config.noise_sigma = 0.1;
        assert_ne!(hash_simulator_config(&config).unwrap(), first);
    }

    #[test]
    fn persist_and_reload_manifest() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let output = dir.path().join("equipment.csv");
        let manifest = DatasetManifest::new(
            &SimulatorConfig::default(),
            u64::MAX,
            DatasetFormat::Csv,
            Some(&output),
            summary(),
        )?;
        let path = manifest.persist_alongside(&output)?;
        assert!(path.ends_with("equipment.csv.manifest.toml"));

        let loaded = load_manifest_for(&output)?.expect("manifest present");
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.seed()?, u64::MAX);
        assert_eq!(loaded.dataset.samples, 50);
        assert!(loaded.is_consistent()?);
        Ok(())
    }

    #[test]
    fn reproduction_config_restores_seed_and_samples() -> anyhow::Result<()> {
        let manifest = DatasetManifest::new(
            &SimulatorConfig::default(),
            1234,
            DatasetFormat::Json,
            None,
            summary(),
        )?;
        let config = manifest.reproduction_config()?;
        assert_eq!(config.seed, Some(1234));
        assert_eq!(config.samples, 50);
        assert!(manifest.simulator.seed.is_none());
        Ok(())
    }

    #[test]
    fn tampered_config_is_detected() -> anyhow::Result<()> {
        let mut manifest = DatasetManifest::new(
            &SimulatorConfig::default(),
            1,
            DatasetFormat::Csv,
            None,
            summary(),
        )?;
        manifest.simulator.cascade.base = 0.5;
        assert!(!manifest.is_consistent()?);
        Ok(())
    }

    #[test]
    fn missing_manifest_is_none() -> anyhow::Result<()> {
        let dir = tempdir()?;
        assert!(load_manifest_for(dir.path().join("absent.csv"))?.is_none());
        Ok(())
    }

    #[test]
    fn unreadable_manifest_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.manifest.toml");
        fs::write(&path, "dataset = 3").unwrap();
        let err = load_manifest(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert!(err.to_string().contains("broken.manifest.toml"));
    }
}
