//! Parameters of an experiment.
//!
//! None of these are stored in a capture; they must match
//! the device and the setup the capture was recorded with.
//! Missing fields take the defaults of the reference
//! device:
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use thermal_stream::config::ExperimentConfig;
//! let config: ExperimentConfig = serde_json::from_str(
//!     r#"{ "frames_per_second": 4, "distance_to_target_mm": 200 }"#
//! )?;
//! assert_eq!(config.geometry.grid_width, 32);
//! # Ok(())
//! # }
//! ```
use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use serde_derive::*;

use crate::{
    error::{Error, Result},
    geometry::{Projection, ReferencePoints, SensorGeometry},
};

pub const DEFAULT_FPS: u32 = 16;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    pub frames_per_second: u32,
    pub geometry: SensorGeometry,
    pub projection: Projection,
    pub distance_to_target_mm: f64,
    pub target_lateral_offset_mm: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            frames_per_second: DEFAULT_FPS,
            geometry: SensorGeometry::default(),
            projection: Projection::default(),
            distance_to_target_mm: 150.,
            target_lateral_offset_mm: 20.,
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let config: ExperimentConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frames_per_second == 0 {
            return Err(Error::config("frames_per_second must be positive"));
        }
        self.geometry.validate()
    }

    /// Validate and place the reference points.
    pub fn reference_points(&self) -> Result<ReferencePoints> {
        self.validate()?;
        ReferencePoints::compute(
            &self.geometry,
            &self.projection,
            self.distance_to_target_mm,
            self.target_lateral_offset_mm,
        )
    }
}
