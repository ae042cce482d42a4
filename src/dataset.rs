//! Discover captures in a directory.
//!
//! Captures are stored as `.raw` files named
//!
//! ```text
//! ds-$FPS-$DMM-$DATE-$SEQ-$DESCRIPTION.raw
//! ```
//!
//! where `$FPS` is the frame rate the sensor ran at and
//! `$DMM` the distance to the target in millimeters. Date
//! and sequence number are kept verbatim; the description
//! is free text (and may itself contain `-`).
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use glob::{glob, Pattern};
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use serde_derive::*;

use crate::config::ExperimentConfig;

pub const DATASET_EXT: &str = "raw";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Dataset {
    pub path: PathBuf,
    pub frames_per_second: u32,
    pub distance_mm: u32,
    pub date: String,
    pub sequence: String,
    pub description: String,
}

impl Dataset {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(r"^ds-(\d+)-(\d+)-([^-]+)-([^-]+)-(.*)\.raw$").unwrap();
        }

        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("no file name in {}", path.display()))?;
        let caps = RE
            .captures(name)
            .ok_or_else(|| anyhow!("unexpected dataset name: {}", name))?;

        Ok(Dataset {
            path: path.to_owned(),
            frames_per_second: caps[1]
                .parse()
                .with_context(|| format!("frame rate in {}", name))?,
            distance_mm: caps[2]
                .parse()
                .with_context(|| format!("distance in {}", name))?,
            date: caps[3].to_owned(),
            sequence: caps[4].to_owned(),
            description: caps[5].to_owned(),
        })
    }

    /// `base` with the frame rate and distance of this
    /// capture.
    pub fn config(&self, base: &ExperimentConfig) -> ExperimentConfig {
        ExperimentConfig {
            frames_per_second: self.frames_per_second,
            distance_to_target_mm: self.distance_mm as f64,
            ..base.clone()
        }
    }
}

/// List the datasets directly under `dir`, sorted by path.
/// Files whose names do not follow the convention are
/// skipped with a warning.
pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Vec<Dataset>> {
    let dir = dir.as_ref();
    let dir_str = dir
        .to_str()
        .ok_or_else(|| anyhow!("non utf-8 path: {}", dir.display()))?;
    let pattern = format!("{}/*.{}", Pattern::escape(dir_str), DATASET_EXT);

    let mut datasets = vec![];
    for entry in glob(&pattern)? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        match Dataset::from_path(&path) {
            Ok(ds) => datasets.push(ds),
            Err(e) => warn!("skipping {}: {:#}", path.display(), e),
        }
    }
    datasets.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(datasets)
}
