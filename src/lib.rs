//! Library to decode and analyze raw captures from
//! low-resolution thermal sensors.
//!
//! A capture is a headerless stream of little-endian `f32`
//! temperature frames (32x24 on the reference device). This
//! crate provides:
//!
//! 1. A lazy [frame decoder](decode::FrameDecoder) that
//! turns any [`Read`](std::io::Read) into timestamped
//! frames, tolerating captures that do not end on a frame
//! boundary.
//!
//! 2. [Reference point placement](geometry::ReferencePoints)
//! from the sensor optics and the distance to the target,
//! and [per-frame statistics](analysis::FrameStatistics) at
//! those points.
//!
//! 3. [Time series](series::ExperimentSeries) over a whole
//! capture, including when the left/right differential
//! peaked.
//!
//! # Usage
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use thermal_stream::{Experiment, ExperimentConfig};
//!
//! let config = ExperimentConfig {
//!     frames_per_second: 4,
//!     distance_to_target_mm: 200.,
//!     ..Default::default()
//! };
//! let output = Experiment::new(config)?.run_path("ds-4-200-20200101-1-plate.raw")?;
//! println!("{}", output.series.summary());
//! # Ok(())
//! # }
//! ```
//!
//! Captures following the `ds-$FPS-$DMM-...` naming
//! convention can be found with [`dataset::discover`], and
//! frames can be rendered as false-colour PNGs with
//! [`render::Heatmap`].

mod parse;

pub mod error;
pub mod geometry;
pub mod decode;
pub mod analysis;
pub mod series;
pub mod config;
pub mod experiment;

pub mod dataset;
pub mod render;

#[cfg(feature = "cli")]
pub mod cli;

pub use crate::config::ExperimentConfig;
pub use crate::error::{Error, Result};
pub use crate::experiment::{Experiment, ExperimentOutput};
