//! Experiment-wide time series.
use std::{fmt, io::Write};

use serde_derive::*;

use crate::{
    analysis::FrameStatistics,
    error::{Error, Result},
};

/// Aligned per-frame series of one experiment plus the
/// peak of the left/right differential.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExperimentSeries {
    pub frames_per_second: u32,
    pub frame_count: usize,
    pub duration_s: f64,

    pub time_s: Vec<f64>,
    pub ref_temp_center: Vec<f32>,
    pub ref_temp_left: Vec<f32>,
    pub ref_temp_right: Vec<f32>,
    pub abs_diff: Vec<f32>,
    pub min_temp: Vec<f32>,
    pub max_temp: Vec<f32>,

    pub peak_diff_index: usize,
    pub peak_diff_value: f32,
    pub peak_diff_time_s: f64,
}

/// Folds frame statistics, in frame order, into an
/// [`ExperimentSeries`]. Order is not checked.
#[derive(Debug, Default)]
pub struct SeriesAggregator {
    time_s: Vec<f64>,
    ref_temp_center: Vec<f32>,
    ref_temp_left: Vec<f32>,
    ref_temp_right: Vec<f32>,
    abs_diff: Vec<f32>,
    min_temp: Vec<f32>,
    max_temp: Vec<f32>,
    peak: Option<(usize, f32)>,
}

impl SeriesAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        SeriesAggregator {
            time_s: Vec::with_capacity(n),
            ref_temp_center: Vec::with_capacity(n),
            ref_temp_left: Vec::with_capacity(n),
            ref_temp_right: Vec::with_capacity(n),
            abs_diff: Vec::with_capacity(n),
            min_temp: Vec::with_capacity(n),
            max_temp: Vec::with_capacity(n),
            peak: None,
        }
    }

    pub fn push(&mut self, stats: &FrameStatistics) {
        let pos = self.time_s.len();
        let diff = stats.abs_diff_left_right;
        // strict comparison keeps the first occurrence; NaN never wins
        let replace = match self.peak {
            None => true,
            Some((_, best)) => diff > best || (best.is_nan() && !diff.is_nan()),
        };
        if replace {
            self.peak = Some((pos, diff));
        }

        self.time_s.push(stats.timestamp_s());
        self.ref_temp_center.push(stats.ref_temp_center);
        self.ref_temp_left.push(stats.ref_temp_left);
        self.ref_temp_right.push(stats.ref_temp_right);
        self.abs_diff.push(diff);
        self.min_temp.push(stats.min_temp);
        self.max_temp.push(stats.max_temp);
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    pub fn finish(self, frames_per_second: u32) -> Result<ExperimentSeries> {
        let (peak_diff_index, peak_diff_value) = self.peak.ok_or(Error::EmptySeries)?;
        if frames_per_second == 0 {
            return Err(Error::config("frames_per_second must be positive"));
        }
        let frame_count = self.time_s.len();

        Ok(ExperimentSeries {
            frames_per_second,
            frame_count,
            duration_s: frame_count as f64 / frames_per_second as f64,
            peak_diff_index,
            peak_diff_value,
            peak_diff_time_s: self.time_s[peak_diff_index],
            time_s: self.time_s,
            ref_temp_center: self.ref_temp_center,
            ref_temp_left: self.ref_temp_left,
            ref_temp_right: self.ref_temp_right,
            abs_diff: self.abs_diff,
            min_temp: self.min_temp,
            max_temp: self.max_temp,
        })
    }
}

impl<'a> Extend<&'a FrameStatistics> for SeriesAggregator {
    fn extend<I: IntoIterator<Item = &'a FrameStatistics>>(&mut self, iter: I) {
        for stats in iter {
            self.push(stats);
        }
    }
}

/// Aggregate statistics given in frame order.
pub fn aggregate<'a, I>(stats: I, frames_per_second: u32) -> Result<ExperimentSeries>
where
    I: IntoIterator<Item = &'a FrameStatistics>,
{
    let mut agg = SeriesAggregator::new();
    agg.extend(stats);
    agg.finish(frames_per_second)
}

/// Scalar summary of an experiment for reports.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub frame_count: usize,
    pub duration_s: f64,
    pub peak_diff_value: f32,
    pub peak_diff_time_s: f64,
    pub coldest: f32,
    pub hottest: f32,
}

impl ExperimentSeries {
    pub fn summary(&self) -> SeriesSummary {
        let coldest = self.min_temp.iter().copied().fold(f32::INFINITY, f32::min);
        let hottest = self
            .max_temp
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        SeriesSummary {
            frame_count: self.frame_count,
            duration_s: self.duration_s,
            peak_diff_value: self.peak_diff_value,
            peak_diff_time_s: self.peak_diff_time_s,
            coldest,
            hottest,
        }
    }

    /// Write the series as CSV, one row per frame.
    pub fn write_csv<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "time_s,ref_center,ref_left,ref_right,abs_diff,min,max")?;
        for i in 0..self.frame_count {
            writeln!(
                w,
                "{},{},{},{},{},{},{}",
                self.time_s[i],
                self.ref_temp_center[i],
                self.ref_temp_left[i],
                self.ref_temp_right[i],
                self.abs_diff[i],
                self.min_temp[i],
                self.max_temp[i],
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} frames over {:.3} s",
            self.frame_count, self.duration_s
        )?;
        writeln!(
            f,
            "peak left/right difference: {:.3} C at {:.3} s",
            self.peak_diff_value, self.peak_diff_time_s
        )?;
        write!(
            f,
            "temperature range: {:.3} C .. {:.3} C",
            self.coldest, self.hottest
        )
    }
}
