//! Decode-and-analyze runs over one capture.
//!
//! An [`Experiment`] places its reference points once, when
//! it is created, and threads them through the analysis of
//! every frame. Frames are decoded lazily and dropped as
//! soon as they are analyzed; only the (much smaller)
//! per-frame statistics are kept for the whole run.
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use log::info;
use serde_derive::*;

use crate::{
    analysis::{analyze, analyze_batch_par, check_references, FrameStatistics},
    config::ExperimentConfig,
    decode::FrameDecoder,
    error::{Error, Result},
    geometry::ReferencePoints,
    series::{ExperimentSeries, SeriesAggregator},
};

/// Result of a completed (or cancelled) run.
#[derive(Serialize, Debug, Clone)]
pub struct ExperimentOutput {
    pub references: ReferencePoints,
    pub frames: Vec<FrameStatistics>,
    pub series: ExperimentSeries,
    /// The run stopped early on request; `frames` holds
    /// every frame analyzed up to that point.
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct Experiment {
    config: ExperimentConfig,
    references: ReferencePoints,
}

impl Experiment {
    /// Validate the configuration and place the reference
    /// points. Nothing is read yet.
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        let references = config.reference_points()?;
        check_references(&references, config.geometry.grid_size())?;
        info!(
            "reference points: center {}, left {}, right {} ({} px offset)",
            references.center, references.left, references.right, references.offset_pixel_count
        );
        Ok(Experiment { config, references })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn references(&self) -> &ReferencePoints {
        &self.references
    }

    pub fn decoder<R: Read>(&self, source: R) -> Result<FrameDecoder<R>> {
        FrameDecoder::new(
            source,
            self.config.geometry.grid_size(),
            self.config.frames_per_second,
        )
    }

    /// Lazily analyze every frame of `source`.
    ///
    /// An I/O failure is yielded once and ends the
    /// iteration; statistics yielded before it stay valid.
    pub fn statistics<'a, R: Read + 'a>(
        &'a self,
        source: R,
    ) -> Result<impl Iterator<Item = Result<FrameStatistics>> + 'a> {
        let refs = &self.references;
        Ok(self
            .decoder(source)?
            .map(move |frame| analyze(&frame?, refs)))
    }

    pub fn run<R: Read>(&self, source: R) -> Result<ExperimentOutput> {
        self.run_cancellable(source, &AtomicBool::new(false))
    }

    /// Like [`run`](Self::run), but checks `cancel` before
    /// reading each frame and stops once it is set.
    pub fn run_cancellable<R: Read>(
        &self,
        source: R,
        cancel: &AtomicBool,
    ) -> Result<ExperimentOutput> {
        let mut frames = vec![];
        let mut cancelled = false;
        let mut stats = self.statistics(source)?;
        loop {
            if cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            match stats.next() {
                Some(s) => frames.push(s?),
                None => break,
            }
        }
        self.finish(frames, cancelled)
    }

    /// Decode up to `batch` frames at a time and analyze
    /// each batch in parallel. Statistics are identical to
    /// [`run`](Self::run).
    pub fn run_par<R: Read>(&self, source: R, batch: usize) -> Result<ExperimentOutput> {
        let batch = batch.max(1);
        let mut decoder = self.decoder(source)?;
        let mut frames = vec![];
        loop {
            let chunk = decoder.by_ref().take(batch).collect::<Result<Vec<_>>>()?;
            if chunk.is_empty() {
                break;
            }
            frames.extend(analyze_batch_par(&chunk, &self.references)?);
        }
        self.finish(frames, false)
    }

    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<ExperimentOutput> {
        let path = path.as_ref();
        info!("analyzing {}", path.display());
        self.run(open_capture(path)?)
    }

    fn finish(&self, frames: Vec<FrameStatistics>, cancelled: bool) -> Result<ExperimentOutput> {
        let mut agg = SeriesAggregator::with_capacity(frames.len());
        agg.extend(&frames);
        let series = agg.finish(self.config.frames_per_second)?;
        info!(
            "{} frames{}, peak difference {:.3} at {:.3} s",
            series.frame_count,
            if cancelled { " (cancelled)" } else { "" },
            series.peak_diff_value,
            series.peak_diff_time_s
        );
        Ok(ExperimentOutput {
            references: self.references,
            frames,
            series,
            cancelled,
        })
    }
}

/// Open a capture file for buffered reading.
pub fn open_capture<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    let path = path.as_ref();
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })
}
