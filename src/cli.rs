//! Helpers for the accompanying binaries: argument parsing
//! and running experiments over many captures.
//!
//! APIs here shouldn't be considered stable / used as a
//! library.
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
pub use clap::{App, Arg};
use indicatif::{ProgressBar, ProgressStyle};
pub use inflector::Inflector;
use log::warn;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    analysis::analyze,
    config::ExperimentConfig,
    dataset::{discover, Dataset},
    decode::FrameDecoder,
    error::Error,
    experiment::{open_capture, Experiment, ExperimentOutput},
    render::Heatmap,
    series::{ExperimentSeries, SeriesAggregator},
};

#[macro_export]
macro_rules! args_parser {
    ($name:expr) => {{
        $crate::cli::App::new($name)
            .version(clap::crate_version!())
            .author(clap::crate_authors!())
    }};
}

#[macro_export]
macro_rules! arg {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name).value_name(&$name.to_screaming_snake_case())
    }};
}

#[macro_export]
macro_rules! opt {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name)
            .long(&$name.to_kebab_case())
            .value_name(&$name.to_screaming_snake_case())
    }};
}

pub fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {wide_bar:cyan/blue} {pos:>7}/{len:7}"),
    );
    bar
}

/// A capture to analyze with its configuration.
#[derive(Debug, Clone)]
pub struct ExperimentInput {
    pub path: PathBuf,
    pub config: ExperimentConfig,
}

impl ExperimentInput {
    /// Run the experiment, analyzing frames in parallel
    /// batches of `batch` if given.
    pub fn run(&self, batch: Option<usize>) -> Result<ExperimentOutput> {
        let exp = Experiment::new(self.config.clone())?;
        let res = match batch {
            Some(n) => open_capture(&self.path).and_then(|f| exp.run_par(f, n)),
            None => exp.run_path(&self.path),
        };
        res.with_context(|| format!("analyzing {}", self.path.display()))
    }
}

/// Expand paths into experiment inputs. Directories are
/// searched for datasets, which take frame rate and distance
/// from their names; plain files use `base` as is.
pub fn collect_inputs(paths: &[PathBuf], base: &ExperimentConfig) -> Result<Vec<ExperimentInput>> {
    let mut inputs = vec![];
    for path in paths {
        if path.is_dir() {
            for ds in discover(path)? {
                inputs.push(dataset_input(&ds, base));
            }
        } else {
            inputs.push(file_input(path, base));
        }
    }
    Ok(inputs)
}

fn dataset_input(ds: &Dataset, base: &ExperimentConfig) -> ExperimentInput {
    ExperimentInput {
        path: ds.path.clone(),
        config: ds.config(base),
    }
}

fn file_input(path: &Path, base: &ExperimentConfig) -> ExperimentInput {
    // a file following the dataset convention still carries its own fps and distance
    match Dataset::from_path(path) {
        Ok(ds) => dataset_input(&ds, base),
        Err(_) => ExperimentInput {
            path: path.to_owned(),
            config: base.clone(),
        },
    }
}

/// Run every input as an independent experiment, in
/// parallel. Results keep the order of `inputs`.
pub fn process_inputs_par(
    inputs: Vec<ExperimentInput>,
    batch: Option<usize>,
) -> Vec<(ExperimentInput, Result<ExperimentOutput>)> {
    let bar = progress_bar(inputs.len());
    let bar_dup = bar.clone();

    let results = inputs
        .into_par_iter()
        .map(|input| {
            let res = input.run(batch);
            (input, res)
        })
        .inspect(move |_| bar_dup.inc(1))
        .collect();
    bar.finish_and_clear();
    results
}

/// Frames written by [`render_capture`].
#[derive(Debug)]
pub struct RenderOutput {
    pub frames: usize,
    /// `None` when the reference points do not fit the grid.
    pub series: Option<ExperimentSeries>,
}

/// Render every frame of `input` as `frame-NNNNNN.png` under
/// `output`, ticking `bar` once per frame.
///
/// Statistics are collected alongside when the reference
/// points can be placed; otherwise the frames are still
/// rendered.
pub fn render_capture(
    input: &ExperimentInput,
    heatmap: &Heatmap,
    output: &Path,
    bar: &ProgressBar,
) -> Result<RenderOutput> {
    let config = &input.config;
    config.validate()?;
    let exp = match Experiment::new(config.clone()) {
        Ok(exp) => Some(exp),
        Err(e @ Error::Configuration(_)) => {
            warn!(
                "{}: {}; rendering without statistics",
                input.path.display(),
                e
            );
            None
        }
        Err(e) => return Err(e.into()),
    };

    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;
    let decoder = FrameDecoder::new(
        open_capture(&input.path)?,
        config.geometry.grid_size(),
        config.frames_per_second,
    )?;

    let mut agg = SeriesAggregator::new();
    let mut frames = 0;
    for frame in decoder {
        let frame = frame?;
        if let Some(exp) = &exp {
            agg.push(&analyze(&frame, exp.references())?);
        }
        heatmap.write_png_path(
            &frame.grid,
            output.join(format!("frame-{:06}.png", frame.index)),
        )?;
        frames += 1;
        bar.inc(1);
    }

    let series = match exp {
        Some(_) => Some(agg.finish(config.frames_per_second)?),
        None => None,
    };
    Ok(RenderOutput { frames, series })
}
