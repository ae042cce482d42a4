mod args;

use anyhow::{bail, Result};
use args::Args;
use serde_derive::*;

use thermal_stream::{
    cli::{collect_inputs, process_inputs_par},
    geometry::ReferencePoints,
    series::{ExperimentSeries, SeriesSummary},
};

fn main() -> Result<()> {
    env_logger::init();
    let Args {
        paths,
        config,
        fps,
        distance,
        csv,
        parallel,
    } = Args::from_cmd_line()?;

    let mut inputs = collect_inputs(&paths, &config)?;
    for input in inputs.iter_mut() {
        if let Some(fps) = fps {
            input.config.frames_per_second = fps;
        }
        if let Some(distance) = distance {
            input.config.distance_to_target_mm = distance;
        }
    }
    if inputs.is_empty() {
        bail!("no captures found");
    }
    if csv && inputs.len() != 1 {
        bail!("--csv needs exactly one capture, found {}", inputs.len());
    }

    let mut experiments = vec![];
    let mut failed = 0;
    for (input, res) in process_inputs_par(inputs, parallel) {
        match res {
            Ok(output) => {
                eprintln!("{}:\n{}", input.path.display(), output.series.summary());
                experiments.push(ExperimentJson {
                    path: input.path.display().to_string(),
                    references: output.references,
                    cancelled: output.cancelled,
                    summary: output.series.summary(),
                    series: output.series,
                });
            }
            Err(e) => {
                eprintln!("{:#}", e);
                failed += 1;
            }
        }
    }

    if csv {
        if let Some(exp) = experiments.first() {
            exp.series.write_csv(std::io::stdout().lock())?;
        }
    } else {
        serde_json::to_writer(std::io::stdout().lock(), &OutputJson { experiments })?;
    }

    if failed > 0 {
        bail!("{} capture(s) could not be analyzed", failed);
    }
    Ok(())
}

#[derive(Serialize, Debug)]
struct OutputJson {
    experiments: Vec<ExperimentJson>,
}

#[derive(Serialize, Debug)]
struct ExperimentJson {
    path: String,
    references: ReferencePoints,
    cancelled: bool,
    summary: SeriesSummary,
    series: ExperimentSeries,
}
