use anyhow::Result;
use clap::value_t_or_exit;
use std::path::PathBuf;
use thermal_stream::{arg, args_parser, opt, ExperimentConfig};

pub struct Args {
    pub paths: Vec<PathBuf>,
    pub config: ExperimentConfig,
    pub fps: Option<u32>,
    pub distance: Option<f64>,
    pub csv: bool,
    pub parallel: Option<usize>,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("thermal-stats")
            .about("Compute reference temperatures and time series from raw captures.")
            .arg(opt!("config").short("c").help(
                "JSON experiment config (default: 32x24 sensor, 16 fps, 150 mm, 20 mm offset)",
            ))
            .arg(
                opt!("fps")
                    .short("f")
                    .help("Frames per second (overrides config and dataset names)"),
            )
            .arg(
                opt!("distance")
                    .short("d")
                    .help("Distance to target in mm (overrides config and dataset names)"),
            )
            .arg(opt!("offset").short("o").help(
                "Lateral offset of the side reference points on the target, in mm",
            ))
            .arg(
                opt!("csv")
                    .takes_value(false)
                    .help("Print the series of a single capture as CSV instead of JSON"),
            )
            .arg(
                opt!("parallel")
                    .short("p")
                    .help("Analyze frames in parallel batches of this size"),
            )
            .arg(
                arg!("paths")
                    .required(true)
                    .multiple(true)
                    .help("Capture files or dataset directories"),
            )
            .get_matches();

        let paths = matches
            .values_of("paths")
            .unwrap()
            .map(|f| f.into())
            .collect();

        let mut config = match matches.value_of("config") {
            Some(path) => ExperimentConfig::from_json_path(path)?,
            None => ExperimentConfig::default(),
        };
        let fps = matches
            .is_present("fps")
            .then(|| value_t_or_exit!(matches.value_of("fps"), u32));
        let distance = matches
            .is_present("distance")
            .then(|| value_t_or_exit!(matches.value_of("distance"), f64));
        if matches.is_present("offset") {
            config.target_lateral_offset_mm = value_t_or_exit!(matches.value_of("offset"), f64);
        }

        let csv = matches.is_present("csv");
        let parallel = matches
            .is_present("parallel")
            .then(|| value_t_or_exit!(matches.value_of("parallel"), usize));

        Ok(Args {
            paths,
            config,
            fps,
            distance,
            csv,
            parallel,
        })
    }
}
