use anyhow::Result;
use clap::value_t_or_exit;
use std::path::PathBuf;
use thermal_stream::{arg, args_parser, dataset::Dataset, opt, render::Heatmap, ExperimentConfig};

pub struct Args {
    pub path: PathBuf,
    pub output: PathBuf,
    pub config: ExperimentConfig,
    pub heatmap: Heatmap,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("thermal-render")
            .setting(clap::AppSettings::AllowLeadingHyphen)
            .about("Render every frame of a raw capture as a false-colour PNG.")
            .arg(
                opt!("output")
                    .required(true)
                    .help("Directory to write frame-NNNNNN.png files to"),
            )
            .arg(opt!("config").short("c").help("JSON experiment config"))
            .arg(opt!("fps").short("f").help("Frames per second"))
            .arg(opt!("distance").short("d").help("Distance to target in mm"))
            .arg(opt!("offset").short("o").help(
                "Lateral offset of the side reference points on the target, in mm",
            ))
            .arg(opt!("min").help("Temperature mapped to black.  Default is -15"))
            .arg(opt!("max").help("Temperature mapped to white.  Default is 120"))
            .arg(opt!("scale").short("s").help("Output pixels per sensor pixel.  Default is 1"))
            .arg(
                opt!("flip")
                    .takes_value(false)
                    .help("Render the last sensor row at the top"),
            )
            .arg(arg!("capture").required(true).help("Raw capture path"))
            .get_matches();

        let path: PathBuf = value_t_or_exit!(matches, "capture", PathBuf);
        let output = value_t_or_exit!(matches, "output", PathBuf);

        let mut config = match matches.value_of("config") {
            Some(path) => ExperimentConfig::from_json_path(path)?,
            None => ExperimentConfig::default(),
        };
        if let Ok(ds) = Dataset::from_path(&path) {
            config = ds.config(&config);
        }
        if matches.is_present("fps") {
            config.frames_per_second = value_t_or_exit!(matches.value_of("fps"), u32);
        }
        if matches.is_present("distance") {
            config.distance_to_target_mm = value_t_or_exit!(matches.value_of("distance"), f64);
        }
        if matches.is_present("offset") {
            config.target_lateral_offset_mm = value_t_or_exit!(matches.value_of("offset"), f64);
        }

        let defaults = Heatmap::default();
        let heatmap = Heatmap {
            vmin: matches
                .is_present("min")
                .then(|| value_t_or_exit!(matches.value_of("min"), f32))
                .unwrap_or(defaults.vmin),
            vmax: matches
                .is_present("max")
                .then(|| value_t_or_exit!(matches.value_of("max"), f32))
                .unwrap_or(defaults.vmax),
            scale: matches
                .is_present("scale")
                .then(|| value_t_or_exit!(matches.value_of("scale"), usize))
                .unwrap_or(defaults.scale),
            flip_vertical: matches.is_present("flip"),
        };

        Ok(Args {
            path,
            output,
            config,
            heatmap,
        })
    }
}
