mod args;

use anyhow::Result;
use indicatif::ProgressBar;

use thermal_stream::cli::{render_capture, ExperimentInput};

use crate::args::Args;

fn main() -> Result<()> {
    env_logger::init();
    let Args {
        path,
        output,
        config,
        heatmap,
    } = Args::from_cmd_line()?;

    let input = ExperimentInput { path, config };
    let bar = ProgressBar::new_spinner();
    let rendered = render_capture(&input, &heatmap, &output, &bar)?;
    bar.finish_and_clear();

    eprintln!("Rendered {} frames to {}", rendered.frames, output.display());
    if let Some(series) = rendered.series {
        eprintln!("{}", series.summary());
    }
    eprintln!(
        "Colour range: {} C (black) .. {} C (white)",
        heatmap.vmin, heatmap.vmax
    );
    Ok(())
}
