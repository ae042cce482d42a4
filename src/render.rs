//! False-colour rendering of frames.
//!
//! Temperatures are mapped onto a seven stop gradient
//! (black, blue, green, yellow, red, magenta, white) over a
//! fixed `[vmin, vmax]` range, so that colours are
//! comparable across frames of a capture.
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{ensure, Context, Result};
use itertools::iproduct;
use ndarray::Array2;

const STOPS: [[f32; 3]; 7] = [
    [0., 0., 0.],
    [0., 0., 1.],
    [0., 1., 0.],
    [1., 1., 0.],
    [1., 0., 0.],
    [1., 0., 1.],
    [1., 1., 1.],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heatmap {
    pub vmin: f32,
    pub vmax: f32,
    /// Output pixels per grid cell along each axis.
    pub scale: usize,
    /// Render the last grid row at the top.
    pub flip_vertical: bool,
}

impl Default for Heatmap {
    fn default() -> Self {
        Heatmap {
            vmin: -15.,
            vmax: 120.,
            scale: 1,
            flip_vertical: false,
        }
    }
}

impl Heatmap {
    pub fn colour(&self, val: f32) -> [u8; 3] {
        let v = (val - self.vmin) / (self.vmax - self.vmin);
        let last = STOPS.len() - 1;
        let (lo, hi, frac) = if !(v > 0.) {
            (0, 0, 0.)
        } else if v >= 1. {
            (last, last, 0.)
        } else {
            let v = v * last as f32;
            let lo = v.floor() as usize;
            (lo, lo + 1, v - lo as f32)
        };

        let mut rgb = [0u8; 3];
        for (c, out) in rgb.iter_mut().enumerate() {
            let val = (STOPS[hi][c] - STOPS[lo][c]) * frac + STOPS[lo][c];
            *out = (val * 255.) as u8;
        }
        rgb
    }

    /// Output dimensions `(width, height)` for a grid.
    pub fn dimensions(&self, grid: &Array2<f32>) -> (usize, usize) {
        let (ht, wid) = grid.dim();
        (wid * self.scale, ht * self.scale)
    }

    /// Render to a packed RGB8 buffer, row-major.
    pub fn to_rgb(&self, grid: &Array2<f32>) -> Vec<u8> {
        let (ht, _) = grid.dim();
        let (out_wid, out_ht) = self.dimensions(grid);
        let scale = self.scale.max(1);

        let mut buf = Vec::with_capacity(3 * out_wid * out_ht);
        for (row, col) in iproduct!(0..out_ht, 0..out_wid) {
            let y = row / scale;
            let y = if self.flip_vertical { ht - 1 - y } else { y };
            buf.extend_from_slice(&self.colour(grid[(y, col / scale)]));
        }
        buf
    }

    /// Encode `grid` as an RGB PNG into `writer`, flushing it
    /// before returning.
    pub fn write_png<W: Write>(&self, grid: &Array2<f32>, mut writer: W) -> Result<()> {
        writer.write_all(&self.encode_png(grid)?)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_png_path<P: AsRef<Path>>(&self, grid: &Array2<f32>, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        self.write_png(grid, &mut out)
            .with_context(|| format!("writing {}", path.display()))
    }

    /// The encoder only emits the closing chunk when dropped, and
    /// drops swallow errors, so encode to memory first.
    fn encode_png(&self, grid: &Array2<f32>) -> Result<Vec<u8>> {
        ensure!(self.scale > 0, "heatmap scale must be positive");
        ensure!(
            self.vmax > self.vmin,
            "empty heatmap range: {} .. {}",
            self.vmin,
            self.vmax
        );

        let (wid, ht) = self.dimensions(grid);
        let mut buf = vec![];
        {
            let mut encoder = png::Encoder::new(&mut buf, wid as u32, ht as u32);
            encoder.set_color(png::ColorType::RGB);
            encoder.set_depth(png::BitDepth::Eight);
            let mut png_writer = encoder.write_header()?;
            let mut png_streamer = png_writer.stream_writer();
            png_streamer.write_all(&self.to_rgb(grid))?;
            png_streamer.finish()?;
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn colour_endpoints_and_clamping() {
        let h = Heatmap::default();
        assert_eq!(h.colour(-15.), [0, 0, 0]);
        assert_eq!(h.colour(-100.), [0, 0, 0]);
        assert_eq!(h.colour(f32::NAN), [0, 0, 0]);
        assert_eq!(h.colour(120.), [255, 255, 255]);
        assert_eq!(h.colour(500.), [255, 255, 255]);
    }

    #[test]
    fn colour_interpolates_between_stops() {
        let h = Heatmap {
            vmin: 0.,
            vmax: 6.,
            ..Default::default()
        };
        assert_eq!(h.colour(1.), [0, 0, 255]);
        assert_eq!(h.colour(3.), [255, 255, 0]);
        assert_eq!(h.colour(4.5), [255, 0, 127]);
    }

    #[test]
    fn scaled_and_flipped_buffer() {
        let h = Heatmap {
            vmin: 0.,
            vmax: 6.,
            scale: 2,
            flip_vertical: true,
        };
        let grid = arr2(&[[0., 6.], [1., 3.]]);
        assert_eq!(h.dimensions(&grid), (4, 4));

        let rgb = h.to_rgb(&grid);
        assert_eq!(rgb.len(), 4 * 4 * 3);
        // top-left output pixel comes from the last grid row
        assert_eq!(&rgb[0..3], &[0, 0, 255]);
        assert_eq!(&rgb[3..6], &[0, 0, 255]);
        assert_eq!(&rgb[6..9], &[255, 255, 0]);
        // third output row is the first grid row
        let row = 2 * 4 * 3;
        assert_eq!(&rgb[row + 9..row + 12], &[255, 255, 255]);
    }

    #[test]
    fn writes_png() -> Result<()> {
        let grid = Array2::from_shape_fn((24, 32), |(y, x)| (x + y) as f32);
        let mut out = vec![];
        Heatmap::default().write_png(&grid, &mut out)?;
        assert_eq!(&out[..8], b"\x89PNG\r\n\x1a\n");

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame.png");
        Heatmap {
            scale: 4,
            ..Default::default()
        }
        .write_png_path(&grid, &path)?;
        assert!(std::fs::metadata(&path)?.len() > 8);

        let bad = Heatmap {
            vmin: 10.,
            vmax: 10.,
            ..Default::default()
        };
        assert!(bad.write_png(&grid, vec![]).is_err());
        Ok(())
    }

    #[test]
    fn png_ends_with_iend_chunk() -> Result<()> {
        let grid = Array2::from_shape_fn((24, 32), |(y, x)| (x * y) as f32);
        let mut out = vec![];
        Heatmap::default().write_png(&grid, &mut out)?;
        assert_eq!(&out[out.len() - 8..out.len() - 4], b"IEND");
        Ok(())
    }

    /// Accepts writes but fails to flush.
    struct FailingFlush(Vec<u8>);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn write_failures_are_reported() {
        let grid = Array2::from_shape_fn((24, 32), |(y, x)| (x + y) as f32);
        let h = Heatmap::default();

        let mut sink = FailingFlush(vec![]);
        assert!(h.write_png(&grid, &mut sink).is_err());
        assert_eq!(&sink.0[..8], b"\x89PNG\r\n\x1a\n");

        if Path::new("/dev/full").exists() {
            assert!(h.write_png_path(&grid, "/dev/full").is_err());
        }
    }
}
