//! Per-frame statistics.
//!
//! Each frame is reduced to the temperatures at the
//! experiment's reference points and its global extrema.
//! Statistics depend only on the frame and the reference
//! points, so frames can be analyzed independently.
use std::ops::AddAssign;

use log::debug;
use ndarray::Array2;
use rayon::prelude::*;
use serde_derive::*;

use crate::{
    decode::Frame,
    error::{Error, Result},
    geometry::{Coord, GridSize, ReferencePoints},
};

/// Summary of a single frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameStatistics {
    pub index: usize,
    pub timestamp_us: u64,

    pub ref_temp_center: f32,
    pub ref_temp_left: f32,
    pub ref_temp_right: f32,
    pub abs_diff_left_right: f32,

    pub min_temp: f32,
    pub min_coord: Coord,
    pub max_temp: f32,
    pub max_coord: Coord,
    pub mean_temp: f32,
}

impl FrameStatistics {
    pub fn timestamp_s(&self) -> f64 {
        self.timestamp_us as f64 / 1e6
    }
}

/// Running extrema over values visited in scan order.
///
/// The first occurrence wins ties: a later value only
/// replaces the current extremum if strictly smaller (or
/// larger). Non-finite values are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extrema {
    count: usize,
    sum: f64,
    min: Option<(f32, Coord)>,
    max: Option<(f32, Coord)>,
}

impl Extrema {
    pub fn of_grid(grid: &Array2<f32>) -> Self {
        let mut acc = Extrema::default();
        for ((y, x), &val) in grid.indexed_iter() {
            acc += (val, Coord::new(x, y));
        }
        acc
    }

    /// Number of finite values seen.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn min(&self) -> Option<(f32, Coord)> {
        self.min
    }

    pub fn max(&self) -> Option<(f32, Coord)> {
        self.max
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl AddAssign<(f32, Coord)> for Extrema {
    fn add_assign(&mut self, (val, coord): (f32, Coord)) {
        if !val.is_finite() {
            return;
        }
        self.count += 1;
        self.sum += val as f64;
        match self.min {
            Some((min, _)) if val >= min => {}
            _ => self.min = Some((val, coord)),
        }
        match self.max {
            Some((max, _)) if val <= max => {}
            _ => self.max = Some((val, coord)),
        }
    }
}

fn lookup(grid: &Array2<f32>, c: Coord) -> Result<f32> {
    grid.get(c.index()).copied().ok_or_else(|| {
        let (height, width) = grid.dim();
        Error::IndexOutOfRange {
            x: c.x,
            y: c.y,
            width,
            height,
        }
    })
}

/// Reduce a frame to its statistics.
///
/// The reference points are expected to fit the frame; if
/// they do not, this fails with `IndexOutOfRange` rather
/// than reading elsewhere.
pub fn analyze(frame: &Frame, refs: &ReferencePoints) -> Result<FrameStatistics> {
    let ref_temp_center = lookup(&frame.grid, refs.center)?;
    let ref_temp_left = lookup(&frame.grid, refs.left)?;
    let ref_temp_right = lookup(&frame.grid, refs.right)?;

    let extrema = Extrema::of_grid(&frame.grid);
    let skipped = frame.grid.len() - extrema.count();
    if skipped > 0 {
        debug!("frame {}: skipped {} non-finite values", frame.index, skipped);
    }
    let (min_temp, min_coord, max_temp, max_coord, mean) =
        match (extrema.min(), extrema.max(), extrema.mean()) {
            (Some((min, min_c)), Some((max, max_c)), Some(mean)) => (min, min_c, max, max_c, mean),
            _ => return Err(Error::NonFiniteFrame { index: frame.index }),
        };

    Ok(FrameStatistics {
        index: frame.index,
        timestamp_us: frame.timestamp_us,
        ref_temp_center,
        ref_temp_left,
        ref_temp_right,
        abs_diff_left_right: (ref_temp_left - ref_temp_right).abs(),
        min_temp,
        min_coord,
        max_temp,
        max_coord,
        mean_temp: mean as f32,
    })
}

/// Analyze a batch of frames in parallel. Results are in
/// the order of `frames`. If several frames fail, which of
/// the errors is returned is unspecified.
pub fn analyze_batch_par(frames: &[Frame], refs: &ReferencePoints) -> Result<Vec<FrameStatistics>> {
    frames.par_iter().map(|f| analyze(f, refs)).collect()
}

/// Check that `refs` can be used with frames of `size`.
pub fn check_references(refs: &ReferencePoints, size: GridSize) -> Result<()> {
    for &c in [refs.center, refs.left, refs.right].iter() {
        if !size.contains(c) {
            return Err(Error::IndexOutOfRange {
                x: c.x,
                y: c.y,
                width: size.width,
                height: size.height,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::iproduct;
    use ndarray::arr2;

    fn frame(grid: Array2<f32>) -> Frame {
        Frame {
            index: 3,
            timestamp_us: 750_000,
            grid,
        }
    }

    fn refs(center: (usize, usize), offset: usize) -> ReferencePoints {
        let center = Coord::new(center.0, center.1);
        ReferencePoints {
            center,
            left: Coord::new(center.x - offset, center.y),
            right: Coord::new(center.x + offset, center.y),
            offset_pixel_count: offset,
        }
    }

    #[test]
    fn extrema_of_small_grid() -> Result<()> {
        let f = frame(arr2(&[[1., 2., 3., 4.], [5., 6., 7., 8.]]));
        let stats = analyze(&f, &refs((2, 1), 1))?;

        assert_eq!(stats.index, 3);
        assert_eq!(stats.timestamp_us, 750_000);
        assert_eq!(stats.min_temp, 1.);
        assert_eq!(stats.min_coord, Coord::new(0, 0));
        assert_eq!(stats.max_temp, 8.);
        assert_eq!(stats.max_coord, Coord::new(3, 1));
        assert_eq!(stats.mean_temp, 4.5);

        assert_eq!(stats.ref_temp_center, 7.);
        assert_eq!(stats.ref_temp_left, 6.);
        assert_eq!(stats.ref_temp_right, 8.);
        assert_eq!(stats.abs_diff_left_right, 2.);
        Ok(())
    }

    #[test]
    fn ties_resolve_to_first_in_scan_order() -> Result<()> {
        let f = frame(arr2(&[[5., 0., 9.], [0., 9., 0.]]));
        let stats = analyze(&f, &refs((1, 1), 1))?;
        assert_eq!(stats.min_coord, Coord::new(1, 0));
        assert_eq!(stats.max_coord, Coord::new(2, 0));
        Ok(())
    }

    #[test]
    fn extrema_bound_every_value() -> Result<()> {
        let (height, width) = (24, 32);
        let grid = Array2::from_shape_fn((height, width), |(y, x)| {
            ((x * 7 + y * 13) % 17) as f32 * 1.5 - ((x * y) % 5) as f32 + 20.
        });
        let f = frame(grid.clone());
        let stats = analyze(&f, &refs((16, 12), 2))?;

        for (y, x) in iproduct!(0..height, 0..width) {
            assert!(stats.min_temp <= grid[(y, x)]);
            assert!(grid[(y, x)] <= stats.max_temp);
        }
        assert_eq!(grid[stats.min_coord.index()], stats.min_temp);
        assert_eq!(grid[stats.max_coord.index()], stats.max_temp);
        Ok(())
    }

    #[test]
    fn non_finite_values_are_skipped() -> Result<()> {
        let f = frame(arr2(&[[f32::NAN, 2.], [f32::INFINITY, -1.]]));
        let stats = analyze(&f, &refs((1, 1), 0))?;
        assert_eq!(stats.min_temp, -1.);
        assert_eq!(stats.min_coord, Coord::new(1, 1));
        assert_eq!(stats.max_temp, 2.);
        assert_eq!(stats.max_coord, Coord::new(1, 0));
        assert_eq!(stats.mean_temp, 0.5);

        let extrema = Extrema::of_grid(&f.grid);
        assert_eq!(extrema.count(), 2);

        let f = frame(arr2(&[[f32::NAN, f32::NAN]]));
        assert_eq!(Extrema::of_grid(&f.grid).count(), 0);
        assert!(matches!(
            analyze(&f, &refs((1, 0), 0)),
            Err(Error::NonFiniteFrame { index: 3 })
        ));
        Ok(())
    }

    #[test]
    fn unvalidated_references_fail_fast() {
        let f = frame(arr2(&[[1., 2., 3., 4.], [5., 6., 7., 8.]]));
        let res = analyze(&f, &refs((3, 1), 1));
        assert!(matches!(
            res,
            Err(Error::IndexOutOfRange {
                x: 4,
                y: 1,
                width: 4,
                height: 2
            })
        ));
        assert!(check_references(&refs((3, 1), 1), GridSize::new(4, 2)).is_err());
        assert!(check_references(&refs((2, 1), 1), GridSize::new(4, 2)).is_ok());
    }

    #[test]
    fn parallel_batch_preserves_order() -> Result<()> {
        let frames: Vec<Frame> = (0..64)
            .map(|i| Frame {
                index: i,
                timestamp_us: i as u64 * 62_500,
                grid: Array2::from_shape_fn((2, 3), |(y, x)| (i * 10 + y * 3 + x) as f32),
            })
            .collect();
        let r = refs((1, 1), 1);
        let par = analyze_batch_par(&frames, &r)?;
        let seq: Vec<_> = frames.iter().map(|f| analyze(f, &r)).collect::<Result<_>>()?;
        assert_eq!(par, seq);
        assert!(par.windows(2).all(|w| w[0].index + 1 == w[1].index));
        Ok(())
    }
}
