//! Sensor geometry and placement of the reference pixels.
//!
//! Three reference pixels are tracked in every frame: the
//! geometric center of the grid and two side points that sit
//! `target_lateral_offset_mm` away from it on the target
//! surface. The pixel offset comes from projecting the
//! physical offset through the sensor optics at the given
//! standoff distance.
use std::{fmt, mem};

use serde_derive::*;

use crate::error::{Error, Result};

/// Width and height of a frame grid in pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
}

impl GridSize {
    pub fn new(width: usize, height: usize) -> Self {
        GridSize { width, height }
    }

    /// Saturates for grids too large to address; see
    /// [`frame_bytes`](Self::frame_bytes) for the checked form.
    pub fn pixel_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Bytes taken by one frame of `f32` values in a capture.
    ///
    /// Fails with a configuration error for an empty grid or
    /// one whose frame size does not fit in `usize`.
    pub fn frame_bytes(&self) -> Result<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::config(format!(
                "grid must be non-empty, got {}",
                self
            )));
        }
        self.width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(mem::size_of::<f32>()))
            .ok_or_else(|| Error::config(format!("grid {} is too large", self)))
    }

    /// Shape as used by `ndarray`: rows first.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.x < self.width && c.y < self.height
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A grid coordinate; `x` is the column, `y` the row.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Self {
        Coord { x, y }
    }

    /// Index into an `ndarray` grid.
    pub fn index(&self) -> (usize, usize) {
        (self.y, self.x)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Physical constants of the sensor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SensorGeometry {
    pub grid_width: usize,
    pub grid_height: usize,
    pub pixel_pitch_x_mm: f64,
    pub pixel_pitch_y_mm: f64,
    pub focal_length_mm: f64,
}

impl SensorGeometry {
    /// The 32x24 far-infrared array the captures come from.
    pub fn mlx90640() -> Self {
        SensorGeometry {
            grid_width: 32,
            grid_height: 24,
            pixel_pitch_x_mm: 0.1,
            pixel_pitch_y_mm: 0.1,
            focal_length_mm: 2.1,
        }
    }

    pub fn grid_size(&self) -> GridSize {
        GridSize::new(self.grid_width, self.grid_height)
    }

    pub fn validate(&self) -> Result<()> {
        self.grid_size().frame_bytes()?;
        for (name, val) in [
            ("pixel_pitch_x_mm", self.pixel_pitch_x_mm),
            ("pixel_pitch_y_mm", self.pixel_pitch_y_mm),
            ("focal_length_mm", self.focal_length_mm),
        ]
        .iter()
        {
            ensure_positive(name, *val)?;
        }
        Ok(())
    }
}

impl Default for SensorGeometry {
    fn default() -> Self {
        Self::mlx90640()
    }
}

/// Physical size on the target surface covered by one pixel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GroundSample {
    pub x_mm: f64,
    pub y_mm: f64,
}

/// Model used to project pixels onto the target surface.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    /// `pitch * distance / focal_length`.
    Ratio,
    /// Full field of view angles of the lens. Each axis
    /// spans `2 * distance * tan(fov / 2)` over the pixels
    /// of that axis.
    FieldOfView {
        horizontal_deg: f64,
        vertical_deg: f64,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Ratio
    }
}

impl Projection {
    pub fn ground_sample(
        &self,
        geometry: &SensorGeometry,
        distance_to_target_mm: f64,
    ) -> Result<GroundSample> {
        geometry.validate()?;
        ensure_positive("distance_to_target_mm", distance_to_target_mm)?;

        let gsd = match *self {
            Projection::Ratio => {
                let scale = distance_to_target_mm / geometry.focal_length_mm;
                GroundSample {
                    x_mm: geometry.pixel_pitch_x_mm * scale,
                    y_mm: geometry.pixel_pitch_y_mm * scale,
                }
            }
            Projection::FieldOfView {
                horizontal_deg,
                vertical_deg,
            } => {
                let span = |fov_deg: f64, pixels: usize| -> Result<f64> {
                    if !(fov_deg > 0. && fov_deg < 180.) {
                        return Err(Error::config(format!(
                            "field of view must lie in (0, 180) degrees, got {}",
                            fov_deg
                        )));
                    }
                    let half = (fov_deg / 2.).to_radians();
                    Ok(2. * distance_to_target_mm * half.tan() / pixels as f64)
                };
                GroundSample {
                    x_mm: span(horizontal_deg, geometry.grid_width)?,
                    y_mm: span(vertical_deg, geometry.grid_height)?,
                }
            }
        };
        Ok(gsd)
    }
}

/// Reference pixels tracked in every frame of an experiment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencePoints {
    pub center: Coord,
    pub left: Coord,
    pub right: Coord,
    pub offset_pixel_count: usize,
}

impl ReferencePoints {
    /// Place the reference points for a target at the given
    /// distance. Fails when either side point falls outside
    /// the grid.
    pub fn compute(
        geometry: &SensorGeometry,
        projection: &Projection,
        distance_to_target_mm: f64,
        target_lateral_offset_mm: f64,
    ) -> Result<Self> {
        ensure_positive("target_lateral_offset_mm", target_lateral_offset_mm)?;
        let gsd = projection.ground_sample(geometry, distance_to_target_mm)?;

        let offset = (target_lateral_offset_mm / gsd.x_mm).floor();
        if !offset.is_finite() || offset > geometry.grid_width as f64 {
            return Err(out_of_view(geometry, distance_to_target_mm, offset));
        }
        let offset_pixel_count = offset as usize;

        let center = Coord::new(geometry.grid_width / 2, geometry.grid_height / 2);
        if offset_pixel_count > center.x || center.x + offset_pixel_count >= geometry.grid_width {
            return Err(out_of_view(geometry, distance_to_target_mm, offset));
        }

        Ok(ReferencePoints {
            center,
            left: Coord::new(center.x - offset_pixel_count, center.y),
            right: Coord::new(center.x + offset_pixel_count, center.y),
            offset_pixel_count,
        })
    }
}

fn out_of_view(geometry: &SensorGeometry, distance_mm: f64, offset: f64) -> Error {
    Error::config(format!(
        "reference offset of {} pixels does not fit a {} grid at {} mm",
        offset,
        geometry.grid_size(),
        distance_mm
    ))
}

fn ensure_positive(name: &str, val: f64) -> Result<()> {
    if val.is_finite() && val > 0. {
        Ok(())
    } else {
        Err(Error::config(format!(
            "`{}` must be positive and finite, got {}",
            name, val
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ratio_projection_places_reference_points() -> Result<()> {
        let geometry = SensorGeometry::mlx90640();
        let gsd = Projection::Ratio.ground_sample(&geometry, 150.)?;
        assert_relative_eq!(gsd.x_mm, 7.142857, epsilon = 1e-5);
        assert_relative_eq!(gsd.y_mm, gsd.x_mm);

        let refs = ReferencePoints::compute(&geometry, &Projection::Ratio, 150., 20.)?;
        assert_eq!(refs.offset_pixel_count, 2);
        assert_eq!(refs.center, Coord::new(16, 12));
        assert_eq!(refs.left, Coord::new(14, 12));
        assert_eq!(refs.right, Coord::new(18, 12));
        Ok(())
    }

    #[test]
    fn side_points_are_symmetric_and_in_bounds() -> Result<()> {
        let geometry = SensorGeometry::mlx90640();
        for &distance in &[50., 100., 150., 400., 1000.] {
            for &offset in &[1., 5., 10., 20.] {
                let refs = match ReferencePoints::compute(
                    &geometry,
                    &Projection::Ratio,
                    distance,
                    offset,
                ) {
                    Ok(refs) => refs,
                    Err(Error::Configuration(_)) => continue,
                    Err(e) => return Err(e),
                };
                assert_eq!(refs.center.x - refs.left.x, refs.right.x - refs.center.x);
                assert_eq!(refs.left.y, refs.center.y);
                assert_eq!(refs.right.y, refs.center.y);
                let size = geometry.grid_size();
                assert!(size.contains(refs.left) && size.contains(refs.right));
            }
        }
        Ok(())
    }

    #[test]
    fn offset_outside_view_is_rejected() {
        // gsd at 10 mm is ~0.48 mm, so 20 mm is ~42 pixels
        let res = ReferencePoints::compute(
            &SensorGeometry::mlx90640(),
            &Projection::Ratio,
            10.,
            20.,
        );
        assert!(matches!(res, Err(Error::Configuration(_))));
    }

    #[test]
    fn right_edge_is_exclusive() {
        let geometry = SensorGeometry {
            grid_width: 4,
            grid_height: 1,
            pixel_pitch_x_mm: 1.,
            pixel_pitch_y_mm: 1.,
            focal_length_mm: 1.,
        };
        // center 2, offset 2: left 0 fits but right 4 does not
        let res = ReferencePoints::compute(&geometry, &Projection::Ratio, 1., 2.);
        assert!(matches!(res, Err(Error::Configuration(_))));

        let refs = ReferencePoints::compute(&geometry, &Projection::Ratio, 1., 1.5).unwrap();
        assert_eq!(refs.left, Coord::new(1, 0));
        assert_eq!(refs.right, Coord::new(3, 0));
    }

    #[test]
    fn zero_offset_collapses_to_center() -> Result<()> {
        let refs = ReferencePoints::compute(
            &SensorGeometry::mlx90640(),
            &Projection::Ratio,
            150.,
            1.,
        )?;
        assert_eq!(refs.offset_pixel_count, 0);
        assert_eq!(refs.left, refs.center);
        assert_eq!(refs.right, refs.center);
        Ok(())
    }

    #[test]
    fn invalid_parameters_are_configuration_errors() {
        let mut geometry = SensorGeometry::mlx90640();
        geometry.focal_length_mm = 0.;
        assert!(matches!(
            geometry.validate(),
            Err(Error::Configuration(_))
        ));

        let geometry = SensorGeometry::mlx90640();
        for &(distance, offset) in &[(0., 20.), (-1., 20.), (150., 0.), (f64::NAN, 20.)] {
            let res = ReferencePoints::compute(&geometry, &Projection::Ratio, distance, offset);
            assert!(matches!(res, Err(Error::Configuration(_))));
        }
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let huge = GridSize::new(usize::MAX / 2 + 1, 3);
        assert_eq!(huge.pixel_count(), usize::MAX);
        assert!(matches!(huge.frame_bytes(), Err(Error::Configuration(_))));
        assert!(matches!(
            GridSize::new(usize::MAX / 4 + 1, 1).frame_bytes(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            GridSize::new(0, 24).frame_bytes(),
            Err(Error::Configuration(_))
        ));
        assert_eq!(GridSize::new(32, 24).frame_bytes().unwrap(), 32 * 24 * 4);

        let geometry = SensorGeometry {
            grid_width: usize::MAX / 2 + 1,
            grid_height: 3,
            ..SensorGeometry::mlx90640()
        };
        assert!(matches!(
            geometry.validate(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn field_of_view_projection() -> Result<()> {
        let geometry = SensorGeometry::mlx90640();
        let projection = Projection::FieldOfView {
            horizontal_deg: 110.,
            vertical_deg: 75.,
        };
        let gsd = projection.ground_sample(&geometry, 100.)?;
        assert_relative_eq!(
            gsd.x_mm,
            2. * 100. * 55f64.to_radians().tan() / 32.,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            gsd.y_mm,
            2. * 100. * 37.5f64.to_radians().tan() / 24.,
            epsilon = 1e-9
        );

        let bad = Projection::FieldOfView {
            horizontal_deg: 180.,
            vertical_deg: 75.,
        };
        assert!(bad.ground_sample(&geometry, 100.).is_err());
        Ok(())
    }

    #[test]
    fn projection_from_json() -> anyhow::Result<()> {
        let p: Projection = serde_json::from_str(r#"{"kind": "ratio"}"#)?;
        assert_eq!(p, Projection::Ratio);
        let p: Projection = serde_json::from_str(
            r#"{"kind": "field_of_view", "horizontal_deg": 55, "vertical_deg": 35}"#,
        )?;
        assert_eq!(
            p,
            Projection::FieldOfView {
                horizontal_deg: 55.,
                vertical_deg: 35.
            }
        );
        Ok(())
    }
}
