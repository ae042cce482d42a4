//! Helpers to parse packed values from byte readers.
//!
//! Frames in a capture are headerless runs of fixed-width
//! scalars, so parsing is little more than reading the
//! right number of values with the right byte order.
use std::io::Error as IOError;

use byteordered::{byteorder::ReadBytesExt, ByteOrdered, Endian};
use ndarray::Array2;

use crate::error::{Error, Result};

pub(crate) trait Parseable: Sized {
    type Error;
    fn parse<T: ReadBytesExt, E: Endian>(r: &mut ByteOrdered<T, E>) -> Result<Self, Self::Error>;
}

macro_rules! impl_parseable {
    ($ty:ty, $method:ident) => {
        impl Parseable for $ty {
            type Error = IOError;
            fn parse<T: ReadBytesExt, E: Endian>(
                r: &mut ByteOrdered<T, E>,
            ) -> Result<Self, IOError> {
                r.$method()
            }
        }
    };
}

impl_parseable!(f32, read_f32);

/// Parse `height * width` values in row-major order into a
/// grid of shape `(height, width)`.
pub(crate) fn parse_grid<P, T, E>(
    r: &mut ByteOrdered<T, E>,
    (height, width): (usize, usize),
) -> Result<Array2<P>>
where
    P: Parseable,
    Error: From<<P as Parseable>::Error>,
    T: ReadBytesExt,
    E: Endian,
{
    let mut values = Vec::with_capacity(height * width);
    for _ in 0..height * width {
        values.push(P::parse(r)?);
    }
    Array2::from_shape_vec((height, width), values)
        .map_err(|e| Error::config(format!("grid shape {}x{}: {}", width, height, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_little_endian_grid() -> Result<()> {
        let bytes: Vec<u8> = [1.5f32, -2., 3., 4.25, 5., 6.]
            .iter()
            .flat_map(|v| v.to_le_bytes().to_vec())
            .collect();
        let mut rdr = ByteOrdered::le(&bytes[..]);
        let grid: Array2<f32> = parse_grid(&mut rdr, (2, 3))?;

        assert_eq!(grid.dim(), (2, 3));
        assert_eq!(grid[(0, 0)], 1.5);
        assert_eq!(grid[(0, 1)], -2.);
        assert_eq!(grid[(1, 0)], 4.25);
        assert_eq!(grid[(1, 2)], 6.);
        Ok(())
    }

    #[test]
    fn short_input_is_io_error() {
        let bytes = 1.0f32.to_le_bytes();
        let mut rdr = ByteOrdered::le(&bytes[..]);
        let res: Result<Array2<f32>> = parse_grid(&mut rdr, (1, 2));
        assert!(matches!(res, Err(Error::Io(_))));
    }

    #[test]
    fn byte_order_is_respected() -> Result<()> {
        let bytes = 2.5f32.to_be_bytes();
        let mut rdr = ByteOrdered::be(&bytes[..]);
        assert_eq!(f32::parse(&mut rdr)?, 2.5);

        let mut rdr = ByteOrdered::le(&bytes[..]);
        assert_ne!(f32::parse(&mut rdr)?, 2.5);
        Ok(())
    }
}
