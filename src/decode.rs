//! Decode a raw capture into frames.
//!
//! A capture is a flat sequence of little-endian `f32`
//! temperatures without header, footer or delimiters. Each
//! frame is `width * height` values in row-major order.
//! Timestamps are not stored; they follow from the frame
//! index and the (externally known) frame rate.
//!
//! Captures do not necessarily end on a frame boundary.
//! A trailing partial frame is dropped and decoding ends
//! without an error.
use std::io::{ErrorKind, Read};

use byteordered::ByteOrdered;
use log::{debug, warn};
use ndarray::Array2;

use crate::{
    error::{Error, Result},
    geometry::GridSize,
    parse::parse_grid,
};

const MICROS_PER_SECOND: u64 = 1_000_000;

/// One decoded grid of temperatures (degrees Celsius).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub timestamp_us: u64,
    pub grid: Array2<f32>,
}

impl Frame {
    pub fn size(&self) -> GridSize {
        let (height, width) = self.grid.dim();
        GridSize::new(width, height)
    }
}

/// Timestamp of the frame at `index` for the given rate.
pub fn timestamp_us(index: usize, frames_per_second: u32) -> u64 {
    index as u64 * (MICROS_PER_SECOND / frames_per_second as u64)
}

/// Lazy, single-pass iterator over the frames of a byte
/// source.
///
/// Yields `Err(Error::Io)` at most once, after which it is
/// exhausted. Frames yielded before the error stay valid.
pub struct FrameDecoder<R> {
    reader: R,
    size: GridSize,
    frames_per_second: u32,
    buf: Vec<u8>,
    frames_read: usize,
    done: bool,
}

impl<R: Read> FrameDecoder<R> {
    pub fn new(reader: R, size: GridSize, frames_per_second: u32) -> Result<Self> {
        let frame_bytes = size.frame_bytes()?;
        if frames_per_second == 0 {
            return Err(Error::config("frames_per_second must be positive"));
        }
        if MICROS_PER_SECOND % frames_per_second as u64 != 0 {
            warn!(
                "{} fps does not divide one second; timestamps are truncated to {} us steps",
                frames_per_second,
                MICROS_PER_SECOND / frames_per_second as u64
            );
        }

        Ok(FrameDecoder {
            reader,
            size,
            frames_per_second,
            buf: vec![0; frame_bytes],
            frames_read: 0,
            done: false,
        })
    }

    /// Bytes occupied by one frame in the stream.
    pub fn frame_bytes(&self) -> usize {
        self.buf.len()
    }

    /// Number of complete frames decoded so far.
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Fill the frame buffer, returning how many bytes were
    /// read before end of stream.
    fn fill(&mut self) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let filled = self.fill()?;
        if filled < self.buf.len() {
            debug!(
                "end of stream after {} frames ({} trailing bytes dropped)",
                self.frames_read, filled
            );
            return Ok(None);
        }

        let mut rdr = ByteOrdered::le(&self.buf[..]);
        let grid = parse_grid(&mut rdr, self.size.shape())?;

        let index = self.frames_read;
        self.frames_read += 1;
        Ok(Some(Frame {
            index,
            timestamp_us: timestamp_us(index, self.frames_per_second),
            grid,
        }))
    }
}

impl<R: Read> Iterator for FrameDecoder<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for FrameDecoder<R> {}
