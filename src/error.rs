//! Errors raised while decoding and analyzing a frame stream.
//!
//! End of stream is not an error: the decoder simply stops
//! producing frames when the remaining bytes cannot fill
//! one more frame.
use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The byte source failed during a read that was
    /// expected to succeed.
    #[error("reading frame stream: {0}")]
    Io(#[from] io::Error),

    /// A capture file could not be opened.
    #[error("opening {}: {}", .path.display(), .source)]
    Open { path: PathBuf, source: io::Error },

    /// The experiment parameters are unusable, e.g. the
    /// reference points do not fit the sensor's field of view.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Aggregation was requested over zero frames.
    #[error("no frames to aggregate")]
    EmptySeries,

    /// A coordinate outside the grid was looked up. Only
    /// reachable by bypassing reference point validation.
    #[error("coordinate ({x}, {y}) out of range for {width}x{height} grid")]
    IndexOutOfRange {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    /// Every value in the frame was NaN or infinite.
    #[error("frame {index} has no finite temperature values")]
    NonFiniteFrame { index: usize },
}

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }
}
