//! Error types for each layer of the visualizer.
//!
//! Every failure a caller can hit is a distinct variant: a source that can't
//! be fetched, bytes that aren't a usable MIDI file, a sequence with nothing
//! to draw, and playback that can't start.

use thiserror::Error;

/// Failure to obtain MIDI bytes for a source
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported source scheme '{0}' (expected a file path or file:// URL)")]
    UnsupportedScheme(String),
}

/// Failure to turn MIDI bytes into a note sequence
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed MIDI data: {0}")]
    Midi(#[from] midly::Error),

    #[error("unsupported MIDI timing: {0}")]
    UnsupportedTiming(String),
}

/// Failure to set up the piano roll for a sequence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("sequence has no notes to draw")]
    EmptySequence,
}

/// Failure in the playback driver
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no default output device available")]
    NoDevice,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("samples are not loaded for this sequence")]
    NotReady,

    #[error("sequence has no notes to play")]
    EmptySequence,
}

/// Top-level error for the visualizer session
#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("unknown attribute '{0}' (expected 'url' or 'tempo')")]
    UnknownAttribute(String),

    #[error("invalid tempo '{0}': expected a positive number of quarter notes per minute")]
    InvalidTempo(String),

    #[error("no sequence loaded")]
    NothingLoaded,
}
