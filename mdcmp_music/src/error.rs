// Error type shared by the grid, the MDC encoder and the converter.
//
// Every variant is fatal at the point of detection: grid mutations validate
// before touching state, the encoder aborts without returning partial text,
// and the converter validates a whole document before its first sink call.
// Decoder variants carry the 1-based line number of the offending MDC line.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MdcError {
    /// A bars/tracks/beats selector list was empty.
    #[error("missing required selector: {0} must not be empty")]
    MissingSelector(&'static str),

    #[error("invalid bar index: {0}")]
    InvalidBar(usize),

    #[error("invalid track index {track} in bar {bar}")]
    InvalidTrack { bar: usize, track: usize },

    #[error("beat index {beat} out of range for {beats_per_bar} beats per bar")]
    BeatOutOfRange { beat: usize, beats_per_bar: usize },

    /// `transform` selected a slot that holds no events.
    #[error("no events at bar {bar}, track {track}, beat {beat}")]
    EmptySlot {
        bar: usize,
        track: usize,
        beat: usize,
    },

    #[error("duration {duration} has no symbol at granularity '{granularity}'")]
    UnmappedDuration { duration: u8, granularity: char },

    #[error("unknown mdc format version: {0}")]
    UnknownVersion(u32),

    #[error("invalid mdc header '{0}': expected a format version number")]
    MalformedHeader(String),

    #[error("malformed line {line}: {message}")]
    MalformedLine { line: usize, message: String },

    #[error("malformed pattern item on line {line}: {message}")]
    MalformedItem { line: usize, message: String },

    #[error("line {line}: {field} has {found} values but there are {expected} pitches")]
    CardinalityMismatch {
        line: usize,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("pitch {0} is outside the MIDI range 0..=127")]
    PitchOutOfRange(i64),

    /// A velocity or automation value outside its MIDI range.
    #[error("{field} value {value} is out of range")]
    ValueOutOfRange { field: &'static str, value: i64 },

    #[error("unknown {kind} token '{token}'")]
    UnknownToken { kind: &'static str, token: String },

    #[error("no mdc file banked under key '{0}'")]
    UnknownBankKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl MdcError {
    pub(crate) fn unknown(kind: &'static str, token: impl Into<String>) -> Self {
        MdcError::UnknownToken {
            kind,
            token: token.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MdcError>;
