// Granularities and duration symbols.
//
// A granularity is the note length of one grid beat. It fixes how many beats
// a 4/4 bar has and which symbol an N-beat note is written with in MDC text.
// Symbol lengths are expressed in quarter notes (q = 1.0), which is also the
// unit of converter time.

use crate::error::{MdcError, Result};
use std::fmt;

/// The MDC marker for "no value": an unset automation field, or a zero-length
/// duration/padding symbol.
pub const NO_OP: &str = "n";

/// Padding symbol meaning "no timing offset".
pub const NO_PADDING: &str = "0";

/// Symbol → length in quarter notes. Longest first.
const SYMBOL_LENGTHS: [(&str, f64); 17] = [
    ("W", 8.0),
    ("w.", 6.0),
    ("w", 4.0),
    ("h.", 3.0),
    ("h", 2.0),
    ("q.", 1.5),
    ("q", 1.0),
    ("e.", 0.75),
    ("e", 0.5),
    ("s.", 0.375),
    ("s", 0.25),
    ("t.", 0.1875),
    ("t", 0.125),
    ("S", 0.0625),
    ("H", 0.031_25),
    ("0", 0.0),
    ("n", 0.0),
];

// Grid-beat count → compound symbol, indexed by `beats - 1`.
const HALF_SYMBOLS: [&str; 4] = ["h", "w", "w.", "W"];
const QUARTER_SYMBOLS: [&str; 6] = ["q", "h", "h.", "w", "w.", "W"];
const EIGHTH_SYMBOLS: [&str; 8] = ["e", "q", "q.", "h", "h.", "w", "w.", "W"];
const SIXTEENTH_SYMBOLS: [&str; 10] = ["s", "e", "e.", "q", "q.", "h", "h.", "w", "w.", "W"];
const THIRTYSECOND_SYMBOLS: [&str; 12] = [
    "t", "s", "s.", "e", "e.", "q", "q.", "h", "h.", "w", "w.", "W",
];

/// The length of one grid beat. Only 4/4 bars are supported, so this also
/// fixes the number of beats per bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Half,
        Granularity::Quarter,
        Granularity::Eighth,
        Granularity::Sixteenth,
        Granularity::ThirtySecond,
    ];

    /// Single-letter code used in MDC line headers.
    pub fn code(self) -> char {
        match self {
            Granularity::Half => 'h',
            Granularity::Quarter => 'q',
            Granularity::Eighth => 'e',
            Granularity::Sixteenth => 's',
            Granularity::ThirtySecond => 't',
        }
    }

    pub fn parse(code: &str) -> Result<Self> {
        Granularity::ALL
            .into_iter()
            .find(|g| code.len() == 1 && code.starts_with(g.code()))
            .ok_or_else(|| MdcError::unknown("granularity", code))
    }

    /// Beats in one 4/4 bar: the granularity ratio to a quarter note, × 4.
    pub fn beats_per_bar(self) -> usize {
        match self {
            Granularity::Half => 2,
            Granularity::Quarter => 4,
            Granularity::Eighth => 8,
            Granularity::Sixteenth => 16,
            Granularity::ThirtySecond => 32,
        }
    }

    /// Length of one beat in quarter notes. This is the converter's
    /// isochronous advance per pattern item.
    pub fn beat_length(self) -> f64 {
        4.0 / self.beats_per_bar() as f64
    }

    /// Symbol for a one-beat note, used for rest columns.
    pub fn base_symbol(self) -> &'static str {
        self.symbols()[0]
    }

    /// Compound symbol for a note lasting `beats` grid beats.
    ///
    /// Durations beyond the table (or zero) have no symbol and are a hard
    /// encode error.
    pub fn duration_symbol(self, beats: u8) -> Result<&'static str> {
        usize::from(beats)
            .checked_sub(1)
            .and_then(|idx| self.symbols().get(idx).copied())
            .ok_or(MdcError::UnmappedDuration {
                duration: beats,
                granularity: self.code(),
            })
    }

    fn symbols(self) -> &'static [&'static str] {
        match self {
            Granularity::Half => &HALF_SYMBOLS,
            Granularity::Quarter => &QUARTER_SYMBOLS,
            Granularity::Eighth => &EIGHTH_SYMBOLS,
            Granularity::Sixteenth => &SIXTEENTH_SYMBOLS,
            Granularity::ThirtySecond => &THIRTYSECOND_SYMBOLS,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Length in quarter notes of a duration or padding symbol.
pub fn symbol_length(symbol: &str) -> Result<f64> {
    SYMBOL_LENGTHS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|&(_, len)| len)
        .ok_or_else(|| MdcError::unknown("duration", symbol))
}
