// Chord shorthand resolution.
//
// The encoder only needs one thing from music theory: "which note letters
// does this value stand for?". `ChordTheory` is that seam. `ShorthandChords`
// is the built-in resolver: a root letter with optional accidentals followed
// by a quality suffix (`Cmaj7`, `F#m7b5`, `Bbsus4`). A bare root such as `Eb`
// is a single note, not a triad; write `EbM` or `Ebmaj` for the major triad.
//
// Note names come back spelled from `pitch::NOTE_NAMES`, so `Db` resolves
// to `C#`. Octave placement is left to the caller.

use crate::error::{MdcError, Result};
use crate::pitch::{NOTE_NAMES, pitch_class};

/// Maps a note or chord value to its ordered note letter-names.
pub trait ChordTheory {
    /// Returns the chord tones root first. A bare note returns one element.
    fn note_names(&self, value: &str) -> Result<Vec<String>>;
}

/// Built-in shorthand resolver covering common pop/jazz chord qualities.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShorthandChords;

impl ChordTheory for ShorthandChords {
    fn note_names(&self, value: &str) -> Result<Vec<String>> {
        let (root, quality) = split_root(value)?;
        let root_pc = pitch_class(root)?;
        let intervals =
            quality_intervals(quality).ok_or_else(|| MdcError::unknown("chord", value))?;
        Ok(intervals
            .iter()
            .map(|&iv| NOTE_NAMES[usize::from((root_pc + iv) % 12)].to_string())
            .collect())
    }
}

/// Split `"Bbm7"` into `("Bb", "m7")`. The root is the letter plus every
/// directly following `#`/`b`.
fn split_root(value: &str) -> Result<(&str, &str)> {
    let mut end = match value.chars().next() {
        Some(c) if c.is_ascii_uppercase() => c.len_utf8(),
        _ => return Err(MdcError::unknown("chord", value)),
    };
    for c in value[end..].chars() {
        if c == '#' || c == 'b' {
            end += 1;
        } else {
            break;
        }
    }
    Ok(value.split_at(end))
}

/// Semitone intervals above the root for a quality suffix.
fn quality_intervals(quality: &str) -> Option<&'static [u8]> {
    let intervals: &'static [u8] = match quality {
        "" => &[0],
        "M" | "maj" => &[0, 4, 7],
        "m" | "min" | "-" => &[0, 3, 7],
        "dim" | "°" => &[0, 3, 6],
        "aug" | "+" => &[0, 4, 8],
        "5" => &[0, 7],
        "sus2" => &[0, 2, 7],
        "sus" | "sus4" => &[0, 5, 7],

        "6" | "M6" => &[0, 4, 7, 9],
        "m6" | "min6" => &[0, 3, 7, 9],

        "7" | "dom7" => &[0, 4, 7, 10],
        "M7" | "maj7" => &[0, 4, 7, 11],
        "m7" | "min7" | "-7" => &[0, 3, 7, 10],
        "mM7" | "m/M7" => &[0, 3, 7, 11],
        "m7b5" | "ø" => &[0, 3, 6, 10],
        "dim7" => &[0, 3, 6, 9],
        "7sus4" => &[0, 5, 7, 10],
        "add9" => &[0, 4, 7, 14],

        "9" | "dom9" => &[0, 4, 7, 10, 14],
        "M9" | "maj9" => &[0, 4, 7, 11, 14],
        "m9" | "min9" => &[0, 3, 7, 10, 14],
        "7b9" => &[0, 4, 7, 10, 13],
        "7#9" => &[0, 4, 7, 10, 15],

        "11" | "dom11" => &[0, 4, 7, 10, 14, 17],
        "m11" | "min11" => &[0, 3, 7, 10, 14, 17],

        "13" | "dom13" => &[0, 4, 7, 10, 14, 21],
        "M13" | "maj13" => &[0, 4, 7, 11, 14, 21],
        "m13" | "min13" => &[0, 3, 7, 10, 14, 21],

        _ => return None,
    };
    Some(intervals)
}
