// Note-name to MIDI pitch mapping.
//
// Pitches are numbered as `pitch_class + 12 * octave`, so C in octave 4 is
// 48 and the valid octaves for a B are 0..=9. Chord shorthands go through a
// `ChordTheory` first (see chords.rs) and every resulting note letter is
// placed in the same octave.

use crate::chords::ChordTheory;
use crate::error::{MdcError, Result};

/// Highest valid MIDI pitch.
pub const MAX_PITCH: u8 = 127;

/// Pitch-class names, indexed 0 (C) to 11 (B). Uses the same mixed
/// sharp/flat spelling that chord resolution returns.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Parse a note letter with any number of `#`/`b` accidentals into a pitch
/// class (0-11). Enharmonics wrap within the octave: `B#` is C and `Cb` is B.
pub fn pitch_class(name: &str) -> Result<u8> {
    let mut chars = name.chars();
    let base: i32 = match chars.next() {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => return Err(MdcError::unknown("note", name)),
    };
    let mut shift = 0i32;
    for c in chars {
        match c {
            '#' => shift += 1,
            'b' => shift -= 1,
            _ => return Err(MdcError::unknown("note", name)),
        }
    }
    Ok((base + shift).rem_euclid(12) as u8)
}

/// Absolute MIDI pitch of a note name in an octave.
pub fn note_to_midi(name: &str, octave: u8) -> Result<u8> {
    let pitch = i64::from(pitch_class(name)?) + 12 * i64::from(octave);
    u8::try_from(pitch)
        .ok()
        .filter(|&p| p <= MAX_PITCH)
        .ok_or(MdcError::PitchOutOfRange(pitch))
}

/// Resolve a note or chord value to its MIDI pitches, in chord order.
pub fn resolve_pitches(value: &str, octave: u8, chords: &dyn ChordTheory) -> Result<Vec<u8>> {
    chords
        .note_names(value)?
        .iter()
        .map(|name| note_to_midi(name, octave))
        .collect()
}
