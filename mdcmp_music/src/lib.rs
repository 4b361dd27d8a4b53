// MDC Music Compiler
//
// Composes multi-track music on an editable grid, renders it to MDC (a
// compact, line-oriented text format with one line per track), and converts
// MDC documents into timed MIDI events. The three stages are independent:
// MDC files written by hand or by another tool convert just the same, and
// a grid can be rendered to MDC without ever touching MIDI.
//
// Architecture:
// - grid.rs: Sparse bar → track → beat-slot grid with selection-based
//   add / transform / copy-to-end editing and gap filling
// - spread.rs: Arpeggiating a chord one tone per beat across tracks
// - encoder.rs: Grid → MDC text (pitch resolution, column collapsing,
//   seeded velocity jitter and humanize padding)
// - converter.rs: MDC text → sink events (whole-document validation, then
//   isochronous emission; track counter persists across documents)
// - composer.rs: Directory bank of MDC files layered through one converter
// - sink.rs: `EventSink` seam plus `EventLog`, a recording sink
// - midi.rs: `MidiFile`, the Standard MIDI File sink (via midly)
// - format.rs: MDC separators, version, and track kinds
// - automation.rs: Per-track-beat volume / pan / pitch-wheel / CC automation
// - duration.rs: Granularities and duration / padding symbols
// - pitch.rs, chords.rs, drums.rs: Note, chord-shorthand and drum-name
//   resolution
// - config.rs: JSON-loadable encode and convert settings
// - error.rs: `MdcError`, the crate-wide error type
//
// Encoding is deterministic given a seed: every random draw comes from the
// caller's `MdcRng` (mdcmp_prng).

pub mod automation;
pub mod chords;
pub mod composer;
pub mod config;
pub mod converter;
pub mod drums;
pub mod duration;
pub mod encoder;
pub mod error;
pub mod format;
pub mod grid;
pub mod midi;
pub mod pitch;
pub mod sink;
pub mod spread;

pub use automation::Automation;
pub use chords::{ChordTheory, ShorthandChords};
pub use composer::Composer;
pub use config::{ConverterConfig, EncodeOptions, MdcConfig};
pub use converter::{Converter, parse_mdc};
pub use duration::Granularity;
pub use encoder::{encode_grid, write_mdc};
pub use error::{MdcError, Result};
pub use grid::{ChordEdit, Event, EventPatch, Grid, IsChord, MissingPolicy, Selection, Selector};
pub use midi::MidiFile;
pub use sink::{EventLog, EventSink, SinkEvent};
pub use spread::{ChordSpread, SpreadOrder};
