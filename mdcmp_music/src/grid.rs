// The composition grid: the editable source of truth for a piece.
//
// A grid is a sparse map bar → track → beat-slots. Every (bar, track) that
// exists holds exactly `beats_per_bar` slots, and every slot holds an
// ordered, possibly empty list of layered events (drum hits, notes, or
// chords). Bars and tracks appear on first write. Rendering to MDC text
// lives in encoder.rs and never goes the other way: MDC is derived from the
// grid, the grid is never rebuilt from MDC.
//
// Edits are addressed with a `Selection` of bars, tracks and beats. Each
// list holds explicit indices and/or `Selector::All`, expanded against the
// grid's current contents at call time (see `Grid::expand_selection`).
// Every editing operation validates its whole selection before mutating, so
// a failed call leaves the grid untouched.

use crate::automation::Automation;
use crate::duration::Granularity;
use crate::error::{MdcError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use tracing::{debug, warn};

/// Default octave for note and chord values. Octave 4 starts at C = 48.
pub const DEFAULT_OCTAVE: u8 = 4;
pub const DEFAULT_VELOCITY: u8 = 50;
/// Default note length, in grid beats.
pub const DEFAULT_DURATION: u8 = 1;

/// One entry in a bars/tracks/beats selector list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Every existing bar, every known track, or every beat of the bar.
    All,
    At(usize),
}

impl From<usize> for Selector {
    fn from(index: usize) -> Self {
        Selector::At(index)
    }
}

/// Where an edit applies: the cross product of bars × tracks × beats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub bars: Vec<Selector>,
    pub tracks: Vec<Selector>,
    pub beats: Vec<Selector>,
}

impl Selection {
    /// A selection of explicit indices.
    pub fn new(bars: &[usize], tracks: &[usize], beats: &[usize]) -> Self {
        let at = |xs: &[usize]| xs.iter().copied().map(Selector::At).collect();
        Selection {
            bars: at(bars),
            tracks: at(tracks),
            beats: at(beats),
        }
    }

    pub fn all_bars(mut self) -> Self {
        self.bars = vec![Selector::All];
        self
    }

    pub fn all_tracks(mut self) -> Self {
        self.tracks = vec![Selector::All];
        self
    }

    pub fn all_beats(mut self) -> Self {
        self.beats = vec![Selector::All];
        self
    }
}

/// Whether a chord value sounds all of its tones or only its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsChord {
    /// Only the first resolved pitch sounds.
    No,
    #[default]
    Yes,
}

/// What `transform` does with an event's chord flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordEdit {
    #[default]
    Preserve,
    Set(IsChord),
}

/// One sound placed in a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Drum name (`kick1`), note (`Eb`) or chord shorthand (`Cm7`).
    pub value: String,
    /// Length in grid beats.
    pub duration: u8,
    /// Ignored for drums.
    pub octave: u8,
    pub velocity: u8,
    /// Track-beat automation carried by this event.
    pub automation: Automation,
    pub is_chord: IsChord,
}

impl Event {
    pub fn new(value: impl Into<String>) -> Self {
        Event {
            value: value.into(),
            duration: DEFAULT_DURATION,
            octave: DEFAULT_OCTAVE,
            velocity: DEFAULT_VELOCITY,
            automation: Automation::default(),
            is_chord: IsChord::Yes,
        }
    }

    pub fn with_duration(mut self, duration: u8) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_octave(mut self, octave: u8) -> Self {
        self.octave = octave;
        self
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_automation(mut self, automation: Automation) -> Self {
        self.automation = automation;
        self
    }

    pub fn with_chord(mut self, is_chord: IsChord) -> Self {
        self.is_chord = is_chord;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.velocity > 127 {
            return Err(MdcError::ValueOutOfRange {
                field: "velocity",
                value: i64::from(self.velocity),
            });
        }
        self.automation.validate()
    }
}

/// An in-place edit applied by `transform`.
///
/// The core fields are optional: `None` keeps the stored value. Automation
/// is always written as a whole, so a field left `None` here resets the
/// stored automation field to no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub value: Option<String>,
    pub duration: Option<u8>,
    pub octave: Option<u8>,
    pub velocity: Option<u8>,
    pub automation: Automation,
    pub chord: ChordEdit,
}

impl EventPatch {
    fn apply(&self, event: &mut Event) {
        if let Some(value) = &self.value {
            event.value.clone_from(value);
        }
        if let Some(duration) = self.duration {
            event.duration = duration;
        }
        if let Some(octave) = self.octave {
            event.octave = octave;
        }
        if let Some(velocity) = self.velocity {
            event.velocity = velocity;
        }
        event.automation = self.automation;
        if let ChordEdit::Set(is_chord) = self.chord {
            event.is_chord = is_chord;
        }
    }
}

/// How `copy_to_end` treats a source (bar, track) that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Fail before copying anything.
    #[default]
    Fail,
    /// Log a warning and copy nothing for that pair.
    Skip,
}

/// The slots of one (bar, track): `beats_per_bar` layered event lists.
pub type TrackBeats = Vec<Vec<Event>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    granularity: Granularity,
    bars: BTreeMap<usize, BTreeMap<usize, TrackBeats>>,
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new(Granularity::Eighth)
    }
}

impl Grid {
    pub fn new(granularity: Granularity) -> Self {
        Grid {
            granularity,
            bars: BTreeMap::new(),
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn beats_per_bar(&self) -> usize {
        self.granularity.beats_per_bar()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Existing bar indices, ascending.
    pub fn bar_indices(&self) -> Vec<usize> {
        self.bars.keys().copied().collect()
    }

    /// Every track index that exists in any bar, ascending.
    pub fn track_indices(&self) -> Vec<usize> {
        self.known_tracks().into_iter().collect()
    }

    pub fn has_track(&self, bar: usize, track: usize) -> bool {
        self.track(bar, track).is_some()
    }

    /// The beat slots of one (bar, track), if it exists.
    pub fn track(&self, bar: usize, track: usize) -> Option<&[Vec<Event>]> {
        self.bars
            .get(&bar)
            .and_then(|tracks| tracks.get(&track))
            .map(Vec::as_slice)
    }

    /// Events layered at one slot, in insertion order.
    pub fn slot(&self, bar: usize, track: usize, beat: usize) -> Option<&[Event]> {
        self.track(bar, track)
            .and_then(|beats| beats.get(beat))
            .map(Vec::as_slice)
    }

    fn known_tracks(&self) -> BTreeSet<usize> {
        self.bars
            .values()
            .flat_map(|tracks| tracks.keys().copied())
            .collect()
    }

    /// Slots of (bar, track), creating the bar and the track on demand.
    fn track_mut(&mut self, bar: usize, track: usize) -> &mut TrackBeats {
        let beats_per_bar = self.beats_per_bar();
        self.bars
            .entry(bar)
            .or_default()
            .entry(track)
            .or_insert_with(|| vec![Vec::new(); beats_per_bar])
    }

    /// Resolve a selection into concrete, de-duplicated index lists.
    ///
    /// `All` in bars expands to the bars that exist now, in tracks to every
    /// track known anywhere in the grid, in beats to `0..beats_per_bar`.
    /// Explicit indices keep their order; explicit beats must be in range.
    pub fn expand_selection(
        &self,
        selection: &Selection,
    ) -> Result<(Vec<usize>, Vec<usize>, Vec<usize>)> {
        if selection.bars.is_empty() {
            return Err(MdcError::MissingSelector("bars"));
        }
        if selection.tracks.is_empty() {
            return Err(MdcError::MissingSelector("tracks"));
        }
        if selection.beats.is_empty() {
            return Err(MdcError::MissingSelector("beats"));
        }

        let beats_per_bar = self.beats_per_bar();
        let bars = expand(&selection.bars, || self.bar_indices());
        let tracks = expand(&selection.tracks, || self.track_indices());
        let beats = expand(&selection.beats, || (0..beats_per_bar).collect());
        if let Some(&beat) = beats.iter().find(|&&b| b >= beats_per_bar) {
            return Err(MdcError::BeatOutOfRange {
                beat,
                beats_per_bar,
            });
        }
        Ok((bars, tracks, beats))
    }

    /// Append a copy of `event` to every selected slot, creating bars and
    /// tracks that do not exist yet.
    pub fn add(&mut self, selection: &Selection, event: &Event) -> Result<()> {
        event.validate()?;
        let (bars, tracks, beats) = self.expand_selection(selection)?;
        for &bar in &bars {
            for &track in &tracks {
                let slots = self.track_mut(bar, track);
                for &beat in &beats {
                    slots[beat].push(event.clone());
                }
            }
        }
        debug!(
            value = %event.value,
            bars = bars.len(),
            tracks = tracks.len(),
            beats = beats.len(),
            "add"
        );
        Ok(())
    }

    /// Rewrite every event in the selected slots with `patch`.
    ///
    /// Every selected bar, (bar, track) and slot must already exist and be
    /// non-empty; the whole selection is checked before any event changes.
    pub fn transform(&mut self, selection: &Selection, patch: &EventPatch) -> Result<()> {
        if let Some(velocity) = patch.velocity {
            if velocity > 127 {
                return Err(MdcError::ValueOutOfRange {
                    field: "velocity",
                    value: i64::from(velocity),
                });
            }
        }
        patch.automation.validate()?;

        let (bars, tracks, beats) = self.expand_selection(selection)?;
        for &bar in &bars {
            let Some(bar_tracks) = self.bars.get(&bar) else {
                return Err(MdcError::InvalidBar(bar));
            };
            for &track in &tracks {
                let Some(slots) = bar_tracks.get(&track) else {
                    return Err(MdcError::InvalidTrack { bar, track });
                };
                if let Some(&beat) = beats.iter().find(|&&beat| slots[beat].is_empty()) {
                    return Err(MdcError::EmptySlot { bar, track, beat });
                }
            }
        }

        let mut edited = 0usize;
        for &bar in &bars {
            for &track in &tracks {
                let slots = self.track_mut(bar, track);
                for &beat in &beats {
                    for event in &mut slots[beat] {
                        patch.apply(event);
                        edited += 1;
                    }
                }
            }
        }
        debug!(edited, "transform");
        Ok(())
    }

    /// Append `count` copies of the listed bars after the current last bar.
    ///
    /// Copies are laid out in list order: with bars `[2, 1]` and count 2 the
    /// new bars hold 2, 1, 2, 1. Only the listed tracks are copied, each
    /// onto the same track index in the new bar, and every destination
    /// (bar, track) exists afterwards even when its source was empty.
    /// Returns the range of new bar indices.
    pub fn copy_to_end(
        &mut self,
        bars: &[usize],
        tracks: &[usize],
        count: usize,
        missing: MissingPolicy,
    ) -> Result<Range<usize>> {
        if bars.is_empty() {
            return Err(MdcError::MissingSelector("bars"));
        }
        if tracks.is_empty() {
            return Err(MdcError::MissingSelector("tracks"));
        }
        if missing == MissingPolicy::Fail {
            for &bar in bars {
                let Some(bar_tracks) = self.bars.get(&bar) else {
                    return Err(MdcError::InvalidBar(bar));
                };
                if let Some(&track) = tracks.iter().find(|t| !bar_tracks.contains_key(t)) {
                    return Err(MdcError::InvalidTrack { bar, track });
                }
            }
        }

        let first = self.bars.keys().next_back().map_or(0, |last| last + 1);
        let mut next = first;
        for _ in 0..count {
            for &bar in bars {
                for &track in tracks {
                    let source = self.track(bar, track).map(<[_]>::to_vec);
                    let dest = self.track_mut(next, track);
                    match source {
                        Some(source) => {
                            for (slot, events) in dest.iter_mut().zip(source) {
                                slot.extend(events);
                            }
                        }
                        None => warn!(bar, track, "copy_to_end: no such source, skipping"),
                    }
                }
                next += 1;
            }
        }
        debug!(first, appended = next - first, "copy_to_end");
        Ok(first..next)
    }

    /// Create every missing (bar, track) up to the last bar, so each bar in
    /// `0..=last` holds every known track. Idempotent.
    pub fn fill_gaps(&mut self) {
        let Some(&last) = self.bars.keys().next_back() else {
            return;
        };
        let tracks = self.known_tracks();
        for bar in 0..=last {
            for &track in &tracks {
                self.track_mut(bar, track);
            }
        }
    }
}

fn expand(selectors: &[Selector], all: impl Fn() -> Vec<usize>) -> Vec<usize> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    let mut push = |index: usize| {
        if seen.insert(index) {
            out.push(index);
        }
    };
    for selector in selectors {
        match *selector {
            Selector::All => all().into_iter().for_each(&mut push),
            Selector::At(index) => push(index),
        }
    }
    out
}

impl Grid {
    /// Compact text view for debugging: one row per track, `|` between
    /// bars, and per slot `.` for empty or the layer count (`+` above 9).
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let last = self.bars.keys().next_back().copied();
        for track in self.known_tracks() {
            out.push_str(&format!("{:>8}: ", format!("track {track}")));
            for bar in 0..=last.unwrap_or(0) {
                if bar > 0 {
                    out.push('|');
                }
                match self.track(bar, track) {
                    Some(slots) => {
                        for slot in slots {
                            out.push(match slot.len() {
                                0 => '.',
                                n @ 1..=9 => char::from(b'0' + n as u8),
                                _ => '+',
                            });
                        }
                    }
                    None => out.push_str(&" ".repeat(self.beats_per_bar())),
                }
            }
            out.push('\n');
        }
        out
    }

    /// Count bars, tracks and events.
    pub fn stats(&self) -> GridStats {
        let mut stats = GridStats {
            bars: self.bars.len(),
            tracks: self.known_tracks().len(),
            ..GridStats::default()
        };
        for slots in self.bars.values().flat_map(|tracks| tracks.values()) {
            for slot in slots {
                if slot.is_empty() {
                    stats.empty_slots += 1;
                } else {
                    stats.events += slot.len();
                }
            }
        }
        stats
    }
}

/// Statistics about a grid's contents.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct GridStats {
    pub bars: usize,
    pub tracks: usize,
    pub events: usize,
    pub empty_slots: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(grid: &Grid, bar: usize, track: usize, beat: usize) -> Vec<&str> {
        grid.slot(bar, track, beat)
            .unwrap_or_default()
            .iter()
            .map(|e| e.value.as_str())
            .collect()
    }

    fn drum_grid() -> Grid {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[]).all_beats(), &Event::new("hat1"))
            .unwrap();
        grid.add(&Selection::new(&[0], &[0], &[0, 4]), &Event::new("kick1"))
            .unwrap();
        grid
    }

    #[test]
    fn test_add_layers_in_order() {
        let grid = drum_grid();
        assert_eq!(values(&grid, 0, 0, 0), vec!["hat1", "kick1"]);
        assert_eq!(values(&grid, 0, 0, 1), vec!["hat1"]);
        assert_eq!(values(&grid, 0, 0, 4), vec!["hat1", "kick1"]);
        assert_eq!(grid.track(0, 0).unwrap().len(), 8);
    }

    #[test]
    fn test_event_defaults() {
        let event = Event::new("Cm7");
        assert_eq!(event.duration, 1);
        assert_eq!(event.octave, 4);
        assert_eq!(event.velocity, 50);
        assert_eq!(event.is_chord, IsChord::Yes);
        assert!(event.automation.is_empty());
    }

    #[test]
    fn test_all_beats_covers_each_beat_once() {
        let mut grid = Grid::new(Granularity::Sixteenth);
        let sel = Selection {
            bars: vec![Selector::At(0)],
            tracks: vec![Selector::At(0)],
            beats: vec![Selector::All, Selector::At(3), Selector::All],
        };
        grid.add(&sel, &Event::new("hat1")).unwrap();
        for beat in 0..16 {
            assert_eq!(values(&grid, 0, 0, beat), vec!["hat1"]);
        }
    }

    #[test]
    fn test_all_tracks_expands_against_whole_grid() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("C")).unwrap();
        grid.add(&Selection::new(&[1], &[2], &[0]), &Event::new("D")).unwrap();
        grid.add(&Selection::new(&[0], &[], &[1]).all_tracks(), &Event::new("E"))
            .unwrap();
        assert_eq!(values(&grid, 0, 0, 1), vec!["E"]);
        assert_eq!(values(&grid, 0, 2, 1), vec!["E"]);
        assert!(!grid.has_track(0, 1));
    }

    #[test]
    fn test_all_bars_on_empty_grid_is_noop() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[], &[0], &[0]).all_bars(), &Event::new("C"))
            .unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_empty_selector_list_fails() {
        let mut grid = Grid::default();
        let err = grid.add(&Selection::new(&[0], &[0], &[]), &Event::new("C"));
        assert!(matches!(err, Err(MdcError::MissingSelector("beats"))));
        let err = grid.add(&Selection::new(&[], &[0], &[0]), &Event::new("C"));
        assert!(matches!(err, Err(MdcError::MissingSelector("bars"))));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_beat_out_of_range_fails_without_mutation() {
        let mut grid = Grid::default();
        let err = grid.add(&Selection::new(&[0], &[0], &[0, 8]), &Event::new("C"));
        assert!(matches!(
            err,
            Err(MdcError::BeatOutOfRange {
                beat: 8,
                beats_per_bar: 8
            })
        ));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_add_rejects_out_of_range_values() {
        let mut grid = Grid::default();
        let loud = Event::new("C").with_velocity(128);
        assert!(grid.add(&Selection::new(&[0], &[0], &[0]), &loud).is_err());
        let panned = Event::new("C").with_automation(Automation::default().with_pan(100));
        assert!(grid.add(&Selection::new(&[0], &[0], &[0]), &panned).is_err());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_transform_patches_fields() {
        let mut grid = Grid::default();
        let event = Event::new("Cm7")
            .with_velocity(40)
            .with_automation(Automation::default().with_pan(-15));
        grid.add(&Selection::new(&[0], &[1], &[0]), &event).unwrap();

        let patch = EventPatch {
            value: Some("G7".into()),
            velocity: Some(90),
            ..EventPatch::default()
        };
        grid.transform(&Selection::new(&[0], &[1], &[0]), &patch).unwrap();

        let stored = &grid.slot(0, 1, 0).unwrap()[0];
        assert_eq!(stored.value, "G7");
        assert_eq!(stored.velocity, 90);
        assert_eq!(stored.duration, 1);
        assert_eq!(stored.is_chord, IsChord::Yes);
        // Automation is always overwritten.
        assert_eq!(stored.automation, Automation::default());
    }

    #[test]
    fn test_transform_is_idempotent_and_keeps_layout() {
        let mut grid = drum_grid();
        let patch = EventPatch {
            velocity: Some(70),
            automation: Automation::default().with_volume(90),
            ..EventPatch::default()
        };
        let sel = Selection::new(&[0], &[0], &[]).all_beats();
        grid.transform(&sel, &patch).unwrap();
        let once = grid.clone();
        grid.transform(&sel, &patch).unwrap();
        assert_eq!(grid, once);
        assert_eq!(grid.stats(), drum_grid().stats());
        assert_eq!(values(&grid, 0, 0, 4), vec!["hat1", "kick1"]);
    }

    #[test]
    fn test_transform_chord_edit() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("Am")).unwrap();
        let patch = EventPatch {
            chord: ChordEdit::Set(IsChord::No),
            ..EventPatch::default()
        };
        grid.transform(&Selection::new(&[0], &[0], &[0]), &patch).unwrap();
        assert_eq!(grid.slot(0, 0, 0).unwrap()[0].is_chord, IsChord::No);

        grid.transform(&Selection::new(&[0], &[0], &[0]), &EventPatch::default())
            .unwrap();
        assert_eq!(grid.slot(0, 0, 0).unwrap()[0].is_chord, IsChord::No);
    }

    #[test]
    fn test_transform_validates_before_mutating() {
        let mut grid = drum_grid();
        let before = grid.clone();
        let patch = EventPatch {
            velocity: Some(99),
            ..EventPatch::default()
        };

        let err = grid.transform(&Selection::new(&[0, 3], &[0], &[0]), &patch);
        assert!(matches!(err, Err(MdcError::InvalidBar(3))));
        let err = grid.transform(&Selection::new(&[0], &[0, 1], &[0]), &patch);
        assert!(matches!(err, Err(MdcError::InvalidTrack { bar: 0, track: 1 })));
        assert_eq!(grid, before);
    }

    #[test]
    fn test_transform_empty_slot_fails() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("C")).unwrap();
        let before = grid.clone();
        let err = grid.transform(
            &Selection::new(&[0], &[0], &[0, 1]),
            &EventPatch::default(),
        );
        assert!(matches!(
            err,
            Err(MdcError::EmptySlot {
                bar: 0,
                track: 0,
                beat: 1
            })
        ));
        assert_eq!(grid, before);
    }

    #[test]
    fn test_copy_to_end_order_and_count() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("C")).unwrap();
        grid.add(&Selection::new(&[1], &[0], &[0]), &Event::new("D")).unwrap();
        grid.add(&Selection::new(&[2], &[0], &[0]), &Event::new("E")).unwrap();

        let appended = grid.copy_to_end(&[2, 1], &[0], 2, MissingPolicy::Fail).unwrap();
        assert_eq!(appended, 3..7);
        let copied: Vec<&str> = (3..7).map(|bar| values(&grid, bar, 0, 0)[0]).collect();
        assert_eq!(copied, vec!["E", "D", "E", "D"]);
    }

    #[test]
    fn test_copy_to_end_is_deep_and_track_preserving() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("kick1")).unwrap();
        grid.add(&Selection::new(&[0], &[1], &[2]), &Event::new("Am")).unwrap();
        grid.copy_to_end(&[0], &[1], 1, MissingPolicy::Fail).unwrap();

        assert_eq!(values(&grid, 1, 1, 2), vec!["Am"]);
        assert!(!grid.has_track(1, 0));

        let patch = EventPatch {
            value: Some("Dm".into()),
            ..EventPatch::default()
        };
        grid.transform(&Selection::new(&[1], &[1], &[2]), &patch).unwrap();
        assert_eq!(values(&grid, 0, 1, 2), vec!["Am"]);
    }

    #[test]
    fn test_copy_to_end_missing_source() {
        let mut grid = drum_grid();
        let before = grid.clone();
        let err = grid.copy_to_end(&[0], &[0, 5], 1, MissingPolicy::Fail);
        assert!(matches!(err, Err(MdcError::InvalidTrack { bar: 0, track: 5 })));
        let err = grid.copy_to_end(&[0, 9], &[0], 1, MissingPolicy::Fail);
        assert!(matches!(err, Err(MdcError::InvalidBar(9))));
        assert_eq!(grid, before);

        let appended = grid.copy_to_end(&[0, 9], &[0, 5], 1, MissingPolicy::Skip).unwrap();
        assert_eq!(appended, 1..3);
        assert_eq!(values(&grid, 1, 0, 0), vec!["hat1", "kick1"]);
        // Destinations exist even when the source was missing.
        assert!(grid.has_track(1, 5));
        assert!(grid.slot(2, 0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_copy_to_end_count_zero_appends_nothing() {
        let mut grid = drum_grid();
        let appended = grid.copy_to_end(&[0], &[0], 0, MissingPolicy::Fail).unwrap();
        assert!(appended.is_empty());
        assert_eq!(grid.bar_indices(), vec![0]);
    }

    #[test]
    fn test_fill_gaps_is_idempotent() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("C")).unwrap();
        grid.add(&Selection::new(&[3], &[2], &[0]), &Event::new("D")).unwrap();
        grid.fill_gaps();

        assert_eq!(grid.bar_indices(), vec![0, 1, 2, 3]);
        for bar in 0..4 {
            assert!(grid.has_track(bar, 0));
            assert!(grid.has_track(bar, 2));
            assert!(!grid.has_track(bar, 1));
        }
        let once = grid.clone();
        grid.fill_gaps();
        assert_eq!(grid, once);
    }

    #[test]
    fn test_summary_and_stats() {
        let grid = drum_grid();
        let summary = grid.summary();
        assert!(summary.contains("track 0: 21112111"), "{summary}");

        let stats = grid.stats();
        assert_eq!(stats.bars, 1);
        assert_eq!(stats.tracks, 1);
        assert_eq!(stats.events, 10);
        assert_eq!(stats.empty_slots, 0);
    }
}
