// Arpeggiate a chord across tracks: one chord tone per beat, each tone on
// its own track.
//
// Tone n of the chord lands on beat `start_beat + n`, wrapping into the next
// bar when it runs past the end of the bar, and on `tracks[n % tracks.len()]`.
// Tones are written as single notes (`IsChord::No`), so a chord spread over
// four tracks yields four independent melodic lines that can be edited and
// copied like any other event.

use crate::automation::Automation;
use crate::chords::ChordTheory;
use crate::error::{MdcError, Result};
use crate::grid::{DEFAULT_DURATION, DEFAULT_OCTAVE, DEFAULT_VELOCITY, Event, Grid, IsChord, Selection};
use mdcmp_prng::MdcRng;

/// Order in which chord tones are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpreadOrder {
    #[default]
    Ascending,
    Descending,
    Shuffled,
}

#[derive(Debug, Clone)]
pub struct ChordSpread {
    pub chord: String,
    pub bar: usize,
    pub start_beat: usize,
    pub tracks: Vec<usize>,
    pub order: SpreadOrder,
    pub octave: u8,
    pub duration: u8,
    pub velocity: u8,
    pub automation: Automation,
}

impl ChordSpread {
    pub fn new(chord: impl Into<String>, bar: usize, tracks: Vec<usize>) -> Self {
        ChordSpread {
            chord: chord.into(),
            bar,
            start_beat: 0,
            tracks,
            order: SpreadOrder::default(),
            octave: DEFAULT_OCTAVE,
            duration: DEFAULT_DURATION,
            velocity: DEFAULT_VELOCITY,
            automation: Automation::default(),
        }
    }
}

impl Grid {
    /// Lay out the tones of `spread.chord` one per beat. `rng` is only drawn
    /// from for `SpreadOrder::Shuffled`.
    pub fn spread_chord(
        &mut self,
        spread: &ChordSpread,
        chords: &dyn ChordTheory,
        rng: &mut MdcRng,
    ) -> Result<()> {
        if spread.tracks.is_empty() {
            return Err(MdcError::MissingSelector("tracks"));
        }
        let beats_per_bar = self.beats_per_bar();
        if spread.start_beat >= beats_per_bar {
            return Err(MdcError::BeatOutOfRange {
                beat: spread.start_beat,
                beats_per_bar,
            });
        }

        if spread.velocity > 127 {
            return Err(MdcError::ValueOutOfRange {
                field: "velocity",
                value: i64::from(spread.velocity),
            });
        }
        spread.automation.validate()?;

        let mut tones = chords.note_names(&spread.chord)?;
        match spread.order {
            SpreadOrder::Ascending => {}
            SpreadOrder::Descending => tones.reverse(),
            SpreadOrder::Shuffled => rng.shuffle(&mut tones),
        }

        let placements: Vec<(Selection, Event)> = tones
            .into_iter()
            .enumerate()
            .map(|(n, tone)| {
                let position = spread.start_beat + n;
                let selection = Selection::new(
                    &[spread.bar + position / beats_per_bar],
                    &[spread.tracks[n % spread.tracks.len()]],
                    &[position % beats_per_bar],
                );
                let event = Event::new(tone)
                    .with_octave(spread.octave)
                    .with_duration(spread.duration)
                    .with_velocity(spread.velocity)
                    .with_automation(spread.automation)
                    .with_chord(IsChord::No);
                (selection, event)
            })
            .collect();
        for (selection, event) in &placements {
            self.add(selection, event)?;
        }
        Ok(())
    }
}
