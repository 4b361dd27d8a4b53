// Per-track-beat automation: volume, pan, pitch-wheel, mod-wheel,
// expression and sustain.
//
// Every field is optional and `None` means "no change" (written as `n` in
// MDC). Automation belongs to a track-beat, not to a note: when several
// layered events on one beat carry automation, the last non-`None` value
// for each field wins (`overlay`).
//
// Ranges: volume, mod-wheel, expression and sustain are MIDI controller
// values 0..=127. Pan and pitch-wheel are centred on zero, -64..=64, and
// are shifted/scaled into MIDI range only when emitted.

use crate::duration::NO_OP;
use crate::error::{MdcError, Result};

pub const CC_MOD_WHEEL: u8 = 1;
pub const CC_VOLUME: u8 = 7;
pub const CC_PAN: u8 = 10;
pub const CC_EXPRESSION: u8 = 11;
pub const CC_SUSTAIN: u8 = 64;

const CONTROLLER_MAX: i64 = 127;
const CENTRED_MIN: i64 = -64;
const CENTRED_MAX: i64 = 64;

/// Largest positive 14-bit pitch-bend value.
const PITCH_BEND_MAX: i16 = 8191;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Automation {
    /// Channel volume (CC 7), 0..=127.
    pub volume: Option<u8>,
    /// Stereo pan, -64 (left) ..= 64 (right); sent as CC 10 shifted by +64.
    pub pan: Option<i8>,
    /// Pitch-wheel, -64..=64; sent as a 14-bit bend scaled by 128.
    pub pitch_wheel: Option<i8>,
    /// Mod-wheel (CC 1), 0..=127.
    pub mod_wheel: Option<u8>,
    /// Expression (CC 11), 0..=127.
    pub expression: Option<u8>,
    /// Sustain pedal (CC 64), 0..=127.
    pub sustain: Option<u8>,
}

/// One automation change, ready for an event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationChange {
    Controller { controller: u8, value: u8 },
    PitchWheel(i16),
}

impl Automation {
    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_pan(mut self, pan: i8) -> Self {
        self.pan = Some(pan);
        self
    }

    pub fn with_pitch_wheel(mut self, pitch_wheel: i8) -> Self {
        self.pitch_wheel = Some(pitch_wheel);
        self
    }

    pub fn with_mod_wheel(mut self, mod_wheel: u8) -> Self {
        self.mod_wheel = Some(mod_wheel);
        self
    }

    pub fn with_expression(mut self, expression: u8) -> Self {
        self.expression = Some(expression);
        self
    }

    pub fn with_sustain(mut self, sustain: u8) -> Self {
        self.sustain = Some(sustain);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Automation::default()
    }

    /// Merge a later layer on top of this one: every field the later layer
    /// sets replaces ours, every field it leaves `None` keeps ours.
    pub fn overlay(&mut self, later: &Automation) {
        self.volume = later.volume.or(self.volume);
        self.pan = later.pan.or(self.pan);
        self.pitch_wheel = later.pitch_wheel.or(self.pitch_wheel);
        self.mod_wheel = later.mod_wheel.or(self.mod_wheel);
        self.expression = later.expression.or(self.expression);
        self.sustain = later.sustain.or(self.sustain);
    }

    /// Check every set field against its documented range.
    pub fn validate(&self) -> Result<()> {
        let checks: [(&'static str, Option<i64>, i64, i64); 6] = [
            ("volume", self.volume.map(i64::from), 0, CONTROLLER_MAX),
            ("pan", self.pan.map(i64::from), CENTRED_MIN, CENTRED_MAX),
            ("pitch-wheel", self.pitch_wheel.map(i64::from), CENTRED_MIN, CENTRED_MAX),
            ("mod-wheel", self.mod_wheel.map(i64::from), 0, CONTROLLER_MAX),
            ("expression", self.expression.map(i64::from), 0, CONTROLLER_MAX),
            ("sustain", self.sustain.map(i64::from), 0, CONTROLLER_MAX),
        ];
        for (field, value, low, high) in checks {
            if let Some(v) = value {
                if !(low..=high).contains(&v) {
                    return Err(MdcError::ValueOutOfRange { field, value: v });
                }
            }
        }
        Ok(())
    }

    /// The six MDC subfields, in wire order:
    /// volume, pitch-wheel, mod-wheel, expression, sustain, pan.
    pub fn to_mdc_fields(&self) -> [String; 6] {
        fn field<T: ToString>(value: Option<T>) -> String {
            value.map_or_else(|| NO_OP.to_string(), |v| v.to_string())
        }
        [
            field(self.volume),
            field(self.pitch_wheel),
            field(self.mod_wheel),
            field(self.expression),
            field(self.sustain),
            field(self.pan),
        ]
    }

    /// Parse the six MDC automation subfields (wire order as in
    /// `to_mdc_fields`). Values are range-checked.
    pub fn from_mdc_fields(fields: &[&str]) -> Result<Self> {
        let [volume, pitch_wheel, mod_wheel, expression, sustain, pan] = fields else {
            return Err(MdcError::unknown("automation field list", fields.join(",")));
        };
        let automation = Automation {
            volume: parse_field(volume, "volume")?,
            pan: parse_field(pan, "pan")?,
            pitch_wheel: parse_field(pitch_wheel, "pitch-wheel")?,
            mod_wheel: parse_field(mod_wheel, "mod-wheel")?,
            expression: parse_field(expression, "expression")?,
            sustain: parse_field(sustain, "sustain")?,
        };
        automation.validate()?;
        Ok(automation)
    }

    /// The changes this automation emits, in MDC field order.
    pub fn changes(&self) -> Vec<AutomationChange> {
        let mut out = Vec::new();
        let mut controller = |controller: u8, value: Option<u8>| {
            if let Some(value) = value {
                out.push(AutomationChange::Controller { controller, value });
            }
        };
        controller(CC_VOLUME, self.volume);
        let bend = self.pitch_wheel.map(|pw| (i16::from(pw) * 128).min(PITCH_BEND_MAX));
        controller(CC_MOD_WHEEL, self.mod_wheel);
        controller(CC_EXPRESSION, self.expression);
        controller(CC_SUSTAIN, self.sustain);
        controller(
            CC_PAN,
            self.pan.map(|pan| (i16::from(pan) + 64).clamp(0, 127) as u8),
        );
        if let Some(bend) = bend {
            // Pitch-wheel sits second in wire order.
            let at = usize::from(self.volume.is_some());
            out.insert(at, AutomationChange::PitchWheel(bend));
        }
        out
    }
}

fn parse_field<T: std::str::FromStr>(token: &str, field: &'static str) -> Result<Option<T>> {
    let token = token.trim();
    if token == NO_OP {
        return Ok(None);
    }
    token
        .parse()
        .map(Some)
        .map_err(|_| MdcError::unknown(field, token))
}
