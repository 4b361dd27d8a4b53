// Drum names ↔ General MIDI percussion pitches (channel 10 key map).
//
// Grid values that appear in this table are drum hits: they resolve to a
// fixed pitch and never go through chord resolution. A track whose events
// are all drum hits is written as a `drum` line in MDC.

/// MIDI channel (0-based) reserved for percussion.
pub const DRUM_CHANNEL: u8 = 9;

const DRUMS: [(&str, u8); 47] = [
    ("kick2", 35),
    ("kick1", 36),
    ("sidestick", 37),
    ("snare1", 38),
    ("clap", 39),
    ("snare2", 40),
    ("lowfloortom", 41),
    ("hat1", 42),
    ("highfloortom", 43),
    ("hat2", 44),
    ("lowtom", 45),
    ("hatopen", 46),
    ("lowmidtom", 47),
    ("himidtom", 48),
    ("crash1", 49),
    ("hightom", 50),
    ("ridecym", 51),
    ("chinacym", 52),
    ("ridebell", 53),
    ("tamb", 54),
    ("splash", 55),
    ("cowbell", 56),
    ("crash2", 57),
    ("vibraslap", 58),
    ("ridecym2", 59),
    ("hibongo", 60),
    ("lowbongo", 61),
    ("mutehiconga", 62),
    ("openhiconga", 63),
    ("lowconga", 64),
    ("hightimbale", 65),
    ("lowtimbale", 66),
    ("highagogo", 67),
    ("lowagogo", 68),
    ("cabasa", 69),
    ("maracas", 70),
    ("shortwhistle", 71),
    ("longwhistle", 72),
    ("shortguiro", 73),
    ("longguiro", 74),
    ("claves", 75),
    ("hiwoodblock", 76),
    ("lowwoodblock", 77),
    ("mutecuica", 78),
    ("opencuica", 79),
    ("mutetriangle", 80),
    ("opentriangle", 81),
];

/// Percussion pitch for a drum name, or `None` if the value is not a drum.
pub fn drum_pitch(name: &str) -> Option<u8> {
    DRUMS.iter().find(|(n, _)| *n == name).map(|&(_, p)| p)
}

/// Drum name for a percussion pitch.
pub fn drum_name(pitch: u8) -> Option<&'static str> {
    DRUMS.iter().find(|(_, p)| *p == pitch).map(|&(n, _)| n)
}

pub fn is_drum(name: &str) -> bool {
    drum_pitch(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_kit_pieces() {
        assert_eq!(drum_pitch("kick1"), Some(36));
        assert_eq!(drum_pitch("snare1"), Some(38));
        assert_eq!(drum_pitch("hat1"), Some(42));
        assert_eq!(drum_pitch("Cm7"), None);
        assert!(is_drum("tamb"));
        assert!(!is_drum("Eb"));
    }

    #[test]
    fn table_is_bidirectional() {
        for &(name, pitch) in &DRUMS {
            assert_eq!(drum_pitch(name), Some(pitch));
            assert_eq!(drum_name(pitch), Some(name));
        }
        assert_eq!(drum_name(34), None);
    }
}
