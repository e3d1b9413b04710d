//! Line-based text protocol spoken by the device firmware.
//!
//! Each command is one ASCII line `"<VERB> <arg>\n"` or `"<VERB>\n"`, with
//! numeric arguments printed to exactly two decimals.  The firmware parses
//! the argument with a substring offset after the verb, so the single space
//! and the terminating newline are part of the contract.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Verb
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Pitch,
    Reverb,
    Robot,
    Reset,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Pitch => "PITCH",
            Verb::Reverb => "REVERB",
            Verb::Robot => "ROBOT",
            Verb::Reset => "RESET",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One outbound parameter change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub verb: Verb,
    pub arg: Option<f32>,
}

impl Command {
    pub fn new(verb: Verb, arg: Option<f32>) -> Self {
        Self { verb, arg }
    }

    pub fn pitch(factor: f32) -> Self {
        Self::new(Verb::Pitch, Some(factor))
    }

    pub fn reverb(mix: f32) -> Self {
        Self::new(Verb::Reverb, Some(mix))
    }

    pub fn reset() -> Self {
        Self::new(Verb::Reset, None)
    }

    /// Whether the argument (if any) can be printed with two decimals.
    /// NaN and infinities cannot.
    pub fn is_finite(&self) -> bool {
        self.arg.map_or(true, f32::is_finite)
    }

    /// Serialise to the wire line.
    ///
    /// ```rust
    /// use pitch_relay::device::{Command, Verb};
    ///
    /// assert_eq!(Command::pitch(0.5).encode(), "PITCH 0.50\n");
    /// assert_eq!(Command::new(Verb::Reset, None).encode(), "RESET\n");
    /// ```
    pub fn encode(&self) -> String {
        encode(self.verb, self.arg)
    }
}

/// Format `verb` and an optional argument as one protocol line.
pub fn encode(verb: Verb, arg: Option<f32>) -> String {
    match arg {
        Some(value) => format!("{verb} {value:.2}\n"),
        None => format!("{verb}\n"),
    }
}

// ---------------------------------------------------------------------------
// Preset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown preset: {0:?}")]
pub struct UnknownPreset(pub String);

/// Fixed parameter bundles exposed as one-click buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    LowVoice,
    HighVoice,
    Robot,
    Reset,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::LowVoice,
        Preset::HighVoice,
        Preset::Robot,
        Preset::Reset,
    ];

    pub fn command(self) -> Command {
        match self {
            Preset::LowVoice => Command::pitch(0.5),
            Preset::HighVoice => Command::pitch(2.0),
            Preset::Robot => Command::new(Verb::Robot, Some(1.0)),
            Preset::Reset => Command::reset(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Preset::LowVoice => "Low Voice",
            Preset::HighVoice => "High Voice",
            Preset::Robot => "Robot",
            Preset::Reset => "Reset",
        }
    }
}

impl FromStr for Preset {
    type Err = UnknownPreset;

    /// Accepts the button labels and short forms, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "lowvoice" | "low" => Ok(Preset::LowVoice),
            "highvoice" | "high" => Ok(Preset::HighVoice),
            "robot" => Ok(Preset::Robot),
            "reset" => Ok(Preset::Reset),
            _ => Err(UnknownPreset(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_has_two_decimals() {
        assert_eq!(encode(Verb::Pitch, Some(0.5)), "PITCH 0.50\n");
        assert_eq!(encode(Verb::Pitch, Some(1.234)), "PITCH 1.23\n");
    }

    #[test]
    fn reset_has_no_argument() {
        assert_eq!(encode(Verb::Reset, None), "RESET\n");
    }

    #[test]
    fn reverb_line() {
        assert_eq!(Command::reverb(0.3).encode(), "REVERB 0.30\n");
    }

    #[test]
    fn non_finite_arguments_are_flagged() {
        assert!(Command::pitch(1.0).is_finite());
        assert!(Command::reset().is_finite());
        assert!(!Command::pitch(f32::NAN).is_finite());
        assert!(!Command::reverb(f32::INFINITY).is_finite());
    }

    #[test]
    fn preset_lines() {
        assert_eq!(Preset::LowVoice.command().encode(), "PITCH 0.50\n");
        assert_eq!(Preset::HighVoice.command().encode(), "PITCH 2.00\n");
        assert_eq!(Preset::Robot.command().encode(), "ROBOT 1.00\n");
        assert_eq!(Preset::Reset.command().encode(), "RESET\n");
    }

    #[test]
    fn preset_names_parse() {
        assert_eq!("Low Voice".parse::<Preset>(), Ok(Preset::LowVoice));
        assert_eq!("high".parse::<Preset>(), Ok(Preset::HighVoice));
        assert_eq!(" ROBOT ".parse::<Preset>(), Ok(Preset::Robot));
        assert_eq!("high_voice".parse::<Preset>(), Ok(Preset::HighVoice));
        assert!("echo".parse::<Preset>().is_err());
    }

    #[test]
    fn labels_round_trip() {
        for preset in Preset::ALL {
            assert_eq!(preset.label().parse::<Preset>(), Ok(preset));
        }
    }
}
