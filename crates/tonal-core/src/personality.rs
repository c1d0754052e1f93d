//! Personality trait vector and named presets.
//!
//! A `PersonalityConfig` is a pure value: four independent traits, each in
//! `0..=100`. Which preset (if any) is "active" is bookkeeping kept by the
//! caller next to the config, never inside it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest allowed trait value.
pub const TRAIT_MIN: i32 = 0;
/// Highest allowed trait value.
pub const TRAIT_MAX: i32 = 100;

/// Errors from personality lookups and edits.
///
/// These indicate a programming error in the caller; values are never
/// clamped silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersonalityError {
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
    #[error("unknown trait: {0}")]
    UnknownTrait(String),
    #[error("{trait_name} value {value} is outside 0..=100")]
    OutOfRange {
        trait_name: PersonalityTrait,
        value: i32,
    },
}

/// The four tunable traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityTrait {
    Humor,
    Sarcasm,
    Seriousness,
    Empathy,
}

impl PersonalityTrait {
    /// All traits in display order.
    pub const ALL: [PersonalityTrait; 4] = [
        PersonalityTrait::Humor,
        PersonalityTrait::Sarcasm,
        PersonalityTrait::Seriousness,
        PersonalityTrait::Empathy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonalityTrait::Humor => "humor",
            PersonalityTrait::Sarcasm => "sarcasm",
            PersonalityTrait::Seriousness => "seriousness",
            PersonalityTrait::Empathy => "empathy",
        }
    }
}

impl fmt::Display for PersonalityTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonalityTrait {
    type Err = PersonalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "humor" => Ok(PersonalityTrait::Humor),
            "sarcasm" => Ok(PersonalityTrait::Sarcasm),
            "seriousness" => Ok(PersonalityTrait::Seriousness),
            "empathy" => Ok(PersonalityTrait::Empathy),
            _ => Err(PersonalityError::UnknownTrait(s.to_string())),
        }
    }
}

/// Tone settings sent with every chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonalityConfig {
    pub humor: u8,
    pub sarcasm: u8,
    pub seriousness: u8,
    pub empathy: u8,
}

impl PersonalityConfig {
    /// Build a config, rejecting any trait outside `0..=100`.
    pub fn new(
        humor: i32,
        sarcasm: i32,
        seriousness: i32,
        empathy: i32,
    ) -> Result<Self, PersonalityError> {
        Ok(Self {
            humor: checked(PersonalityTrait::Humor, humor)?,
            sarcasm: checked(PersonalityTrait::Sarcasm, sarcasm)?,
            seriousness: checked(PersonalityTrait::Seriousness, seriousness)?,
            empathy: checked(PersonalityTrait::Empathy, empathy)?,
        })
    }

    pub fn get(&self, trait_name: PersonalityTrait) -> u8 {
        match trait_name {
            PersonalityTrait::Humor => self.humor,
            PersonalityTrait::Sarcasm => self.sarcasm,
            PersonalityTrait::Seriousness => self.seriousness,
            PersonalityTrait::Empathy => self.empathy,
        }
    }

    /// Check every trait is in range.
    ///
    /// Values arriving through deserialization are only bounded by `u8`,
    /// so boundaries that accept untrusted input call this.
    pub fn validate(&self) -> Result<(), PersonalityError> {
        for trait_name in PersonalityTrait::ALL {
            checked(trait_name, i32::from(self.get(trait_name)))?;
        }
        Ok(())
    }
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        default_personality()
    }
}

impl fmt::Display for PersonalityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "humor={} sarcasm={} seriousness={} empathy={}",
            self.humor, self.sarcasm, self.seriousness, self.empathy
        )
    }
}

fn checked(trait_name: PersonalityTrait, value: i32) -> Result<u8, PersonalityError> {
    if (TRAIT_MIN..=TRAIT_MAX).contains(&value) {
        // In range, so the narrowing cannot truncate.
        Ok(value as u8)
    } else {
        Err(PersonalityError::OutOfRange { trait_name, value })
    }
}

// =============================================================================
// Presets
// =============================================================================

/// Named, fixed personality vectors offered as one-click shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    Serious,
    Funny,
    Sarcastic,
    Supportive,
}

impl Preset {
    /// All presets in their fixed listing order.
    pub const ALL: [Preset; 4] = [
        Preset::Serious,
        Preset::Funny,
        Preset::Sarcastic,
        Preset::Supportive,
    ];

    /// The preset used at startup and on "new chat".
    pub const DEFAULT: Preset = Preset::Supportive;

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Serious => "Serious",
            Preset::Funny => "Funny",
            Preset::Sarcastic => "Sarcastic",
            Preset::Supportive => "Supportive",
        }
    }

    pub fn config(&self) -> PersonalityConfig {
        match self {
            Preset::Serious => PersonalityConfig {
                humor: 5,
                sarcasm: 0,
                seriousness: 90,
                empathy: 40,
            },
            Preset::Funny => PersonalityConfig {
                humor: 85,
                sarcasm: 10,
                seriousness: 10,
                empathy: 50,
            },
            Preset::Sarcastic => PersonalityConfig {
                humor: 30,
                sarcasm: 90,
                seriousness: 20,
                empathy: 10,
            },
            Preset::Supportive => PersonalityConfig {
                humor: 20,
                sarcasm: 0,
                seriousness: 30,
                empathy: 95,
            },
        }
    }

    /// The preset whose vector equals `config` exactly, if any.
    pub fn matching(config: &PersonalityConfig) -> Option<Preset> {
        Preset::ALL.into_iter().find(|p| p.config() == *config)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = PersonalityError;

    /// Preset names match case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PersonalityError::UnknownPreset(s.to_string()))
    }
}

/// Preset names in their fixed order.
pub fn list_presets() -> Vec<&'static str> {
    Preset::ALL.iter().map(Preset::name).collect()
}

/// Look up a preset vector by name.
pub fn get_preset(name: &str) -> Result<PersonalityConfig, PersonalityError> {
    name.parse::<Preset>().map(|p| p.config())
}

/// The startup personality.
pub fn default_personality() -> PersonalityConfig {
    Preset::DEFAULT.config()
}

/// Return a copy of `config` with exactly one trait replaced.
pub fn apply_trait_edit(
    config: PersonalityConfig,
    trait_name: PersonalityTrait,
    value: i32,
) -> Result<PersonalityConfig, PersonalityError> {
    let value = checked(trait_name, value)?;
    let mut edited = config;
    match trait_name {
        PersonalityTrait::Humor => edited.humor = value,
        PersonalityTrait::Sarcasm => edited.sarcasm = value,
        PersonalityTrait::Seriousness => edited.seriousness = value,
        PersonalityTrait::Empathy => edited.empathy = value,
    }
    Ok(edited)
}
