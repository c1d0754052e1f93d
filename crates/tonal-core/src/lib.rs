//! Tonal core crate - configuration, errors, data model and personality presets.

pub mod config;
pub mod error;
pub mod personality;
pub mod types;

pub use config::TonalConfig;
pub use error::{Result, TonalError};
pub use personality::{
    apply_trait_edit, default_personality, get_preset, list_presets, PersonalityConfig,
    PersonalityError, PersonalityTrait, Preset,
};
pub use types::*;
