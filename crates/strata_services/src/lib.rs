//! Strata Services Layer
//!
//! Settings persistence and other platform-facing helpers.

pub mod settings;

pub use settings::{Settings, SettingsError};
