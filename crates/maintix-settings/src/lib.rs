//! # maintix-settings
//!
//! Layered configuration for the maintix server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`MaintixSettings::default()`]
//! 2. **User file**: `~/.maintix/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `MAINTIX_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
