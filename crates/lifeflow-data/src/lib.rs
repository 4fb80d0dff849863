//! Data-driven profile loading for Lifeflow.
//!
//! A profile directory holds `resources`, `rules`, `processes`, `supplies`
//! and `settings` files, each in RON, TOML, or JSON.

pub mod loader;
pub mod schema;

pub use loader::{
    DataLoadError, Format, LoadedProfile, SkippedDefinition, load_profile, load_profile_str,
};
