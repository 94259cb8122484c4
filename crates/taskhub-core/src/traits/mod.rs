//! Core traits defined in `taskhub-core` and implemented by other crates.

pub mod settings;

pub use settings::SettingsStore;
