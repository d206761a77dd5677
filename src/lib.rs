// Library target shared by the binary and the integration tests.
// Translations live in `locales/`; English is the fallback for missing keys.

rust_i18n::i18n!("locales", fallback = "en");

pub mod app;
pub mod config;
pub mod content;
pub mod engine;
pub mod event;
pub mod session;
pub mod store;
pub mod telemetry;
