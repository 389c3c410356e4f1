//! # litechat-observability
//!
//! Structured Logging fuer LiteChat-Werkzeuge:
//! - Text- oder JSON-Ausgabe via tracing-subscriber
//! - Level und Format per Konfiguration, ueberschreibbar per Umgebung

pub mod logging;

pub use logging::{
    log_level_gueltig, logging_initialisieren, LogFormat, LogKonfig,
    ENV_LOG_FORMAT, ENV_LOG_LEVEL,
};
