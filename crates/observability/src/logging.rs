//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `LC_LOG_LEVEL`: Filter-Direktive (z.B. `debug` oder `litechat_e2ee=trace`), Standard: info
//! - `LC_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Umgebungsvariablen haben Vorrang vor der Konfigurationsdatei.
//! Ausgaben gehen nach stderr, stdout bleibt fuer Nutzdaten frei.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "LC_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LC_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("Unbekanntes Log-Format '{other}' (text|json)")),
        }
    }
}

/// Aufgeloeste Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogKonfig {
    pub level: String,
    pub format: LogFormat,
}

impl LogKonfig {
    /// Kombiniert Konfigurationswerte mit optionalen Umgebungswerten
    ///
    /// Ungueltige Umgebungswerte werden ignoriert.
    pub fn aufloesen(
        level: &str,
        format: LogFormat,
        env_level: Option<String>,
        env_format: Option<String>,
    ) -> Self {
        let level = env_level
            .filter(|l| log_level_gueltig(l))
            .unwrap_or_else(|| level.to_string());
        let format = env_format
            .and_then(|f| f.parse().ok())
            .unwrap_or(format);
        Self { level, format }
    }

    /// Wie [`LogKonfig::aufloesen`] mit `LC_LOG_LEVEL` und `LC_LOG_FORMAT`
    pub fn aus_umgebung(level: &str, format: LogFormat) -> Self {
        Self::aufloesen(
            level,
            format,
            std::env::var(ENV_LOG_LEVEL).ok(),
            std::env::var(ENV_LOG_FORMAT).ok(),
        )
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialisiert das Logging-System.
///
/// Schlaegt fehl wenn bereits ein globaler Subscriber gesetzt ist.
pub fn logging_initialisieren(level: &str, format: LogFormat) -> Result<LogKonfig> {
    let konfig = LogKonfig::aus_umgebung(level, format);
    let filter = konfig.filter();

    match konfig.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    }
    .map_err(|e| anyhow!("Logging konnte nicht initialisiert werden: {e}"))?;

    tracing::debug!(level = %konfig.level, format = ?konfig.format, "Logging initialisiert");
    Ok(konfig)
}

/// Validiert einen Level-String oder eine Filter-Direktive wie "litechat_e2ee=debug".
pub fn log_level_gueltig(level: &str) -> bool {
    !level.trim().is_empty() && EnvFilter::try_new(level).is_ok()
}
