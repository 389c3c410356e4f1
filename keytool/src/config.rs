//! Keytool-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, das Werkzeug laeuft auch ohne Konfigurationsdatei.

use std::path::PathBuf;

use litechat_crypto::types::{PBKDF2_ITERATIONEN, RSA_MODULUS_BITS};
use litechat_crypto::KeyParameters;
use anyhow::{anyhow, bail};
use litechat_observability::{log_level_gueltig, LogFormat};
use serde::{Deserialize, Serialize};

/// Umgebungsvariable mit dem Pfad der Konfigurationsdatei (`--config`)
pub const ENV_CONFIG: &str = "LITECHAT_CONFIG";

pub const STANDARD_CONFIG_DATEI: &str = "keytool.toml";

/// Vollstaendige Keytool-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeytoolConfig {
    pub schluessel: SchluesselEinstellungen,
    pub logging: LoggingEinstellungen,
}

/// Schluessel-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchluesselEinstellungen {
    /// Modulus-Laenge neuer Identitaetsschluessel
    pub rsa_modulus_bits: usize,
    /// PBKDF2-Iterationen fuer den Keystore
    pub pbkdf2_iterationen: u32,
    /// Datei des lokalen Schluessel-Caches
    pub cache_datei: PathBuf,
}

impl Default for SchluesselEinstellungen {
    fn default() -> Self {
        Self {
            rsa_modulus_bits: RSA_MODULUS_BITS,
            pbkdf2_iterationen: PBKDF2_ITERATIONEN,
            cache_datei: PathBuf::from("litechat-keys.json"),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Filter-Direktive, z.B. "info" oder "litechat_e2ee=debug"
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

impl KeytoolConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// `None` wenn die Datei nicht existiert; der Aufrufer meldet das, sobald
    /// das Logging steht.
    pub fn laden(pfad: &str) -> anyhow::Result<Option<Self>> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map(Some)
                .map_err(|e| anyhow!("Konfigurationsfehler in '{pfad}': {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!("Konfigurationsdatei '{pfad}' nicht lesbar: {e}")),
        }
    }

    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(inhalt)?;
        if !log_level_gueltig(&config.logging.level) {
            bail!("Ungueltiger Log-Level '{}'", config.logging.level);
        }
        Ok(config)
    }

    pub fn key_parameter(&self) -> KeyParameters {
        KeyParameters {
            rsa_modulus_bits: self.schluessel.rsa_modulus_bits,
            pbkdf2_iterations: self.schluessel.pbkdf2_iterationen,
        }
    }
}
