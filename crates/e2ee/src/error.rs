//! Fehlertypen fuer das E2EE-Crate

use litechat_crypto::CryptoError;
use litechat_records::RecordError;
use thiserror::Error;

/// E2EE-Fehlertypen
#[derive(Debug, Error)]
pub enum E2eeError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Fehler des Record-Backends, unveraendert weitergereicht
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("Keystore enthaelt keine Eintraege")]
    KeystoreLeer,

    #[error("Keystore-Salz (PBKDF2-Eintrag) nicht gefunden")]
    KeystoreSaltFehlt,

    #[error("Benutzer {user_id} hat keinen oeffentlichen Schluessel veroeffentlicht")]
    KeinOeffentlicherSchluessel { user_id: String },

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Lokaler Schluessel-Speicher: {0}")]
    Speicher(String),

    #[error("Hintergrund-Task abgebrochen: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archiv-Fehler: {0}")]
    Archiv(#[from] zip::result::ZipError),
}

impl E2eeError {
    /// Gibt true zurueck wenn das Backend nicht erreichbar war
    pub fn ist_transport(&self) -> bool {
        matches!(self, Self::Record(e) if e.ist_transport())
    }

    /// Gibt true zurueck wenn ein Keystore-Passwort falsch war
    pub fn ist_passwortfehler(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::KeystorePasswort))
    }
}

pub type E2eeResult<T> = Result<T, E2eeError>;
