//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Schluessel-Generierung fehlgeschlagen: {0}")]
    SchluesselGenerierung(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    /// AES-GCM Auth-Tag passt nicht (falscher Schluessel, falsche Nonce oder
    /// manipulierter Ciphertext)
    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    #[error("Ungueltige Nonce-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeNonce { erwartet: usize, erhalten: usize },

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    /// Korrupte Daten: Nonce-Container, Schluessel-Text oder Klartext-Kodierung
    #[error("Ungueltiges Format: {0}")]
    UngueltigesFormat(String),

    #[error("Kein Schluessel fuer Chat {chat_id}")]
    KeinSchluessel { chat_id: String },

    #[error("Kein privater Identitaetsschluessel vorhanden")]
    KeinPrivaterSchluessel,

    #[error("Keystore-Passwort falsch")]
    KeystorePasswort,

    #[error("Schluessel-Export fehlgeschlagen: {0}")]
    Export(String),

    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),
}

impl CryptoError {
    /// Erstellt einen Formatfehler aus einer beliebigen Nachricht
    pub fn format(msg: impl Into<String>) -> Self {
        Self::UngueltigesFormat(msg.into())
    }

    /// Gibt true zurueck wenn die Daten selbst korrupt sind
    ///
    /// Korrupte Daten werden nicht erneut versucht.
    pub fn ist_formatfehler(&self) -> bool {
        matches!(
            self,
            Self::UngueltigesFormat(_)
                | Self::UngueltigeNonce { .. }
                | Self::UngueltigeSchluesselLaenge { .. }
                | Self::Base64(_)
                | Self::Json(_)
        )
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
