//! Fehlertypen fuer das Records-Crate

use thiserror::Error;

/// Fehler des Record-Speichers
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Datensatz nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    /// Netzwerk- oder Serverfehler; wird unveraendert an den Aufrufer gereicht
    #[error("Transportfehler: {0}")]
    Transport(String),

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecordError {
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn ist_nicht_gefunden(&self) -> bool {
        matches!(self, Self::NichtGefunden(_))
    }

    pub fn ist_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type RecordResult<T> = Result<T, RecordError>;
