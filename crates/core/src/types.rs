//! Gemeinsame Identifikationstypen fuer LiteChat
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Chat- und Benutzer-IDs zur Compilezeit auszuschliessen. Die IDs stammen
//! vom Record-Backend und sind daher opake Strings.

use serde::{Deserialize, Serialize};

/// Eintrag des Identitaets-Privatschluessels im lokalen Schluessel-Cache
pub const PRIVATE_KEY_ENTRY: &str = "privateKey";

/// Praefix der Chat-Schluessel-Eintraege im lokalen Schluessel-Cache
const CHAT_ENTRY_PREFIX: &str = "chat_";

/// Prueft ob eine Backend-ID nur aus ASCII-Buchstaben, Ziffern, `-` und `_` besteht
///
/// IDs landen in Cache-Eintraegen und Export-Dateinamen.
pub fn id_gueltig(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Eindeutige Benutzer-ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Eindeutige Chat-ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn ist_gueltig(&self) -> bool {
        id_gueltig(&self.0)
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Schluessel-Namensraum im lokalen Cache
///
/// Es gibt genau zwei Namensraeume: `privateKey` und `chat_<chatId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheSchluessel {
    /// Identitaets-Privatschluessel (JWK-Text)
    PrivateKey,
    /// Symmetrischer Chat-Schluessel (JWK-Text)
    Chat(ChatId),
}

impl CacheSchluessel {
    /// Gibt den Eintragsnamen im lokalen Speicher zurueck
    pub fn eintrag(&self) -> String {
        match self {
            Self::PrivateKey => PRIVATE_KEY_ENTRY.to_string(),
            Self::Chat(chat_id) => format!("{CHAT_ENTRY_PREFIX}{chat_id}"),
        }
    }

    /// Parst einen Eintragsnamen zurueck in den Namensraum
    ///
    /// Unbekannte Eintraege und Chat-IDs mit Pfadzeichen ergeben `None`.
    pub fn aus_eintrag(eintrag: &str) -> Option<Self> {
        if eintrag == PRIVATE_KEY_ENTRY {
            return Some(Self::PrivateKey);
        }
        eintrag
            .strip_prefix(CHAT_ENTRY_PREFIX)
            .filter(|id| id_gueltig(id))
            .map(|id| Self::Chat(ChatId::new(id)))
    }
}

impl std::fmt::Display for CacheSchluessel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.eintrag())
    }
}
