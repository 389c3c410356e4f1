//! Datensatz- und Domain-Typen der E2EE-Dienste
//!
//! Die Record-Typen spiegeln die Felder der Backend-Collections wider
//! (camelCase wie im Backend). Domain-Typen enthalten bereits
//! entschluesselte Inhalte.

use chrono::{DateTime, Utc};
use litechat_core::{ChatId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Benutzerprofil (Collection `users`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Oeffentlicher Identitaetsschluessel als JWK-Text, leer wenn noch nicht veroeffentlicht
    #[serde(default, rename = "publicKey")]
    pub public_key: String,
}

/// Chat (Collection `chats`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Vec<UserId>,
}

impl ChatRecord {
    pub fn chat_id(&self) -> ChatId {
        ChatId::new(self.id.clone())
    }
}

/// Eingewickelter Chat-Schluessel fuer genau einen Empfaenger (Collection `keyexchanges`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyExchangeRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub chat: ChatId,
    pub sender: UserId,
    pub receiver: UserId,
    /// RSA-OAEP Ciphertext des Chat-Schluessel-JWK, Standard-Base64
    pub key: String,
}

/// Eintrag des passwortgeschuetzten Keystores (Collection `keystore`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// `PBKDF2`, `RSA-OAEP` oder `AES-GCM`
    #[serde(rename = "type")]
    pub kind: String,
    /// Salz (PBKDF2) bzw. Nonce (alle anderen)
    #[serde(default)]
    pub iv: Vec<u8>,
    /// Versiegelter Schluessel-Text, Standard-Base64
    #[serde(default)]
    pub key: String,
    #[serde(default, rename = "relatedChat")]
    pub related_chat: String,
    #[serde(default, rename = "oneTime")]
    pub one_time: bool,
}

/// Verschluesselte Nachricht (Collection `messages`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub chat: ChatId,
    pub sender: UserId,
    /// AES-GCM Ciphertext des Texts, Standard-Base64
    pub content: String,
    /// Nonce-Container als JSON-Text (aeltere Records: JSON-Objekt)
    pub iv: Value,
    /// Gespeicherte Dateinamen (`<name>.encrypted`)
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

impl MessageRecord {
    /// JSON-Text des Nonce-Containers, unabhaengig von der Speicherform
    pub fn iv_text(&self) -> String {
        match &self.iv {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// Anhang einer ausgehenden Nachricht (Klartext)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingAttachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl OutgoingAttachment {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Entschluesselter Anhang
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedAttachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Entschluesselte Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptedMessage {
    pub id: String,
    pub chat: ChatId,
    pub sender: UserId,
    pub text: String,
    /// Original-Dateinamen der Anhaenge
    pub attachments: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Realtime-Aenderung an einer Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageUpdate {
    Neu(DecryptedMessage),
    Geaendert(DecryptedMessage),
    Geloescht { id: String },
}
