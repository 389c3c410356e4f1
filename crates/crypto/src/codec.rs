//! Binaer/Text-Konvertierungen
//!
//! - Standard-Base64 (kein URL-safe) fuer Ciphertexte und eingewickelte Schluessel
//! - Nonce-Container: JSON-Struktur mit den Nonces einer Nachricht
//!
//! ## Nonce-Container Formate
//! ```text
//! Legacy:  {"0":12,"1":200,...,"11":7}            (Werte in Schluessel-Reihenfolge)
//! Aktuell: {"message":[12,200,...], "bild.png":[...], ...}
//! ```
//! Unterschieden wird ausschliesslich am Feld `"message"`.

use std::collections::BTreeMap;

use base64::{engine::general_purpose, Engine};
use serde_json::{Map, Value};

use crate::error::{CryptoError, CryptoResult};
use crate::types::Nonce;

/// Feldname der Nachrichten-Nonce im aktuellen Format
pub const MESSAGE_FIELD: &str = "message";

/// Kodiert Bytes als Standard-Base64
pub fn base64_encode(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

/// Dekodiert Standard-Base64, schlaegt bei ungueltiger Eingabe fehl
pub fn base64_decode(data: &str) -> CryptoResult<Vec<u8>> {
    Ok(general_purpose::STANDARD.decode(data)?)
}

/// Nonce-Container einer Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonceContainer {
    /// Altes Format: nur die Nachrichten-Nonce als Objekt `{"0":..,"1":..}`
    Legacy(Nonce),
    /// Aktuelles Format: Nachrichten-Nonce plus eine Nonce pro Anhang
    Current {
        message: Nonce,
        attachments: BTreeMap<String, Nonce>,
    },
}

/// Ergebnis von [`parse_nonce_container`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNonces {
    pub message_nonce: Nonce,
    pub attachment_nonces: BTreeMap<String, Nonce>,
}

impl NonceContainer {
    /// Neuer Container im aktuellen Format ohne Anhaenge
    pub fn new(message: Nonce) -> Self {
        Self::Current {
            message,
            attachments: BTreeMap::new(),
        }
    }

    /// Parst den JSON-Text eines Nonce-Containers
    pub fn parse(json: &str) -> CryptoResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| CryptoError::format(format!("Nonce-Container ist kein JSON: {e}")))?;

        let Value::Object(obj) = value else {
            return Err(CryptoError::format("Nonce-Container ist kein JSON-Objekt"));
        };

        if obj.contains_key(MESSAGE_FIELD) {
            parse_current(obj)
        } else {
            parse_legacy(&obj).map(Self::Legacy)
        }
    }

    /// Nonce des Nachrichtentexts
    pub fn message_nonce(&self) -> &Nonce {
        match self {
            Self::Legacy(nonce) => nonce,
            Self::Current { message, .. } => message,
        }
    }

    /// Nonce eines Anhangs (nach Original-Dateiname)
    pub fn attachment_nonce(&self, filename: &str) -> Option<&Nonce> {
        match self {
            Self::Legacy(_) => None,
            Self::Current { attachments, .. } => attachments.get(filename),
        }
    }

    /// Fuegt die Nonce eines Anhangs hinzu (migriert Legacy dabei ins aktuelle Format)
    pub fn mit_anhang(self, filename: impl Into<String>, nonce: Nonce) -> Self {
        let (message, mut attachments) = match self {
            Self::Legacy(message) => (message, BTreeMap::new()),
            Self::Current {
                message,
                attachments,
            } => (message, attachments),
        };
        attachments.insert(filename.into(), nonce);
        Self::Current {
            message,
            attachments,
        }
    }

    pub fn ist_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    /// Serialisiert immer im aktuellen Format
    pub fn to_json(&self) -> String {
        let mut obj = Map::new();
        obj.insert(MESSAGE_FIELD.to_string(), nonce_to_value(self.message_nonce()));
        if let Self::Current { attachments, .. } = self {
            for (name, nonce) in attachments {
                obj.insert(name.clone(), nonce_to_value(nonce));
            }
        }
        Value::Object(obj).to_string()
    }

    pub fn into_parsed(self) -> ParsedNonces {
        match self {
            Self::Legacy(message_nonce) => ParsedNonces {
                message_nonce,
                attachment_nonces: BTreeMap::new(),
            },
            Self::Current {
                message,
                attachments,
            } => ParsedNonces {
                message_nonce: message,
                attachment_nonces: attachments,
            },
        }
    }
}

/// Parst einen Nonce-Container (Legacy oder aktuell)
pub fn parse_nonce_container(json: &str) -> CryptoResult<ParsedNonces> {
    NonceContainer::parse(json).map(NonceContainer::into_parsed)
}

fn parse_current(obj: Map<String, Value>) -> CryptoResult<NonceContainer> {
    let mut message = None;
    let mut attachments = BTreeMap::new();

    for (name, value) in obj {
        let nonce = nonce_from_array(&name, &value)?;
        if name == MESSAGE_FIELD {
            message = Some(nonce);
        } else {
            attachments.insert(name, nonce);
        }
    }

    let message = message.ok_or_else(|| CryptoError::format("Feld 'message' fehlt"))?;
    Ok(NonceContainer::Current {
        message,
        attachments,
    })
}

fn parse_legacy(obj: &Map<String, Value>) -> CryptoResult<Nonce> {
    // Schluessel sind Array-Indizes; numerisch sortieren ("10" nach "9")
    let mut eintraege = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        let index: usize = key.parse().map_err(|_| {
            CryptoError::format(format!("Unbekanntes Feld '{key}' im Nonce-Container"))
        })?;
        eintraege.push((index, byte_from_value(value)?));
    }
    eintraege.sort_by_key(|(index, _)| *index);

    let bytes: Vec<u8> = eintraege.into_iter().map(|(_, b)| b).collect();
    Nonce::aus_slice(&bytes)
}

fn nonce_from_array(name: &str, value: &Value) -> CryptoResult<Nonce> {
    let Value::Array(items) = value else {
        return Err(CryptoError::format(format!(
            "Nonce '{name}' ist kein Array"
        )));
    };
    let bytes = items
        .iter()
        .map(byte_from_value)
        .collect::<CryptoResult<Vec<u8>>>()?;
    Nonce::aus_slice(&bytes)
}

fn byte_from_value(value: &Value) -> CryptoResult<u8> {
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| CryptoError::format(format!("Nonce-Wert {value} ist kein Byte")))
}

fn nonce_to_value(nonce: &Nonce) -> Value {
    Value::Array(nonce.bytes.iter().map(|b| Value::from(*b)).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BYTES: [u8; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 250];

    fn legacy_json(bytes: &[u8]) -> String {
        let felder: Vec<String> = bytes
            .iter()
            .enumerate()
            .map(|(i, b)| format!("\"{i}\":{b}"))
            .collect();
        format!("{{{}}}", felder.join(","))
    }

    #[test]
    fn base64_roundtrip() {
        let data = b"\x00\xffHallo";
        assert_eq!(base64_decode(&base64_encode(data)).unwrap(), data);
    }

    #[test]
    fn base64_ist_standard_alphabet() {
        assert_eq!(base64_encode(&[0xfb, 0xff]), "+/8=");
    }

    #[test]
    fn base64_ungueltig_schlaegt_fehl() {
        assert!(matches!(
            base64_decode("nicht base64!"),
            Err(CryptoError::Base64(_))
        ));
    }

    #[test]
    fn legacy_und_aktuell_ergeben_gleiche_bytes() {
        let legacy = parse_nonce_container(&legacy_json(&BYTES)).unwrap();
        let aktuell = parse_nonce_container(
            "{\"message\":[1,2,3,4,5,6,7,8,9,10,11,250]}",
        )
        .unwrap();

        assert_eq!(legacy.message_nonce.bytes, BYTES);
        assert_eq!(legacy.message_nonce, aktuell.message_nonce);
        assert!(legacy.attachment_nonces.is_empty());
    }

    #[test]
    fn legacy_schluessel_numerisch_sortiert() {
        // Reihenfolge im Text vertauscht, "10"/"11" lexikografisch vor "2"
        let json = "{\"10\":11,\"11\":250,\"2\":3,\"0\":1,\"1\":2,\"3\":4,\"4\":5,\"5\":6,\"6\":7,\"7\":8,\"8\":9,\"9\":10}";
        let parsed = parse_nonce_container(json).unwrap();
        assert_eq!(parsed.message_nonce.bytes, BYTES);
    }

    #[test]
    fn aktuelles_format_mit_anhaengen() {
        let json = "{\"message\":[0,0,0,0,0,0,0,0,0,0,0,1],\"foto.png\":[0,0,0,0,0,0,0,0,0,0,0,2]}";
        let container = NonceContainer::parse(json).unwrap();
        assert!(!container.ist_legacy());
        assert_eq!(container.message_nonce().bytes[11], 1);
        assert_eq!(container.attachment_nonce("foto.png").unwrap().bytes[11], 2);
        assert!(container.attachment_nonce("fehlt.txt").is_none());
    }

    #[test]
    fn serialisierung_und_parse() {
        let container = NonceContainer::new(Nonce::new(BYTES))
            .mit_anhang("a.txt", Nonce::new([9u8; 12]));
        let json = container.to_json();
        assert!(json.contains("\"message\""));
        assert_eq!(NonceContainer::parse(&json).unwrap(), container);
    }

    #[test]
    fn legacy_migration() {
        let legacy = NonceContainer::parse(&legacy_json(&BYTES)).unwrap();
        assert!(legacy.ist_legacy());
        let migriert = legacy.mit_anhang("a.txt", Nonce::new([9u8; 12]));
        assert!(!migriert.ist_legacy());
        assert_eq!(migriert.message_nonce().bytes, BYTES);
        assert!(migriert.to_json().starts_with("{\"message\":[1,2,3"));
    }

    #[test]
    fn weder_legacy_noch_aktuell() {
        assert!(NonceContainer::parse("{\"iv\":[1,2,3]}")
            .unwrap_err()
            .ist_formatfehler());
        assert!(NonceContainer::parse("[1,2,3]").unwrap_err().ist_formatfehler());
        assert!(NonceContainer::parse("kein json").unwrap_err().ist_formatfehler());
    }

    #[test]
    fn falsche_nonce_laenge() {
        let err = NonceContainer::parse("{\"message\":[1,2,3]}").unwrap_err();
        assert!(matches!(err, CryptoError::UngueltigeNonce { erhalten: 3, .. }));
        let err = NonceContainer::parse(&legacy_json(&[1, 2])).unwrap_err();
        assert!(matches!(err, CryptoError::UngueltigeNonce { erhalten: 2, .. }));
    }

    #[test]
    fn werte_ausserhalb_byte_bereich() {
        let err = NonceContainer::parse(
            "{\"message\":[1,2,3,4,5,6,7,8,9,10,11,256]}",
        )
        .unwrap_err();
        assert!(err.ist_formatfehler());
    }
}
