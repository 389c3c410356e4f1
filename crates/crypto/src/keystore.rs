//! Passwortgeschuetzter Keystore
//!
//! Das Passwort wird per PBKDF2-HMAC-SHA256 zu einem AES-256-GCM Schluessel
//! gestreckt. Jeder Eintrag (Identitaets- oder Chat-Schluessel als JWK-Text)
//! wird einzeln mit eigener Nonce versiegelt. Das Salz liegt in einem
//! eigenen Eintrag vom Typ `PBKDF2`.

use crate::backend::CryptoBackend;
use crate::codec::{base64_decode, base64_encode};
use crate::error::{CryptoError, CryptoResult};
use crate::types::{Nonce, SecretBytes};

/// Laenge des PBKDF2-Salzes in Bytes
pub const SALT_LAENGE: usize = 16;

/// Art eines Keystore-Eintrags (Feld `type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeystoreEntryKind {
    /// Traegt nur das Salz im Feld `iv`
    Salt,
    /// Identitaetsschluessel (privater RSA-OAEP JWK)
    PrivateKey,
    /// Chat-Schluessel (AES-GCM JWK), gehoert zu `relatedChat`
    ChatKey,
}

impl KeystoreEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Salt => "PBKDF2",
            Self::PrivateKey => "RSA-OAEP",
            Self::ChatKey => "AES-GCM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PBKDF2" => Some(Self::Salt),
            "RSA-OAEP" => Some(Self::PrivateKey),
            "AES-GCM" => Some(Self::ChatKey),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeystoreEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aus dem Passwort abgeleiteter Schluessel
#[derive(Debug, Clone)]
pub struct KeystoreKey(SecretBytes);

impl KeystoreKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Ein versiegelter Eintrag (Felder `key` und `iv`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEntry {
    pub key_b64: String,
    pub nonce: Nonce,
}

/// Frisches zufaelliges Salz
pub fn generate_salt(backend: &dyn CryptoBackend) -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LAENGE];
    backend.fill_random(&mut salt);
    salt
}

/// Streckt das Passwort zu einem Keystore-Schluessel
pub fn derive_keystore_key(
    backend: &dyn CryptoBackend,
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> KeystoreKey {
    KeystoreKey(backend.derive_pbkdf2_key(password.as_bytes(), salt, iterations))
}

/// Versiegelt einen Schluessel-Text
pub fn seal_entry(
    backend: &dyn CryptoBackend,
    key: &KeystoreKey,
    key_text: &str,
) -> CryptoResult<SealedEntry> {
    let nonce = backend.generate_nonce();
    let ciphertext = backend.aes_gcm_encrypt(key.as_bytes(), &nonce, key_text.as_bytes())?;
    Ok(SealedEntry {
        key_b64: base64_encode(&ciphertext),
        nonce,
    })
}

/// Oeffnet einen versiegelten Eintrag
///
/// Ein Auth-Tag-Fehler bedeutet hier ein falsches Passwort und wird als
/// `CryptoError::KeystorePasswort` gemeldet.
pub fn open_entry(
    backend: &dyn CryptoBackend,
    key: &KeystoreKey,
    key_b64: &str,
    iv: &[u8],
) -> CryptoResult<String> {
    let nonce = Nonce::aus_slice(iv)?;
    let ciphertext = base64_decode(key_b64)?;
    let plaintext = backend
        .aes_gcm_decrypt(key.as_bytes(), &nonce, &ciphertext)
        .map_err(|e| match e {
            CryptoError::Entschluesselung(_) => CryptoError::KeystorePasswort,
            other => other,
        })?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::format("Keystore-Eintrag ist kein UTF-8"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
