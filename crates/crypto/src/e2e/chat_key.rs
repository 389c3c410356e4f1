//! Chat-Schluessel (AES-256-GCM, einer pro Chat)
//!
//! Alle Mitglieder eines Chats teilen denselben Schluessel. Verteilt wird er
//! pro Empfaenger: JWK-Text des Schluessels, RSA-OAEP-verschluesselt mit dem
//! oeffentlichen Schluessel des Empfaengers, Base64-kodiert.
//! Bei Austritt eines Mitglieds wird nicht rotiert.

use rsa::RsaPrivateKey;

use crate::backend::CryptoBackend;
use crate::codec::{base64_decode, base64_encode};
use crate::error::{CryptoError, CryptoResult};
use crate::identity::parse_public_key;
use crate::jwk::Jwk;
use crate::types::{SecretBytes, AES_SCHLUESSEL_LAENGE};

/// Symmetrischer Schluessel eines Chats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatKey {
    key_bytes: SecretBytes,
}

impl ChatKey {
    /// Uebernimmt rohe Schluesselbytes (muessen 32 Bytes lang sein)
    pub fn from_bytes(key_bytes: SecretBytes) -> CryptoResult<Self> {
        if key_bytes.len() != AES_SCHLUESSEL_LAENGE {
            return Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: AES_SCHLUESSEL_LAENGE,
                erhalten: key_bytes.len(),
            });
        }
        Ok(Self { key_bytes })
    }

    /// Importiert einen Chat-Schluessel aus JWK-Text
    pub fn from_jwk_text(text: &str) -> CryptoResult<Self> {
        let key_bytes = Jwk::parse(text)?.aes_schluessel()?;
        Ok(Self { key_bytes })
    }

    /// Exportiert den Schluessel als JWK-Text
    pub fn to_jwk_text(&self) -> CryptoResult<String> {
        Jwk::aus_aes_schluessel(&self.key_bytes).to_text()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.key_bytes.as_bytes()
    }
}

/// Erzeugt einen neuen zufaelligen Chat-Schluessel
pub fn generate_chat_key(backend: &dyn CryptoBackend) -> ChatKey {
    ChatKey {
        key_bytes: backend.generate_aes_key(),
    }
}

/// Wickelt einen Chat-Schluessel fuer einen Empfaenger ein
///
/// `recipient_public_key_text` ist der veroeffentlichte JWK-Text aus dem
/// Benutzerprofil. Ergebnis ist Standard-Base64.
pub fn wrap_chat_key_for_recipient(
    backend: &dyn CryptoBackend,
    chat_key: &ChatKey,
    recipient_public_key_text: &str,
) -> CryptoResult<String> {
    let public_key = parse_public_key(recipient_public_key_text)?;
    let jwk_text = chat_key.to_jwk_text()?;
    let wrapped = backend.rsa_oaep_encrypt(&public_key, jwk_text.as_bytes())?;
    Ok(base64_encode(&wrapped))
}

/// Packt einen eingewickelten Chat-Schluessel aus und liefert dessen JWK-Text
///
/// Der Text wird vor der Rueckgabe als AES-JWK validiert.
pub fn unwrap_chat_key_text(
    backend: &dyn CryptoBackend,
    wrapped_b64: &str,
    private_key: &RsaPrivateKey,
) -> CryptoResult<String> {
    let wrapped = base64_decode(wrapped_b64)?;
    let plaintext = backend.rsa_oaep_decrypt(private_key, &wrapped)?;
    let text = String::from_utf8(plaintext)
        .map_err(|_| CryptoError::format("Ausgepackter Schluessel ist kein UTF-8"))?;
    ChatKey::from_jwk_text(&text)?;
    Ok(text)
}

/// Wie [`unwrap_chat_key_text`], liefert direkt den importierten Schluessel
pub fn unwrap_chat_key(
    backend: &dyn CryptoBackend,
    wrapped_b64: &str,
    private_key: &RsaPrivateKey,
) -> CryptoResult<ChatKey> {
    let text = unwrap_chat_key_text(backend, wrapped_b64, private_key)?;
    ChatKey::from_jwk_text(&text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
