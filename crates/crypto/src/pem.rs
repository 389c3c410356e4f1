//! PEM-Kodierung fuer den Schluessel-Export
//!
//! - Privater Identitaetsschluessel: PKCS#8, Label `PRIVATE KEY`
//! - Oeffentliche Schluessel: SubjectPublicKeyInfo, Label `PUBLIC KEY`
//! - Chat-Schluessel: rohe 32 Bytes, Label `SECRET KEY`
//!
//! Die Kodierung uebernimmt `rsa::pkcs8` (RFC 7468), Zeilenenden sind LF.

use rsa::pkcs8::der::pem;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::e2e::chat_key::ChatKey;
use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

pub const LABEL_PRIVATE_KEY: &str = "PRIVATE KEY";
pub const LABEL_PUBLIC_KEY: &str = "PUBLIC KEY";
pub const LABEL_SECRET_KEY: &str = "SECRET KEY";

/// Privater Schluessel als PKCS#8 PEM
pub fn private_key_pem(key: &RsaPrivateKey) -> CryptoResult<String> {
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::Export(format!("PKCS#8: {e}")))?;
    Ok(pem.as_str().to_owned())
}

/// Oeffentlicher Schluessel als SPKI PEM
pub fn public_key_pem(key: &RsaPublicKey) -> CryptoResult<String> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::Export(format!("SPKI: {e}")))
}

/// Chat-Schluessel als rohe Bytes in PEM
pub fn chat_key_pem(key: &ChatKey) -> CryptoResult<String> {
    pem::encode_string(LABEL_SECRET_KEY, LineEnding::LF, key.as_bytes())
        .map_err(|e| CryptoError::Export(format!("PEM: {e}")))
}

pub fn private_key_aus_pem(text: &str) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(text).map_err(|e| CryptoError::format(format!("PKCS#8: {e}")))
}

/// Gegenstueck zu [`chat_key_pem`], prueft Label und Laenge
pub fn chat_key_aus_pem(text: &str) -> CryptoResult<ChatKey> {
    let (label, bytes) = pem_label_lesen(text)?;
    if label != LABEL_SECRET_KEY {
        return Err(CryptoError::format(format!(
            "PEM-Label '{label}' statt '{LABEL_SECRET_KEY}'"
        )));
    }
    ChatKey::from_bytes(SecretBytes::new(bytes))
}

/// Liest Label und Inhalt eines beliebigen PEM-Blocks
pub fn pem_label_lesen(text: &str) -> CryptoResult<(String, Vec<u8>)> {
    let (label, bytes) = pem::decode_vec(text.as_bytes())
        .map_err(|e| CryptoError::format(format!("PEM: {e}")))?;
    Ok((label.to_string(), bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
