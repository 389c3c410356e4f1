//! Entschluesselung von Nachrichtentext und Anhaengen
//!
//! Ein falscher Schluessel, eine falsche Nonce oder ein manipulierter
//! Ciphertext fuehren immer zu `CryptoError::Entschluesselung`, nie zu
//! verfaelschtem Klartext.

use crate::backend::CryptoBackend;
use crate::codec::base64_decode;
use crate::e2e::chat_key::ChatKey;
use crate::error::{CryptoError, CryptoResult};
use crate::types::Nonce;

/// Entschluesselt einen Base64-Ciphertext zu UTF-8 Text
pub fn decrypt_text(
    backend: &dyn CryptoBackend,
    ciphertext_b64: &str,
    nonce: &Nonce,
    key: &ChatKey,
) -> CryptoResult<String> {
    let ciphertext = base64_decode(ciphertext_b64)?;
    let plaintext = backend.aes_gcm_decrypt(key.as_bytes(), nonce, &ciphertext)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::format("Klartext ist kein UTF-8"))
}

/// Entschluesselt rohe Anhang-Bytes
pub fn decrypt_attachment(
    backend: &dyn CryptoBackend,
    cipher_bytes: &[u8],
    nonce: &Nonce,
    key: &ChatKey,
) -> CryptoResult<Vec<u8>> {
    backend.aes_gcm_decrypt(key.as_bytes(), nonce, cipher_bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
