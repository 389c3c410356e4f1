//! Verschluesselung von Nachrichtentext und Anhaengen
//!
//! Jede Einheit (Text, jeder Anhang) bekommt eine eigene zufaellige
//! 12-Byte Nonce. Der Aufrufer baut daraus den Nonce-Container.
//!
//! ## Anhang-Dateinamen
//! ```text
//! foto.png  ->  foto.png.encrypted
//! ```

use crate::backend::CryptoBackend;
use crate::codec::base64_encode;
use crate::e2e::chat_key::ChatKey;
use crate::error::CryptoResult;
use crate::types::Nonce;

/// Suffix verschluesselter Anhaenge im Dateispeicher
pub const ENCRYPTED_FILE_SUFFIX: &str = ".encrypted";

/// Verschluesselter Nachrichtentext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedText {
    /// Standard-Base64 des AES-GCM Ciphertexts (inkl. Auth-Tag)
    pub ciphertext_b64: String,
    pub nonce: Nonce,
}

/// Verschluesselter Anhang
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedAttachment {
    pub cipher_bytes: Vec<u8>,
    pub nonce: Nonce,
}

/// Verschluesselt einen Nachrichtentext (UTF-8) mit frischer Nonce
pub fn encrypt_text(
    backend: &dyn CryptoBackend,
    plaintext: &str,
    key: &ChatKey,
) -> CryptoResult<EncryptedText> {
    let nonce = backend.generate_nonce();
    let ciphertext = backend.aes_gcm_encrypt(key.as_bytes(), &nonce, plaintext.as_bytes())?;
    Ok(EncryptedText {
        ciphertext_b64: base64_encode(&ciphertext),
        nonce,
    })
}

/// Verschluesselt rohe Dateibytes mit frischer Nonce
pub fn encrypt_attachment(
    backend: &dyn CryptoBackend,
    file_bytes: &[u8],
    key: &ChatKey,
) -> CryptoResult<EncryptedAttachment> {
    let nonce = backend.generate_nonce();
    let cipher_bytes = backend.aes_gcm_encrypt(key.as_bytes(), &nonce, file_bytes)?;
    Ok(EncryptedAttachment {
        cipher_bytes,
        nonce,
    })
}

/// Speichername eines verschluesselten Anhangs
pub fn encrypted_file_name(original: &str) -> String {
    format!("{original}{ENCRYPTED_FILE_SUFFIX}")
}

/// Original-Dateiname aus dem Speichernamen (None wenn kein Suffix)
pub fn original_file_name(stored: &str) -> Option<&str> {
    stored
        .strip_suffix(ENCRYPTED_FILE_SUFFIX)
        .filter(|name| !name.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
